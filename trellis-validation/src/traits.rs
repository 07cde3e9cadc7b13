// Validation traits

use crate::class::SchemaClass;
use crate::{DefinitionError, Error, SchemaRegistry, ValidationOutcome};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Validation methods on every schema class, using the global registry.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use trellis_validation::{ClassDefinition, DefinitionError, SchemaClass, Validate};
/// use trellis_validation::decorators::*;
///
/// #[derive(Serialize, Deserialize)]
/// struct Login {
///     user: String,
/// }
///
/// impl SchemaClass for Login {
///     fn define(def: &mut ClassDefinition<'_>) -> Result<(), DefinitionError> {
///         def.property("user", [min(3), string_schema()])?;
///         Ok(())
///     }
/// }
///
/// assert!(Login { user: "ada".into() }.is_valid().unwrap());
/// assert!(!Login { user: "al".into() }.is_valid().unwrap());
/// ```
pub trait Validate: SchemaClass + Serialize + DeserializeOwned + Sized {
    fn validate(&self) -> Result<ValidationOutcome<Self>, DefinitionError> {
        SchemaRegistry::global().validate(self)
    }

    /// The validated instance, or every error as [`Error::Validation`].
    fn validate_or_err(&self) -> Result<Self, Error> {
        SchemaRegistry::global().validate_or_err(self)
    }

    fn is_valid(&self) -> Result<bool, DefinitionError> {
        SchemaRegistry::global().is_valid(self)
    }
}

impl<T> Validate for T where T: SchemaClass + Serialize + DeserializeOwned {}
