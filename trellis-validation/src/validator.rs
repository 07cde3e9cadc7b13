// Validation outcomes and entry points over the global registry

use crate::class::SchemaClass;
use crate::{DefinitionError, Error, SchemaRegistry, ValidationErrors};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use trellis_schema::ValidationOptions;

/// Result of validating one instance.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome<T> {
    /// The validated instance, with conversions and defaults applied
    Valid(T),
    /// Every violation found, in order
    Invalid(ValidationErrors),
}

impl<T> ValidationOutcome<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ValidationOutcome::Valid(value) => Some(value),
            ValidationOutcome::Invalid(_) => None,
        }
    }

    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            ValidationOutcome::Valid(_) => None,
            ValidationOutcome::Invalid(errors) => Some(errors),
        }
    }

    pub fn into_result(self) -> Result<T, ValidationErrors> {
        match self {
            ValidationOutcome::Valid(value) => Ok(value),
            ValidationOutcome::Invalid(errors) => Err(errors),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ValidationOutcome<U> {
        match self {
            ValidationOutcome::Valid(value) => ValidationOutcome::Valid(f(value)),
            ValidationOutcome::Invalid(errors) => ValidationOutcome::Invalid(errors),
        }
    }
}

impl<T> From<ValidationOutcome<T>> for Result<T, ValidationErrors> {
    fn from(outcome: ValidationOutcome<T>) -> Self {
        outcome.into_result()
    }
}

/// Register `T` with the global registry.
pub fn register<T: SchemaClass>() -> Result<(), DefinitionError> {
    SchemaRegistry::global().register::<T>()
}

/// Validate `instance` against the global registry.
pub fn validate<T>(instance: &T) -> Result<ValidationOutcome<T>, DefinitionError>
where
    T: SchemaClass + Serialize + DeserializeOwned,
{
    SchemaRegistry::global().validate(instance)
}

pub fn validate_with<T>(
    instance: &T,
    options: &ValidationOptions,
) -> Result<ValidationOutcome<T>, DefinitionError>
where
    T: SchemaClass + Serialize + DeserializeOwned,
{
    SchemaRegistry::global().validate_with(instance, options)
}

pub fn validate_value<T>(value: &Value) -> Result<ValidationOutcome<T>, DefinitionError>
where
    T: SchemaClass + DeserializeOwned,
{
    SchemaRegistry::global().validate_value(value)
}

pub fn validate_or_err<T>(instance: &T) -> Result<T, Error>
where
    T: SchemaClass + Serialize + DeserializeOwned,
{
    SchemaRegistry::global().validate_or_err(instance)
}

pub fn is_valid<T>(instance: &T) -> Result<bool, DefinitionError>
where
    T: SchemaClass + Serialize + DeserializeOwned,
{
    SchemaRegistry::global().is_valid(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;

    #[test]
    fn test_outcome_accessors() {
        let valid: ValidationOutcome<u8> = ValidationOutcome::Valid(3);
        assert!(valid.is_valid());
        assert_eq!(valid.value(), Some(&3));
        assert_eq!(valid.map(|v| v * 2).into_result().unwrap(), 6);

        let errors = ValidationErrors::new(vec![ValidationError::new("a", "\"a\" is required")]);
        let invalid: ValidationOutcome<u8> = ValidationOutcome::Invalid(errors.clone());
        assert!(!invalid.is_valid());
        assert_eq!(invalid.errors(), Some(&errors));
        let result: Result<u8, ValidationErrors> = invalid.into();
        assert_eq!(result.unwrap_err(), errors);
    }
}
