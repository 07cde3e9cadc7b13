//! Annotation-driven schema composition and validation for Trellis
//!
//! Validation rules are declared property by property as stacks of
//! decorators. Each stack starts, from the bottom, with one type decorator
//! that establishes the property's base kind; the decorators above it refine
//! that schema. When a class is registered its decorators are applied and
//! the resulting schemas are stored per class. Validating an instance
//! composes them (including inherited ones) into one object schema.
//!
//! # Examples
//!
//! ## Declaring a class
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use trellis_validation::decorators::*;
//! use trellis_validation::{ClassDefinition, DefinitionError, SchemaClass, SchemaRegistry};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Order {
//!     quantity: Option<u32>,
//!     email: String,
//! }
//!
//! impl SchemaClass for Order {
//!     fn define(def: &mut ClassDefinition<'_>) -> Result<(), DefinitionError> {
//!         def
//!             .property("quantity", [min(1), optional(), number_schema()])?
//!             .property("email", [email(), required(), string_schema()])?;
//!         Ok(())
//!     }
//! }
//!
//! let registry = SchemaRegistry::new();
//! let outcome = registry
//!     .validate(&Order { quantity: Some(0), email: "buyer@example.com".into() })
//!     .unwrap();
//! let errors = outcome.errors().unwrap();
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.errors[0].path, "quantity");
//! ```
//!
//! ## Definition errors
//!
//! Refining a property before establishing it fails when the class is
//! registered, not when it is validated:
//!
//! ```
//! use trellis_validation::decorators::*;
//! use trellis_validation::{ClassDefinition, DefinitionError, SchemaClass, SchemaRegistry};
//!
//! struct Nested;
//!
//! impl SchemaClass for Nested {
//!     fn define(def: &mut ClassDefinition<'_>) -> Result<(), DefinitionError> {
//!         def.property("inner", [keys([("x", trellis_validation::Schema::number().into())])])?;
//!         Ok(())
//!     }
//! }
//!
//! let err = SchemaRegistry::new().register::<Nested>().unwrap_err();
//! assert!(matches!(err, DefinitionError::SchemaNotFound { .. }));
//! ```

mod class;
pub mod config;
pub mod decorators;
mod errors;
mod node;
mod registry;
mod store;
mod traits;
mod validator;

pub use class::*;
pub use config::ConfigError;
pub use errors::*;
pub use node::*;
pub use registry::*;
pub use store::*;
pub use traits::*;
pub use validator::*;

pub use trellis_schema::{Kind, OptionsOverride, Presence, Schema, ValidationOptions, When};
