//! Persistent schema algebra for Trellis.
//!
//! A [`Schema`] is an immutable value describing what a JSON value must look
//! like. Every operation returns a new schema, so schemas can be shared,
//! refined and concatenated freely. [`validate`] walks a value against a
//! schema and returns the validated (converted, defaulted, stripped) value or
//! a [`ValidationReport`] listing every failure.
//!
//! # Example
//!
//! ```
//! use trellis_schema::{Schema, ValidationOptions};
//! use serde_json::json;
//!
//! let user = Schema::object()
//!     .keys([
//!         ("email", Schema::string().email().unwrap().required()),
//!         ("age", Schema::number().integer().unwrap().min(18.0).unwrap()),
//!     ])
//!     .unwrap();
//!
//! let ok = user.validate(&json!({"email": "ada@example.com", "age": "36"}), &ValidationOptions::default());
//! assert_eq!(ok.unwrap(), json!({"email": "ada@example.com", "age": 36}));
//!
//! let err = user.validate(&json!({"age": 12}), &ValidationOptions::default()).unwrap_err();
//! assert_eq!(err.len(), 2);
//! ```

mod convert;
mod error;
mod kind;
mod options;
mod path;
mod rules;
mod schema;
mod validate;

pub use error::{ErrorDetail, SchemaError, ValidationReport};
pub use kind::Kind;
pub use options::{OptionsOverride, Presence, ValidationOptions};
pub use path::{Path, PathSegment};
pub use rules::{parse_date, Rule};
pub use schema::{Annotations, Schema, When};
pub use validate::validate;
