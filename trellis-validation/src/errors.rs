// Definition and validation errors

use serde_json::Value;
use std::fmt;
use thiserror::Error;
use trellis_schema::{ErrorDetail, ValidationReport};

/// A class definition that cannot produce a schema.
///
/// Returned while a class is registered, never deferred to validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    /// A refinement or nested composition ran on a property with no
    /// established base kind.
    #[error(
        "ValidationSchemaNotFound: property '{property}' of {class} has no schema; \
         apply a type decorator such as number_schema() before refining it"
    )]
    SchemaNotFound { class: String, property: String },

    /// A decorator cannot apply to the property's schema.
    #[error("ConstraintDefinitionError: {reason} (property '{property}' of {class})")]
    ConstraintDefinition {
        class: String,
        property: String,
        reason: String,
    },
}

impl DefinitionError {
    pub fn schema_not_found(class: impl Into<String>, property: impl Into<String>) -> Self {
        Self::SchemaNotFound {
            class: class.into(),
            property: property.into(),
        }
    }

    pub fn constraint(
        class: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConstraintDefinition {
            class: class.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// The property the error names.
    pub fn property(&self) -> &str {
        match self {
            Self::SchemaNotFound { property, .. } | Self::ConstraintDefinition { property, .. } => {
                property
            }
        }
    }

    /// The class the error names.
    pub fn class(&self) -> &str {
        match self {
            Self::SchemaNotFound { class, .. } | Self::ConstraintDefinition { class, .. } => class,
        }
    }
}

/// Validation error for a single value
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Rendered path of the value, e.g. `address.street` or `tags[2]`
    pub path: String,

    /// Error message
    pub message: String,

    /// Error tag, e.g. `number.min`
    pub kind: String,

    /// Value that failed validation (optional)
    pub value: Option<Value>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind: "custom".to_string(),
            value: None,
        }
    }

    /// Set the error tag
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the invalid value
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

impl From<ErrorDetail> for ValidationError {
    fn from(detail: ErrorDetail) -> Self {
        Self {
            path: detail.path.to_string(),
            message: detail.message,
            kind: detail.kind,
            value: detail.value,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors, in the order they were found
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new validation errors collection
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Add an error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Get errors for a specific path
    pub fn get_path_errors(&self, path: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.path == path).collect()
    }

    /// Convert to JSON representation
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "errors": self.errors.iter().map(|e| {
                serde_json::json!({
                    "path": e.path,
                    "message": e.message,
                    "type": e.kind,
                    "value": e.value,
                })
            }).collect::<Vec<_>>()
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(". ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::new(errors)
    }
}

impl From<ValidationReport> for ValidationErrors {
    fn from(report: ValidationReport) -> Self {
        Self::new(report.details.into_iter().map(ValidationError::from).collect())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Either failure a validation entry point can return.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl Error {
    /// The validation errors, if validation (not definition) failed.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors) => Some(errors),
            Error::Definition(_) => None,
        }
    }
}
