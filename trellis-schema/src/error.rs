// Schema construction errors and validation reports

use crate::{Kind, Path};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Rejected schema construction.
///
/// Returned by algebra operations that cannot apply to a schema, never by
/// validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("rule '{rule}' is not supported by {kind} schemas")]
    UnsupportedRule { rule: &'static str, kind: Kind },

    #[error("cannot concat a {right} schema onto a {left} schema")]
    KindMismatch { left: Kind, right: Kind },

    #[error("invalid limit for '{rule}': {reason}")]
    InvalidLimit { rule: &'static str, reason: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid date '{value}': expected RFC 3339 or YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("invalid condition on '{reference}': {reason}")]
    InvalidCondition { reference: String, reason: String },
}

/// One failed check, located by path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    /// Human readable message, e.g. `"age" must be greater than or equal to 18`
    pub message: String,

    /// Where the offending value sits in the validated document
    pub path: Path,

    /// Error tag such as `number.min` or `any.required`
    #[serde(rename = "type")]
    pub kind: String,

    /// The offending value, when one was present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered failures from one `validate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub details: Vec<ErrorDetail>,
}

impl ValidationReport {
    pub fn new(details: Vec<ErrorDetail>) -> Self {
        Self { details }
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Details whose path renders exactly as `path`.
    pub fn at(&self, path: &str) -> Vec<&ErrorDetail> {
        self.details
            .iter()
            .filter(|d| d.path.to_string() == path)
            .collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, detail) in self.details.iter().enumerate() {
            if i > 0 {
                f.write_str(". ")?;
            }
            f.write_str(&detail.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}
