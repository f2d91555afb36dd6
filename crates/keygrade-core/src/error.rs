//! Grading error types.
//!
//! Every variant describes malformed input rather than a transient
//! failure, so none of them is ever retried. The surrounding application
//! is expected to show [`GradingError::location`] to the operator and block
//! scoring until the input is fixed.

use thiserror::Error;

use crate::model::VariantLabel;

/// Errors raised by the core grading operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    /// The key source is malformed (column count, question numbering, cells).
    #[error("structure error in table '{table}': {message}")]
    Structure { table: String, message: String },

    /// A submission or key does not have one answer per exam question.
    #[error("length mismatch for {context}: expected {expected} answers, got {actual}")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// The exam configuration itself is invalid.
    #[error("invalid exam configuration ({field}): {message}")]
    Validation { field: String, message: String },

    /// No answer key is loaded for the requested set.
    #[error("no answer key loaded for set {0}")]
    UnknownVariant(VariantLabel),
}

impl GradingError {
    pub(crate) fn structure(table: &str, message: impl Into<String>) -> Self {
        GradingError::Structure {
            table: table.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        GradingError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// The table or field the error refers to, if any.
    pub fn location(&self) -> Option<&str> {
        match self {
            GradingError::Structure { table, .. } => Some(table),
            GradingError::Validation { field, .. } => Some(field),
            GradingError::LengthMismatch { context, .. } => Some(context),
            GradingError::UnknownVariant(_) => None,
        }
    }
}
