//! Error taxonomy for the document service
//!
//! Three failure kinds, each mapped to an HTTP status by the routing layer:
//! `Validation` (400), `NotFound` (404), `Store` (500). Store failures carry
//! the formatted driver cause for logging; raw driver errors never escape the
//! service layer.

/// Service-level error
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocError {
    /// Client-fixable input problem (bad field value, bad id syntax,
    /// unsupported filter value)
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },

    /// No document at the given id
    #[error("Document not found")]
    NotFound,

    /// Underlying persistence failure, or a record that could not be parsed
    /// at single-record-fetch granularity
    #[error("Store error: {0}")]
    Store(String),
}

impl DocError {
    /// Build a validation failure for a named field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocError>;
