//! Error types for records and configuration.

use thiserror::Error;

/// Errors raised while converting records to and from index fields.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A field required to rebuild the record was not stored
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A stored value could not be turned back into the record attribute
    #[error("Decode error in field {field}: {reason}")]
    Decode { field: String, reason: String },

    /// The record cannot be represented as a document
    #[error("Encode error: {0}")]
    Encode(String),
}

impl RecordError {
    pub fn decode(field: impl Into<String>, reason: impl ToString) -> Self {
        RecordError::Decode {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration loading error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
