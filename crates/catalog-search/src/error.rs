//! Search error types.

use catalog_types::RecordError;
use thiserror::Error;

/// Errors that can occur during index and search operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Point lookup found no document for the id
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A read was issued before the reader was opened
    #[error("Index reader is not open")]
    ReaderUninitialized,

    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Failure reported by a non-Tantivy backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// Record could not be marshaled or rebuilt from stored fields
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// The write context was cancelled while the record was being handed off
    #[error("Store is shutting down")]
    ShuttingDown,

    /// The background flush worker stopped after a backend failure
    #[error("Flush worker failed: {0}")]
    WorkerFailed(String),

    /// The store was closed and cannot be used again
    #[error("Store is closed")]
    Closed,

    /// A blocking index task panicked or was cancelled
    #[error("Index task failed: {0}")]
    Task(String),
}

impl IndexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound(_))
    }
}

impl From<tokio::task::JoinError> for IndexError {
    fn from(err: tokio::task::JoinError) -> Self {
        IndexError::Task(err.to_string())
    }
}
