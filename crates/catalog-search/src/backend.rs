//! Index backend capability.
//!
//! The stores never score or tokenize anything themselves. They consume a
//! backend that can open writers and readers over one index location,
//! persist batches, and answer field-scoped match and term queries.
//!
//! Implementations:
//! - [`crate::TantivyBackend`]: on-disk Tantivy index
//! - [`crate::MemoryBackend`]: in-process index, mostly for tests

use catalog_types::{Document, StoredFields};

use crate::error::IndexError;

/// One scored hit with the stored fields of its document.
#[derive(Debug, Clone)]
pub struct Hit {
    pub score: f32,
    pub fields: StoredFields,
}

/// Opens writers and readers over a single index location.
///
/// Only one writer may be open at a time. A reader reflects the index as
/// it was when the reader was opened.
pub trait IndexBackend: Send + Sync + 'static {
    type Writer: BackendWriter;
    type Reader: BackendReader;

    fn open_writer(&self) -> Result<Self::Writer, IndexError>;

    fn open_reader(&self) -> Result<Self::Reader, IndexError>;
}

/// Mutating handle. Changes become durable and visible to newly opened
/// readers when [`BackendWriter::submit`] returns.
pub trait BackendWriter: Send + 'static {
    /// Drop every document on the next submit.
    fn clear(&mut self) -> Result<(), IndexError>;

    /// Insert or replace (by id) every document of the batch, in order, and commit.
    fn submit(&mut self, batch: Vec<Document>) -> Result<(), IndexError>;

    /// Release the writer. Staged changes that were never submitted are discarded.
    fn close(self) -> Result<(), IndexError>;
}

/// Query handle over a point-in-time view of the index.
pub trait BackendReader: Send + Sync + 'static {
    /// Top `limit` hits of a full-text match of `text` against one field.
    fn match_query(&self, field: &str, text: &str, limit: usize) -> Result<Vec<Hit>, IndexError>;

    /// Hits whose `field` equals `value` exactly.
    fn term_query(&self, field: &str, value: &str, limit: usize) -> Result<Vec<Hit>, IndexError>;

    /// Number of documents in this view.
    fn num_docs(&self) -> u64;
}
