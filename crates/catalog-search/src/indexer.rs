//! Tantivy writer for submitting document batches.
//!
//! Documents are upserted by `_id` and are not visible until the batch
//! is committed at the end of [`BackendWriter::submit`].

use tantivy::{IndexWriter, Term};
use tracing::{debug, info, warn};

use catalog_types::Document;

use crate::backend::BackendWriter;
use crate::document::to_tantivy_doc;
use crate::error::IndexError;
use crate::schema::CatalogSchema;

/// Owns the single IndexWriter of a Tantivy index.
pub struct TantivyWriter {
    writer: IndexWriter,
    schema: CatalogSchema,
}

impl TantivyWriter {
    pub fn new(writer: IndexWriter, schema: CatalogSchema) -> Self {
        Self { writer, schema }
    }
}

impl BackendWriter for TantivyWriter {
    fn clear(&mut self) -> Result<(), IndexError> {
        let opstamp = self.writer.delete_all_documents()?;
        debug!(opstamp, "Staged delete of all documents");
        Ok(())
    }

    fn submit(&mut self, batch: Vec<Document>) -> Result<(), IndexError> {
        let count = batch.len();

        // Convert first so a bad document leaves nothing staged
        let docs = batch
            .iter()
            .map(|doc| to_tantivy_doc(&self.schema, doc).map(|d| (doc.id(), d)))
            .collect::<Result<Vec<_>, _>>()?;

        for (id, tantivy_doc) in docs {
            // Delete existing document with same ID (for update)
            let term = Term::from_field_text(self.schema.id, id);
            self.writer.delete_term(term);
            self.writer.add_document(tantivy_doc)?;
        }

        let opstamp = self.writer.commit()?;
        info!(opstamp, count, "Committed index batch");
        Ok(())
    }

    fn close(self) -> Result<(), IndexError> {
        if let Err(e) = self.writer.wait_merging_threads() {
            warn!(error = %e, "Merge threads failed while closing writer");
            return Err(e.into());
        }
        debug!("Closed index writer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendReader, IndexBackend};
    use crate::index::{TantivyBackend, TantivyIndexConfig};
    use catalog_types::{FieldSpec, ID_FIELD};
    use tempfile::TempDir;

    const SPECS: &[FieldSpec] = &[FieldSpec::text("title")];

    fn setup() -> (TempDir, TantivyBackend) {
        let temp_dir = TempDir::new().unwrap();
        let backend =
            TantivyBackend::open_or_create(TantivyIndexConfig::new(temp_dir.path()), SPECS).unwrap();
        (temp_dir, backend)
    }

    fn doc(id: &str, title: &str) -> Document {
        Document::new(id).unwrap().text("title", title)
    }

    #[test]
    fn test_submit_batch() {
        let (_temp_dir, backend) = setup();
        let mut writer = backend.open_writer().unwrap();

        let batch: Vec<Document> = (0..5).map(|i| doc(&format!("a-{}", i), "Title")).collect();
        writer.submit(batch).unwrap();
        writer.close().unwrap();

        assert_eq!(backend.open_reader().unwrap().num_docs(), 5);
    }

    #[test]
    fn test_update_existing_document() {
        let (_temp_dir, backend) = setup();
        let mut writer = backend.open_writer().unwrap();

        writer.submit(vec![doc("a-1", "Version 1")]).unwrap();
        writer.submit(vec![doc("a-1", "Version 2")]).unwrap();
        writer.close().unwrap();

        // Should only have one document
        let reader = backend.open_reader().unwrap();
        assert_eq!(reader.num_docs(), 1);
        let hits = reader.term_query(ID_FIELD, "a-1", 1).unwrap();
        assert_eq!(hits[0].fields.get("title"), Some("Version 2"));
    }

    #[test]
    fn test_same_id_twice_in_one_batch() {
        let (_temp_dir, backend) = setup();
        let mut writer = backend.open_writer().unwrap();

        writer
            .submit(vec![doc("a-1", "First"), doc("a-1", "Second")])
            .unwrap();
        writer.close().unwrap();

        let reader = backend.open_reader().unwrap();
        assert_eq!(reader.num_docs(), 1);
        let hits = reader.term_query(ID_FIELD, "a-1", 1).unwrap();
        assert_eq!(hits[0].fields.get("title"), Some("Second"));
    }

    #[test]
    fn test_clear_then_submit_replaces_everything() {
        let (_temp_dir, backend) = setup();

        let mut writer = backend.open_writer().unwrap();
        writer.submit(vec![doc("old-1", "Old"), doc("old-2", "Old")]).unwrap();
        writer.clear().unwrap();
        writer.submit(vec![doc("new-1", "New")]).unwrap();
        writer.close().unwrap();

        let reader = backend.open_reader().unwrap();
        assert_eq!(reader.num_docs(), 1);
        assert!(reader.term_query(ID_FIELD, "old-1", 1).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_batch_is_not_committed() {
        let (_temp_dir, backend) = setup();
        let mut writer = backend.open_writer().unwrap();

        let bad = Document::new("a-2").unwrap().stored("year", "1998");
        let result = writer.submit(vec![doc("a-1", "Fine"), bad]);
        assert!(matches!(result, Err(IndexError::SchemaMismatch(_))));

        writer.submit(Vec::new()).unwrap();
        writer.close().unwrap();
        assert_eq!(backend.open_reader().unwrap().num_docs(), 0);
    }
}
