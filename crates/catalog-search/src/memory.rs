//! In-process index backend.
//!
//! Keeps committed documents in a shared map and hands out snapshot
//! readers. Scoring is deliberately naive: the share of a field's tokens
//! matched by the query. Used for tests and for throwaway indexes; it can
//! slow down or fail submits on demand to exercise the stores' write path.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use catalog_types::{Document, ID_FIELD};

use crate::backend::{BackendReader, BackendWriter, Hit, IndexBackend};
use crate::error::IndexError;

#[derive(Default)]
struct Shared {
    committed: Mutex<BTreeMap<String, Document>>,
    writer_open: AtomicBool,
    fail_next_submit: AtomicBool,
    submits_started: AtomicUsize,
    submits_finished: AtomicUsize,
    submit_started: Notify,
    doc_applied: Notify,
}

impl Shared {
    fn committed(&self) -> MutexGuard<'_, BTreeMap<String, Document>> {
        self.committed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cheaply cloneable handle to one in-memory index.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
    per_doc_delay: Duration,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before applying each submitted document.
    ///
    /// Documents are applied one at a time, so a reader opened mid-submit
    /// would see part of the batch.
    pub fn with_per_doc_delay(mut self, delay: Duration) -> Self {
        self.per_doc_delay = delay;
        self
    }

    /// Make the next submit fail without applying anything.
    pub fn fail_next_submit(&self) {
        self.shared.fail_next_submit.store(true, Ordering::SeqCst);
    }

    pub fn submits_started(&self) -> usize {
        self.shared.submits_started.load(Ordering::SeqCst)
    }

    pub fn submits_finished(&self) -> usize {
        self.shared.submits_finished.load(Ordering::SeqCst)
    }

    /// Resolves once a submit has started (immediately if one started
    /// since the last call).
    pub async fn submit_started(&self) {
        self.shared.submit_started.notified().await;
    }

    /// Resolves once a submitted document has been applied (immediately
    /// if one was applied since the last call).
    pub async fn doc_applied(&self) {
        self.shared.doc_applied.notified().await;
    }

    pub fn is_writer_open(&self) -> bool {
        self.shared.writer_open.load(Ordering::SeqCst)
    }

    /// Committed documents, regardless of any reader.
    pub fn committed_len(&self) -> usize {
        self.shared.committed().len()
    }
}

impl IndexBackend for MemoryBackend {
    type Writer = MemoryWriter;
    type Reader = MemoryReader;

    fn open_writer(&self) -> Result<MemoryWriter, IndexError> {
        if self.shared.writer_open.swap(true, Ordering::SeqCst) {
            return Err(IndexError::Backend("a writer is already open".to_string()));
        }
        Ok(MemoryWriter {
            shared: self.shared.clone(),
            per_doc_delay: self.per_doc_delay,
            clear_pending: false,
        })
    }

    fn open_reader(&self) -> Result<MemoryReader, IndexError> {
        let docs = self.shared.committed().values().cloned().collect();
        Ok(MemoryReader { docs })
    }
}

/// Writer over a [`MemoryBackend`].
pub struct MemoryWriter {
    shared: Arc<Shared>,
    per_doc_delay: Duration,
    clear_pending: bool,
}

impl BackendWriter for MemoryWriter {
    fn clear(&mut self) -> Result<(), IndexError> {
        self.clear_pending = true;
        Ok(())
    }

    fn submit(&mut self, batch: Vec<Document>) -> Result<(), IndexError> {
        self.shared.submits_started.fetch_add(1, Ordering::SeqCst);
        self.shared.submit_started.notify_one();

        if self.shared.fail_next_submit.swap(false, Ordering::SeqCst) {
            return Err(IndexError::Backend("injected submit failure".to_string()));
        }

        if std::mem::take(&mut self.clear_pending) {
            self.shared.committed().clear();
        }

        let count = batch.len();
        for doc in batch {
            if !self.per_doc_delay.is_zero() {
                std::thread::sleep(self.per_doc_delay);
            }
            self.shared.committed().insert(doc.id().to_string(), doc);
            self.shared.doc_applied.notify_one();
        }

        self.shared.submits_finished.fetch_add(1, Ordering::SeqCst);
        debug!(count, "Applied in-memory batch");
        Ok(())
    }

    fn close(self) -> Result<(), IndexError> {
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.shared.writer_open.store(false, Ordering::SeqCst);
    }
}

/// Snapshot of the committed documents taken when the reader was opened.
pub struct MemoryReader {
    docs: Vec<Document>,
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl BackendReader for MemoryReader {
    fn match_query(&self, field: &str, text: &str, limit: usize) -> Result<Vec<Hit>, IndexError> {
        let query: HashSet<String> = tokens(text).into_iter().collect();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Hit> = self
            .docs
            .iter()
            .filter_map(|doc| {
                let field_tokens = tokens(doc.get(field)?);
                let matched = field_tokens.iter().filter(|t| query.contains(*t)).count();
                if matched == 0 {
                    return None;
                }
                Some(Hit {
                    score: matched as f32 / field_tokens.len() as f32,
                    fields: doc.to_stored_fields(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    fn term_query(&self, field: &str, value: &str, limit: usize) -> Result<Vec<Hit>, IndexError> {
        Ok(self
            .docs
            .iter()
            .filter(|doc| {
                if field == ID_FIELD {
                    doc.id() == value
                } else {
                    doc.get(field) == Some(value)
                }
            })
            .take(limit)
            .map(|doc| Hit {
                score: 1.0,
                fields: doc.to_stored_fields(),
            })
            .collect())
    }

    fn num_docs(&self) -> u64 {
        self.docs.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str) -> Document {
        Document::new(id).unwrap().text("title", title)
    }

    #[test]
    fn test_scores_by_matched_share() {
        let backend = MemoryBackend::new();
        let mut writer = backend.open_writer().unwrap();
        writer
            .submit(vec![doc("a", "Cowboy Bebop"), doc("b", "Cowboy Bebop Tengoku no Tobira")])
            .unwrap();

        let hits = backend
            .open_reader()
            .unwrap()
            .match_query("title", "cowboy bebop", 10)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].fields.id().unwrap(), "a");
        assert!((hits[0].score - 1.0).abs() < f32::EPSILON);
        assert!((hits[1].score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_reader_is_snapshot() {
        let backend = MemoryBackend::new();
        let mut writer = backend.open_writer().unwrap();
        writer.submit(vec![doc("a", "Trigun")]).unwrap();

        let reader = backend.open_reader().unwrap();
        writer.submit(vec![doc("b", "Monster")]).unwrap();

        assert_eq!(reader.num_docs(), 1);
        assert_eq!(backend.open_reader().unwrap().num_docs(), 2);
    }

    #[test]
    fn test_single_writer() {
        let backend = MemoryBackend::new();
        let writer = backend.open_writer().unwrap();
        assert!(backend.open_writer().is_err());
        writer.close().unwrap();
        assert!(!backend.is_writer_open());
        assert!(backend.open_writer().is_ok());
    }

    #[test]
    fn test_injected_failure_applies_nothing() {
        let backend = MemoryBackend::new();
        let mut writer = backend.open_writer().unwrap();
        backend.fail_next_submit();

        assert!(writer.submit(vec![doc("a", "Trigun")]).is_err());
        assert_eq!(backend.committed_len(), 0);
        assert_eq!(backend.submits_started(), 1);
        assert_eq!(backend.submits_finished(), 0);

        writer.submit(vec![doc("a", "Trigun")]).unwrap();
        assert_eq!(backend.committed_len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_doc_applied_fires_mid_batch() {
        let backend = MemoryBackend::new().with_per_doc_delay(Duration::from_millis(100));
        let mut writer = backend.open_writer().unwrap();
        let submit = tokio::task::spawn_blocking(move || {
            writer
                .submit(vec![doc("a", "Trigun"), doc("b", "Monster"), doc("c", "Akira")])
                .unwrap();
        });

        backend.doc_applied().await;
        let applied = backend.committed_len();
        assert!((1..3).contains(&applied), "applied {}", applied);
        assert_eq!(backend.submits_finished(), 0);

        submit.await.unwrap();
        assert_eq!(backend.committed_len(), 3);
        assert_eq!(backend.submits_finished(), 1);
    }

    #[test]
    fn test_clear_applies_on_submit() {
        let backend = MemoryBackend::new();
        let mut writer = backend.open_writer().unwrap();
        writer.submit(vec![doc("a", "Trigun")]).unwrap();
        writer.clear().unwrap();
        assert_eq!(backend.committed_len(), 1);

        writer.submit(vec![doc("b", "Monster")]).unwrap();
        let reader = backend.open_reader().unwrap();
        assert!(reader.term_query(ID_FIELD, "a", 1).unwrap().is_empty());
        assert_eq!(reader.term_query(ID_FIELD, "b", 1).unwrap().len(), 1);
    }
}
