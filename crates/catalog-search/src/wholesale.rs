//! Index over a reference dataset that is only ever replaced in full.
//!
//! There is no write buffer and no background worker. A rebuild holds the
//! exclusive lock from clearing the index until the reader is reopened,
//! so queries see either the old dataset or the new one.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use catalog_types::{Record, RecordError};

use crate::backend::{BackendReader, BackendWriter, IndexBackend};
use crate::error::IndexError;
use crate::index::{TantivyBackend, TantivyIndexConfig};
use crate::query::{self, ReaderSlot};
use crate::ranker::Match;

/// Wholesale read/writer for one record kind.
pub struct WholesaleIndex<R, B: IndexBackend> {
    backend: Arc<B>,
    search_fields: Arc<[String]>,
    reader: ReaderSlot<B>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> WholesaleIndex<R, TantivyBackend> {
    /// Open (or create) a Tantivy index for `R`.
    pub fn open_in_dir(config: TantivyIndexConfig) -> Result<Self, IndexError> {
        let backend = TantivyBackend::open_or_create(config, R::schema())?;
        Ok(Self::with_backend(backend))
    }
}

impl<R: Record, B: IndexBackend> WholesaleIndex<R, B> {
    /// Searches query the record's own search fields.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            search_fields: R::search_fields().iter().map(|f| f.to_string()).collect(),
            reader: Arc::new(RwLock::new(None)),
            _record: PhantomData,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open the reader. Reads fail with `ReaderUninitialized` until this is called.
    pub async fn open(&self) -> Result<(), IndexError> {
        let mut guard = self.reader.clone().write_owned().await;
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || {
            *guard = Some(backend.open_reader()?);
            Ok::<_, IndexError>(())
        })
        .await??;
        debug!("Opened wholesale index reader");
        Ok(())
    }

    /// Release the reader.
    pub async fn close(&self) {
        *self.reader.write().await = None;
        debug!("Closed wholesale index reader");
    }

    pub async fn is_open(&self) -> bool {
        self.reader.read().await.is_some()
    }

    /// Replace the whole dataset with the records yielded by `records`.
    ///
    /// The producer is drained on the blocking pool. The first producer or
    /// marshal error aborts the rebuild before anything is submitted, so
    /// the previous dataset stays in place. Returns the number of records
    /// written.
    pub async fn overwrite_data<I>(&self, records: I) -> Result<usize, IndexError>
    where
        I: IntoIterator<Item = Result<R, RecordError>> + Send + 'static,
        I::IntoIter: Send,
    {
        let mut guard = self.reader.clone().write_owned().await;
        let backend = self.backend.clone();

        let count = tokio::task::spawn_blocking(move || {
            let mut writer = backend.open_writer()?;
            writer.clear()?;

            let batch = records
                .into_iter()
                .map(|record| record.and_then(|r| r.marshal()))
                .collect::<Result<Vec<_>, _>>()?;
            let count = batch.len();

            writer.submit(batch)?;
            writer.close()?;

            if guard.is_some() {
                *guard = Some(backend.open_reader()?);
            }
            Ok::<_, IndexError>(count)
        })
        .await??;

        info!(count, "Rebuilt wholesale index");
        Ok(count)
    }

    /// Fetch a record by id.
    pub async fn read(&self, id: &str) -> Result<R, IndexError> {
        let guard = self.reader.clone().read_owned().await;
        query::point_lookup(guard, id).await
    }

    /// Ranked matches for `text` across the search fields, best first.
    pub async fn search(&self, text: &str, limit: usize) -> Result<Vec<Match<R>>, IndexError> {
        if query::is_trivial_search(text, limit) {
            return Ok(Vec::new());
        }
        let guard = self.reader.clone().read_owned().await;
        query::ranked_search(guard, self.search_fields.clone(), text, limit).await
    }

    /// Documents visible to the reader.
    pub async fn num_docs(&self) -> Result<u64, IndexError> {
        let guard = self.reader.read().await;
        let reader = guard.as_ref().ok_or(IndexError::ReaderUninitialized)?;
        Ok(reader.num_docs())
    }
}
