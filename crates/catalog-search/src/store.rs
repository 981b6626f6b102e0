//! Buffered document store.
//!
//! Accepts records without waiting on index I/O. Records are handed to a
//! background [`FlushWorker`] that commits them in batches; they become
//! visible to [`DocumentStore::get`] and [`DocumentStore::search`] at the
//! next flush.
//!
//! One store instance per index location. The store owns its worker: the
//! first `store()` opens a writer and starts the worker, `flush()` stops it,
//! and the next `store()` starts a fresh one.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch, Mutex, OwnedRwLockReadGuard, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use catalog_types::{BufferSettings, CatalogKind, Record, Settings};

use crate::backend::{BackendReader, IndexBackend};
use crate::error::IndexError;
use crate::index::{TantivyBackend, TantivyIndexConfig};
use crate::query::{self, ReaderSlot};
use crate::ranker::Match;
use crate::worker::{Envelope, FlushWorker, WorkerHealth};

/// Default number of buffered records that triggers a flush
pub const DEFAULT_MAX_BUFF_LEN: usize = 1000;

/// Default age of the write buffer that triggers a flush
pub const DEFAULT_MAX_BUFF_AGE: Duration = Duration::from_secs(5);

/// Default index location
pub const DEFAULT_INDEX_PATH: &str = "./catalog-index";

/// Buffering and layout of one document store.
///
/// Zero or empty values are replaced by defaults when the store is built.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferConfig {
    /// Index directory (used by [`DocumentStore::open_in_dir`])
    pub index_path: PathBuf,
    /// Fields queried by search, in order. Empty means the record's own.
    pub search_fields: Vec<String>,
    /// Buffered record count that triggers a flush
    pub max_buff_len: usize,
    /// Buffer age that triggers a flush
    pub max_buff_age: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            search_fields: Vec::new(),
            max_buff_len: DEFAULT_MAX_BUFF_LEN,
            max_buff_age: DEFAULT_MAX_BUFF_AGE,
        }
    }
}

impl BufferConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            ..Default::default()
        }
    }

    /// Build from loaded settings for one catalog kind.
    pub fn from_settings(settings: &Settings, kind: CatalogKind) -> Self {
        let mut config = BufferConfig::from(&settings.buffer);
        config.index_path = settings.index_path(kind);
        config
    }

    pub fn with_search_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_buff_len(mut self, len: usize) -> Self {
        self.max_buff_len = len;
        self
    }

    pub fn with_max_buff_age(mut self, age: Duration) -> Self {
        self.max_buff_age = age;
        self
    }

    /// Fill unset values and check search fields against the record schema.
    fn resolve<R: Record>(mut self) -> Result<Self, IndexError> {
        if self.index_path.as_os_str().is_empty() {
            self.index_path = PathBuf::from(DEFAULT_INDEX_PATH);
        }
        if self.max_buff_len == 0 {
            self.max_buff_len = DEFAULT_MAX_BUFF_LEN;
        }
        if self.max_buff_age.is_zero() {
            self.max_buff_age = DEFAULT_MAX_BUFF_AGE;
        }
        if self.search_fields.is_empty() {
            self.search_fields = R::search_fields().iter().map(|f| f.to_string()).collect();
        }

        for field in &self.search_fields {
            let declared = R::schema()
                .iter()
                .any(|spec| spec.name == field.as_str() && spec.is_searchable());
            if !declared {
                return Err(IndexError::SchemaMismatch(format!(
                    "search field '{}' is not a text field of the record",
                    field
                )));
            }
        }
        Ok(self)
    }
}

impl From<&BufferSettings> for BufferConfig {
    fn from(settings: &BufferSettings) -> Self {
        Self {
            max_buff_len: settings.max_buff_len,
            max_buff_age: Duration::from_millis(settings.max_buff_age_ms),
            ..Default::default()
        }
    }
}

/// A running worker and the handles used to reach it.
struct Session {
    tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), IndexError>>,
}

/// Buffered, eventually consistent index of one record kind.
pub struct DocumentStore<R, B: IndexBackend> {
    backend: Arc<B>,
    config: BufferConfig,
    search_fields: Arc<[String]>,
    reader: ReaderSlot<B>,
    session: Mutex<Option<Session>>,
    health: Arc<watch::Sender<WorkerHealth>>,
    closed: AtomicBool,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> DocumentStore<R, TantivyBackend> {
    /// Open (or create) a Tantivy index at `config.index_path`.
    pub fn open_in_dir(config: BufferConfig) -> Result<Self, IndexError> {
        let index_config = TantivyIndexConfig::new(config.index_path.clone());
        Self::open_with_index_config(config, index_config)
    }

    /// Open the store for `kind` as laid out by the settings.
    pub fn open_with_settings(settings: &Settings, kind: CatalogKind) -> Result<Self, IndexError> {
        let config = BufferConfig::from_settings(settings, kind);
        let index_config = TantivyIndexConfig::from_settings(settings, kind);
        Self::open_with_index_config(config, index_config)
    }

    fn open_with_index_config(
        config: BufferConfig,
        index_config: TantivyIndexConfig,
    ) -> Result<Self, IndexError> {
        let config = config.resolve::<R>()?;
        let index_config = TantivyIndexConfig {
            index_path: config.index_path.clone(),
            ..index_config
        };
        let backend = TantivyBackend::open_or_create(index_config, R::schema())?;
        Self::with_backend(backend, config)
    }
}

impl<R: Record, B: IndexBackend> DocumentStore<R, B> {
    /// Build a store over any backend. Nothing is opened until first use.
    pub fn with_backend(backend: B, config: BufferConfig) -> Result<Self, IndexError> {
        let config = config.resolve::<R>()?;
        let search_fields: Arc<[String]> = config.search_fields.iter().cloned().collect();
        let (health, _) = watch::channel(WorkerHealth::Idle);

        debug!(
            path = ?config.index_path,
            fields = ?config.search_fields,
            max_buff_len = config.max_buff_len,
            "Created document store"
        );

        Ok(Self {
            backend: Arc::new(backend),
            config,
            search_fields,
            reader: Arc::new(RwLock::new(None)),
            session: Mutex::new(None),
            health: Arc::new(health),
            closed: AtomicBool::new(false),
            _record: PhantomData,
        })
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn health(&self) -> WorkerHealth {
        self.health.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), IndexError> {
        if self.is_closed() {
            return Err(IndexError::Closed);
        }
        Ok(())
    }

    /// Hand a record to the flush worker.
    ///
    /// Returns once the worker has accepted the record, not once it is
    /// indexed. Starts a writer and worker if none is running.
    pub async fn store(&self, record: &R) -> Result<(), IndexError> {
        self.ensure_open()?;
        let doc = record.marshal()?;
        let (tx, cancel) = self.session_handle().await?;

        let (ack, acked) = oneshot::channel();
        let envelope = Envelope { doc, ack };

        tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(IndexError::ShuttingDown),
            sent = tx.send(envelope) => {
                if sent.is_err() {
                    return Err(self.abandoned_handoff(&cancel));
                }
            }
        }

        acked.await.map_err(|_| self.abandoned_handoff(&cancel))
    }

    /// Sender and write context of the running worker, starting one if needed.
    async fn session_handle(&self) -> Result<(mpsc::Sender<Envelope>, CancellationToken), IndexError> {
        let mut session = self.session.lock().await;
        // close() marks the store before taking this lock
        self.ensure_open()?;
        if let WorkerHealth::Failed(reason) = self.health() {
            return Err(IndexError::WorkerFailed(reason));
        }

        if let Some(running) = session.as_ref() {
            return Ok((running.tx.clone(), running.cancel.clone()));
        }

        let backend = self.backend.clone();
        let writer = tokio::task::spawn_blocking(move || backend.open_writer()).await??;

        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let worker = FlushWorker::new(
            self.backend.clone(),
            writer,
            self.reader.clone(),
            self.config.max_buff_len,
            self.config.max_buff_age,
            self.health.clone(),
        );
        let handle = tokio::spawn(worker.run(rx, cancel.clone()));

        *session = Some(Session {
            tx: tx.clone(),
            cancel: cancel.clone(),
            handle,
        });
        Ok((tx, cancel))
    }

    fn abandoned_handoff(&self, cancel: &CancellationToken) -> IndexError {
        if cancel.is_cancelled() {
            return IndexError::ShuttingDown;
        }
        match self.health() {
            WorkerHealth::Failed(reason) => IndexError::WorkerFailed(reason),
            _ => IndexError::WorkerFailed("flush worker exited".to_string()),
        }
    }

    /// Commit everything handed off so far and stop the worker.
    ///
    /// Returns after the writer is closed and the reader reopened. A no-op
    /// when no worker is running. If the worker had failed, its error is
    /// returned here once.
    pub async fn flush(&self) -> Result<(), IndexError> {
        let mut session = self.session.lock().await;
        let Some(running) = session.take() else {
            return Ok(());
        };

        running.cancel.cancel();
        drop(running.tx);
        let result = running.handle.await?;

        if let Err(e) = &result {
            warn!(error = %e, "Flush found a failed worker");
        } else {
            debug!(path = ?self.config.index_path, "Flushed document store");
        }
        result
    }

    /// Flush, release the reader and refuse further use.
    pub async fn close(&self) -> Result<(), IndexError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(IndexError::Closed);
        }

        let flushed = self.flush().await;
        *self.reader.write().await = None;

        info!(path = ?self.config.index_path, "Closed document store");
        flushed
    }

    /// Shared guard over an open reader, opening one if none is.
    async fn open_reader(&self) -> Result<OwnedRwLockReadGuard<Option<B::Reader>>, IndexError> {
        self.ensure_open()?;
        let guard = self.reader.clone().read_owned().await;
        if guard.is_some() {
            return Ok(guard);
        }
        drop(guard);

        let mut guard = self.reader.clone().write_owned().await;
        if guard.is_none() {
            let backend = self.backend.clone();
            let reader = tokio::task::spawn_blocking(move || backend.open_reader()).await??;
            *guard = Some(reader);
            debug!(path = ?self.config.index_path, "Opened index reader");
        }
        Ok(guard.downgrade())
    }

    /// Fetch a record by id as of the last flush.
    pub async fn get(&self, id: &str) -> Result<R, IndexError> {
        let guard = self.open_reader().await?;
        query::point_lookup(guard, id).await
    }

    /// Ranked matches for `text` across the search fields, best first.
    pub async fn search(&self, text: &str, limit: usize) -> Result<Vec<Match<R>>, IndexError> {
        self.ensure_open()?;
        if query::is_trivial_search(text, limit) {
            return Ok(Vec::new());
        }
        let guard = self.open_reader().await?;
        query::ranked_search(guard, self.search_fields.clone(), text, limit).await
    }

    /// Documents visible to the current reader.
    pub async fn num_docs(&self) -> Result<u64, IndexError> {
        let guard = self.open_reader().await?;
        Ok(guard.as_ref().map_or(0, |reader| reader.num_docs()))
    }
}
