//! Background flush worker of the document store.
//!
//! The worker owns the index writer and the write buffer. It accepts
//! records from [`crate::DocumentStore::store`] one at a time and commits
//! the buffer when it is full, when it has aged past the configured
//! limit, or when the write context is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use catalog_types::Document;

use crate::backend::{BackendWriter, IndexBackend};
use crate::error::IndexError;
use crate::query::ReaderSlot;

/// Buffer slots reserved up front; larger buffers grow as records arrive.
const MAX_PREALLOCATED_DOCS: usize = 1024;

/// State of the flush worker as seen by the store's owner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkerHealth {
    /// No worker running; the next store starts one
    #[default]
    Idle,
    Running,
    /// The worker stopped on a backend error. The store has to be recreated.
    Failed(String),
}

impl WorkerHealth {
    pub fn is_failed(&self) -> bool {
        matches!(self, WorkerHealth::Failed(_))
    }
}

/// A record on its way to the worker. The worker answers `ack` as soon
/// as the document is in the buffer.
pub(crate) struct Envelope {
    pub doc: Document,
    pub ack: oneshot::Sender<()>,
}

pub(crate) struct FlushWorker<B: IndexBackend> {
    backend: Arc<B>,
    writer: Option<B::Writer>,
    reader: ReaderSlot<B>,
    buffer: Vec<Document>,
    max_buff_len: usize,
    max_buff_age: Duration,
    health: Arc<watch::Sender<WorkerHealth>>,
}

impl<B: IndexBackend> FlushWorker<B> {
    pub fn new(
        backend: Arc<B>,
        writer: B::Writer,
        reader: ReaderSlot<B>,
        max_buff_len: usize,
        max_buff_age: Duration,
        health: Arc<watch::Sender<WorkerHealth>>,
    ) -> Self {
        Self {
            backend,
            writer: Some(writer),
            reader,
            buffer: Vec::with_capacity(max_buff_len.min(MAX_PREALLOCATED_DOCS)),
            max_buff_len,
            max_buff_age,
            health,
        }
    }

    /// Run until cancelled or until the store drops every sender.
    ///
    /// Health is updated before the receiver is dropped, so a store call
    /// whose handoff is abandoned can report why.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<Envelope>,
        cancel: CancellationToken,
    ) -> Result<(), IndexError> {
        self.health.send_replace(WorkerHealth::Running);
        info!(
            max_buff_len = self.max_buff_len,
            max_buff_age_ms = self.max_buff_age.as_millis() as u64,
            "Flush worker started"
        );

        let result = self.run_loop(&mut rx, &cancel).await;
        match &result {
            Ok(()) => {
                self.health.send_replace(WorkerHealth::Idle);
                info!("Flush worker stopped");
            }
            Err(e) => {
                error!(error = %e, pending = self.buffer.len(), "Flush worker failed");
                self.health.send_replace(WorkerHealth::Failed(e.to_string()));
            }
        }

        drop(rx);
        result
    }

    async fn run_loop(
        &mut self,
        rx: &mut mpsc::Receiver<Envelope>,
        cancel: &CancellationToken,
    ) -> Result<(), IndexError> {
        let age = tokio::time::sleep(self.max_buff_age);
        tokio::pin!(age);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    // Records already handed off are part of the final batch
                    rx.close();
                    while let Ok(envelope) = rx.try_recv() {
                        self.accept(envelope);
                    }
                    return self.finish().await;
                }
                _ = &mut age => {
                    self.flush().await?;
                    age.as_mut().reset(Instant::now() + self.max_buff_age);
                }
                received = rx.recv() => {
                    let Some(envelope) = received else {
                        debug!("All store handles dropped");
                        return self.finish().await;
                    };
                    self.accept(envelope);
                    if self.buffer.len() >= self.max_buff_len {
                        self.flush().await?;
                        age.as_mut().reset(Instant::now() + self.max_buff_age);
                    }
                }
            }
        }
    }

    fn accept(&mut self, envelope: Envelope) {
        self.buffer.push(envelope.doc);
        // The caller may have given up waiting; the record is kept anyway
        let _ = envelope.ack.send(());
    }

    /// Commit the buffer and refresh an open reader, under the write lock.
    async fn flush(&mut self) -> Result<(), IndexError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let batch = std::mem::take(&mut self.buffer);
        let count = batch.len();
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| IndexError::Backend("index writer already closed".to_string()))?;
        let mut guard = self.reader.clone().write_owned().await;
        let backend = self.backend.clone();

        let (writer, result) = tokio::task::spawn_blocking(move || {
            let result = writer.submit(batch).and_then(|()| {
                if guard.is_some() {
                    *guard = Some(backend.open_reader()?);
                    debug!("Reopened index reader");
                }
                Ok(())
            });
            (writer, result)
        })
        .await?;

        self.writer = Some(writer);
        result?;
        debug!(count, "Flushed write buffer");
        Ok(())
    }

    /// Final flush, then close the writer and reopen the reader.
    async fn finish(&mut self) -> Result<(), IndexError> {
        self.flush().await?;

        let writer = self.writer.take();
        let mut guard = self.reader.clone().write_owned().await;
        let backend = self.backend.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(writer) = writer {
                writer.close()?;
            }
            *guard = Some(backend.open_reader()?);
            Ok::<_, IndexError>(())
        })
        .await??;

        debug!("Closed writer and reopened reader");
        Ok(())
    }
}
