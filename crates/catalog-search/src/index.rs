//! Tantivy index management.
//!
//! Handles index creation and opening, and hands out writers and readers
//! through the [`IndexBackend`] capability.

use std::path::{Path, PathBuf};

use tantivy::{Index, ReloadPolicy};
use tracing::{debug, info};

use catalog_types::{
    CatalogKind, FieldSpec, Settings, DEFAULT_WRITER_MEMORY_MB, MIN_WRITER_MEMORY_MB,
};

use crate::backend::IndexBackend;
use crate::error::IndexError;
use crate::indexer::TantivyWriter;
use crate::schema::CatalogSchema;
use crate::searcher::TantivyReader;

/// Where one catalog's Tantivy index lives and how much its writer may buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TantivyIndexConfig {
    pub index_path: PathBuf,
    /// Never below [`MIN_WRITER_MEMORY_MB`]
    pub writer_memory_mb: usize,
}

impl TantivyIndexConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }

    /// The index of `kind` under a shared catalog root.
    pub fn for_catalog(root: impl AsRef<Path>, kind: CatalogKind) -> Self {
        Self::new(root.as_ref().join(kind.as_str()))
    }

    /// The index of `kind` as laid out and budgeted by the settings.
    pub fn from_settings(settings: &Settings, kind: CatalogKind) -> Self {
        Self::new(settings.index_path(kind)).with_memory_mb(settings.writer_memory_mb)
    }

    /// Budgets under Tantivy's floor are raised to it.
    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb.max(MIN_WRITER_MEMORY_MB);
        self
    }
}

/// On-disk Tantivy index for one record kind.
#[derive(Clone)]
pub struct TantivyBackend {
    index: Index,
    schema: CatalogSchema,
    config: TantivyIndexConfig,
}

impl TantivyBackend {
    /// Open the existing index or create a new one for the declared fields.
    pub fn open_or_create(
        config: TantivyIndexConfig,
        specs: &[FieldSpec],
    ) -> Result<Self, IndexError> {
        let index = open_or_create_index(&config.index_path, specs)?;
        let schema = CatalogSchema::from_schema(index.schema(), specs)?;

        info!(path = ?config.index_path, fields = specs.len(), "Opened catalog index");

        Ok(Self {
            index,
            schema,
            config,
        })
    }

    pub fn schema(&self) -> &CatalogSchema {
        &self.schema
    }

    /// Get the underlying Tantivy index
    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.config.index_path
    }
}

impl IndexBackend for TantivyBackend {
    type Writer = TantivyWriter;
    type Reader = TantivyReader;

    fn open_writer(&self) -> Result<TantivyWriter, IndexError> {
        let memory_budget = self.config.writer_memory_mb * 1024 * 1024;
        let writer = self.index.writer(memory_budget)?;
        debug!(
            path = ?self.config.index_path,
            memory_mb = self.config.writer_memory_mb,
            "Created index writer"
        );
        Ok(TantivyWriter::new(writer, self.schema.clone()))
    }

    fn open_reader(&self) -> Result<TantivyReader, IndexError> {
        // Visibility is driven by the stores reopening readers, never by reload
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        debug!(path = ?self.config.index_path, "Created index reader");
        Ok(TantivyReader::new(
            reader,
            self.index.clone(),
            self.schema.clone(),
        ))
    }
}

/// Open an existing index or create a new one.
///
/// Uses MmapDirectory for persistence.
pub fn open_or_create_index(path: &Path, specs: &[FieldSpec]) -> Result<Index, IndexError> {
    if path.join("meta.json").exists() {
        debug!(path = ?path, "Opening existing index");
        let index = Index::open_in_dir(path)?;
        Ok(index)
    } else {
        info!(path = ?path, "Creating new index");
        std::fs::create_dir_all(path)?;
        let schema = CatalogSchema::build(specs);
        let index = Index::create_in_dir(path, schema.schema().clone())?;
        Ok(index)
    }
}
