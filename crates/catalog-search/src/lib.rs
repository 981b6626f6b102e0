//! # catalog-search
//!
//! Buffered full-text indexing and ranked lookup over title catalogs.
//!
//! Resolves fuzzy title input to stable record ids. Records are indexed
//! either incrementally through a [`DocumentStore`] (buffered, committed in
//! batches by a background worker) or in full through a [`WholesaleIndex`]
//! (the reference dataset is replaced on every refresh).
//!
//! ## Features
//! - Tantivy index with MmapDirectory for persistence, BM25 scoring
//! - In-memory backend with snapshot readers
//! - One query per search field, merged into one result per record id
//! - Readers never observe a partially applied batch

pub mod backend;
pub mod catalog;
pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod memory;
mod query;
pub mod ranker;
pub mod schema;
pub mod searcher;
pub mod store;
pub mod wholesale;
mod worker;

pub use backend::{BackendReader, BackendWriter, Hit, IndexBackend};
pub use catalog::{CatalogMatch, CatalogRecord, CatalogSearcher, RefreshReport};
pub use error::IndexError;
pub use index::{open_or_create_index, TantivyBackend, TantivyIndexConfig};
pub use indexer::TantivyWriter;
pub use memory::{MemoryBackend, MemoryReader, MemoryWriter};
pub use ranker::{Match, MatchList};
pub use schema::CatalogSchema;
pub use searcher::TantivyReader;
pub use store::{BufferConfig, DocumentStore, DEFAULT_MAX_BUFF_AGE, DEFAULT_MAX_BUFF_LEN};
pub use wholesale::WholesaleIndex;
pub use worker::WorkerHealth;
