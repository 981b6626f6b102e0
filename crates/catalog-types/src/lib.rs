//! # catalog-types
//!
//! Record contract and record kinds for the catalog index.
//!
//! ## Key Components
//!
//! - [`Record`]: the (un)marshaling boundary every indexed record satisfies
//! - [`Document`]: index-native representation of one record
//! - [`StoredFields`]: field values retrieved from the index for one hit
//! - [`Anime`] and [`VisualNovel`]: the two reference catalogs
//! - [`Settings`]: layered configuration (defaults, file, env)

pub mod anime;
pub mod config;
pub mod error;
pub mod kind;
pub mod record;
pub mod visual_novel;

pub use anime::Anime;
pub use config::{BufferSettings, Settings, DEFAULT_WRITER_MEMORY_MB, MIN_WRITER_MEMORY_MB};
pub use error::{ConfigError, RecordError};
pub use kind::CatalogKind;
pub use record::{DocField, Document, FieldKind, FieldSpec, Record, StoredFields, ID_FIELD};
pub use visual_novel::VisualNovel;
