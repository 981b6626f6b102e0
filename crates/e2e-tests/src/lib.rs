//! End-to-end test infrastructure for catalog-index.
//!
//! Provides a shared TestHarness and sample catalogs for tests covering
//! the store -> flush -> query path and wholesale refreshes.

use std::path::PathBuf;
use std::time::Duration;

use catalog_search::{BufferConfig, DocumentStore, MemoryBackend, TantivyBackend};
use catalog_types::{Anime, RecordError, VisualNovel};

/// Shared test harness for E2E tests.
///
/// Owns a temp directory with one index path per catalog.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Root holding the per-catalog index directories
    pub root: PathBuf,
    pub anime_index_path: PathBuf,
    pub vn_index_path: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let anime_index_path = root.join("anime");
        let vn_index_path = root.join("visual_novel");

        Self {
            _temp_dir: temp_dir,
            root,
            anime_index_path,
            vn_index_path,
        }
    }

    /// Tantivy-backed anime store with the given buffer limits.
    pub fn anime_store(
        &self,
        max_buff_len: usize,
        max_buff_age: Duration,
    ) -> DocumentStore<Anime, TantivyBackend> {
        let config = BufferConfig::new(&self.anime_index_path)
            .with_max_buff_len(max_buff_len)
            .with_max_buff_age(max_buff_age);
        DocumentStore::open_in_dir(config).expect("Failed to open anime store")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory anime store, returning the backend handle for inspection.
pub fn memory_anime_store(
    backend: MemoryBackend,
    max_buff_len: usize,
    max_buff_age: Duration,
) -> DocumentStore<Anime, MemoryBackend> {
    let config = BufferConfig::default()
        .with_max_buff_len(max_buff_len)
        .with_max_buff_age(max_buff_age);
    DocumentStore::with_backend(backend, config).expect("Failed to build memory store")
}

/// Create N anime with ids `anidb-{i}` and titles `{base_title} {i}`.
pub fn create_test_anime(count: usize, base_title: &str) -> Vec<Anime> {
    (0..count)
        .map(|i| {
            Anime::new(format!("anidb-{}", i), format!("{} {}", base_title, i))
                .with_kind("TV Series")
                .with_episodes(12 + i as u32)
        })
        .collect()
}

const SAMPLE_ANIME: &str = r#"[
    {"id": "anidb-23", "title": "Cowboy Bebop", "synonyms": ["Kaubooi Bibappu"], "kind": "TV Series", "episodes": 26, "year": 1998},
    {"id": "anidb-9541", "title": "Shingeki no Kyojin", "english_title": "Attack on Titan", "synonyms": ["AoT", "SnK"], "kind": "TV Series", "episodes": 25, "year": 2013},
    {"id": "anidb-4563", "title": "Steins;Gate", "english_title": "Steins;Gate", "kind": "TV Series", "episodes": 24, "year": 2011},
    {"id": "anidb-5101", "title": "Cowboy Bebop Tengoku no Tobira", "english_title": "Cowboy Bebop: The Movie", "kind": "Movie", "episodes": 1, "year": 2001}
]"#;

const SAMPLE_VISUAL_NOVELS: &str = r#"[
    {"id": "v2002", "title": "Steins;Gate", "original_title": "シュタインズ・ゲート", "aliases": ["SG"], "released": "2009-10-15", "length": 4},
    {"id": "v11", "title": "Fate/stay night", "aliases": ["FSN"], "released": "2004-01-30", "length": 5},
    {"id": "v17", "title": "Ever17 -the out of infinity-", "aliases": ["Ever17"], "released": "2002-08-29", "length": 4}
]"#;

/// A small anime dump, decoded the way a dataset producer would.
pub fn sample_anime() -> Vec<Anime> {
    serde_json::from_str(SAMPLE_ANIME).expect("Failed to decode sample anime")
}

pub fn sample_visual_novels() -> Vec<VisualNovel> {
    serde_json::from_str(SAMPLE_VISUAL_NOVELS).expect("Failed to decode sample visual novels")
}

/// Wrap records as a producer that never fails.
pub fn producer<R>(records: Vec<R>) -> Vec<Result<R, RecordError>> {
    records.into_iter().map(Ok).collect()
}
