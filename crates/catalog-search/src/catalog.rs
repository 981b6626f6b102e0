//! Kind-keyed search over the anime and visual novel catalogs.

use std::path::Path;

use tracing::{info, warn};

use catalog_types::{Anime, CatalogKind, RecordError, Settings, VisualNovel};

use crate::backend::IndexBackend;
use crate::error::IndexError;
use crate::index::{TantivyBackend, TantivyIndexConfig};
use crate::ranker::Match;
use crate::wholesale::WholesaleIndex;

/// A record from either catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogRecord {
    Anime(Anime),
    VisualNovel(VisualNovel),
}

impl CatalogRecord {
    pub fn kind(&self) -> CatalogKind {
        match self {
            CatalogRecord::Anime(_) => CatalogKind::Anime,
            CatalogRecord::VisualNovel(_) => CatalogKind::VisualNovel,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CatalogRecord::Anime(a) => &a.id,
            CatalogRecord::VisualNovel(v) => &v.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CatalogRecord::Anime(a) => &a.title,
            CatalogRecord::VisualNovel(v) => &v.title,
        }
    }
}

pub type CatalogMatch = Match<CatalogRecord>;

/// Outcome of rebuilding both catalogs. One failing does not stop the other.
#[derive(Debug)]
pub struct RefreshReport {
    pub anime: Result<usize, IndexError>,
    pub visual_novels: Result<usize, IndexError>,
}

impl RefreshReport {
    pub fn is_ok(&self) -> bool {
        self.anime.is_ok() && self.visual_novels.is_ok()
    }

    /// Record counts of both catalogs, or the first error.
    pub fn into_result(self) -> Result<(usize, usize), IndexError> {
        Ok((self.anime?, self.visual_novels?))
    }
}

/// Owns one wholesale index per catalog.
pub struct CatalogSearcher<B: IndexBackend> {
    anime: WholesaleIndex<Anime, B>,
    visual_novels: WholesaleIndex<VisualNovel, B>,
}

impl CatalogSearcher<TantivyBackend> {
    /// Tantivy indexes under `root/anime` and `root/visual_novel`.
    pub fn open_in_dir(root: impl AsRef<Path>) -> Result<Self, IndexError> {
        let root = root.as_ref();
        let anime =
            WholesaleIndex::open_in_dir(TantivyIndexConfig::for_catalog(root, CatalogKind::Anime))?;
        let visual_novels = WholesaleIndex::open_in_dir(TantivyIndexConfig::for_catalog(
            root,
            CatalogKind::VisualNovel,
        ))?;
        Ok(Self::new(anime, visual_novels))
    }

    /// Indexes laid out by the settings' data directory.
    pub fn open_with_settings(settings: &Settings) -> Result<Self, IndexError> {
        let config = |kind: CatalogKind| TantivyIndexConfig::from_settings(settings, kind);
        let anime = WholesaleIndex::open_in_dir(config(CatalogKind::Anime))?;
        let visual_novels = WholesaleIndex::open_in_dir(config(CatalogKind::VisualNovel))?;
        Ok(Self::new(anime, visual_novels))
    }
}

impl<B: IndexBackend> CatalogSearcher<B> {
    pub fn new(anime: WholesaleIndex<Anime, B>, visual_novels: WholesaleIndex<VisualNovel, B>) -> Self {
        Self {
            anime,
            visual_novels,
        }
    }

    pub fn anime(&self) -> &WholesaleIndex<Anime, B> {
        &self.anime
    }

    pub fn visual_novels(&self) -> &WholesaleIndex<VisualNovel, B> {
        &self.visual_novels
    }

    /// Open both readers.
    pub async fn open(&self) -> Result<(), IndexError> {
        self.anime.open().await?;
        self.visual_novels.open().await?;
        info!("Opened catalog searcher");
        Ok(())
    }

    pub async fn close(&self) {
        self.anime.close().await;
        self.visual_novels.close().await;
    }

    /// Rebuild both catalogs concurrently.
    pub async fn refresh<A, V>(&self, anime: A, visual_novels: V) -> RefreshReport
    where
        A: IntoIterator<Item = Result<Anime, RecordError>> + Send + 'static,
        A::IntoIter: Send,
        V: IntoIterator<Item = Result<VisualNovel, RecordError>> + Send + 'static,
        V::IntoIter: Send,
    {
        let (anime, visual_novels) = tokio::join!(
            self.anime.overwrite_data(anime),
            self.visual_novels.overwrite_data(visual_novels),
        );

        if let Err(e) = &anime {
            warn!(catalog = "anime", error = %e, "Catalog refresh failed");
        }
        if let Err(e) = &visual_novels {
            warn!(catalog = "visual_novel", error = %e, "Catalog refresh failed");
        }

        RefreshReport {
            anime,
            visual_novels,
        }
    }

    pub async fn search(
        &self,
        kind: CatalogKind,
        text: &str,
        limit: usize,
    ) -> Result<Vec<CatalogMatch>, IndexError> {
        let matches = match kind {
            CatalogKind::Anime => self
                .anime
                .search(text, limit)
                .await?
                .into_iter()
                .map(|m| m.map(CatalogRecord::Anime))
                .collect(),
            CatalogKind::VisualNovel => self
                .visual_novels
                .search(text, limit)
                .await?
                .into_iter()
                .map(|m| m.map(CatalogRecord::VisualNovel))
                .collect(),
        };
        Ok(matches)
    }

    pub async fn read(&self, kind: CatalogKind, id: &str) -> Result<CatalogRecord, IndexError> {
        match kind {
            CatalogKind::Anime => self.anime.read(id).await.map(CatalogRecord::Anime),
            CatalogKind::VisualNovel => {
                self.visual_novels.read(id).await.map(CatalogRecord::VisualNovel)
            }
        }
    }
}
