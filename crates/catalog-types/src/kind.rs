//! Catalog kinds served by the index.

use serde::{Deserialize, Serialize};

/// The reference catalogs kept in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Anime,
    VisualNovel,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 2] = [CatalogKind::Anime, CatalogKind::VisualNovel];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Anime => "anime",
            CatalogKind::VisualNovel => "visual_novel",
        }
    }

    /// Parse from string, returning None for unknown kinds.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "anime" => Some(CatalogKind::Anime),
            "visual_novel" | "vn" => Some(CatalogKind::VisualNovel),
            _ => None,
        }
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown catalog kind: {}", s))
    }
}
