//! Anime catalog entries.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::record::{Document, FieldSpec, Record, StoredFields};

const SCHEMA: &[FieldSpec] = &[
    FieldSpec::text("title"),
    FieldSpec::text("english_title"),
    FieldSpec::text("synonyms"),
    FieldSpec::stored("kind"),
    FieldSpec::stored("episodes"),
    FieldSpec::stored("year"),
];

const SEARCH_FIELDS: &[&str] = &["title", "english_title", "synonyms"];

/// One entry of the anime reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anime {
    pub id: String,
    /// Romanized title
    pub title: String,
    #[serde(default)]
    pub english_title: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Release format: "TV", "MOVIE", "OVA", ...
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub year: Option<u16>,
}

impl Anime {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            english_title: String::new(),
            synonyms: Vec::new(),
            kind: String::new(),
            episodes: None,
            year: None,
        }
    }

    pub fn with_english_title(mut self, title: impl Into<String>) -> Self {
        self.english_title = title.into();
        self
    }

    pub fn with_synonyms<S: Into<String>>(mut self, synonyms: impl IntoIterator<Item = S>) -> Self {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_episodes(mut self, episodes: u32) -> Self {
        self.episodes = Some(episodes);
        self
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }
}

impl Record for Anime {
    fn schema() -> &'static [FieldSpec] {
        SCHEMA
    }

    fn search_fields() -> &'static [&'static str] {
        SEARCH_FIELDS
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn marshal(&self) -> Result<Document, RecordError> {
        Ok(Document::new(self.id.clone())?
            .text("title", self.title.clone())
            .text("english_title", self.english_title.clone())
            .text_list("synonyms", &self.synonyms)?
            .stored("kind", self.kind.clone())
            .stored_opt("episodes", self.episodes)
            .stored_opt("year", self.year))
    }

    fn unmarshal(fields: &StoredFields) -> Result<Self, RecordError> {
        Ok(Self {
            id: fields.id()?.to_string(),
            title: fields.require("title")?.to_string(),
            english_title: fields.text("english_title"),
            synonyms: fields.list("synonyms"),
            kind: fields.text("kind"),
            episodes: fields.parse_opt("episodes")?,
            year: fields.parse_opt("year")?,
        })
    }
}
