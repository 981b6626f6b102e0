//! Visual novel catalog entries.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::record::{Document, FieldSpec, Record, StoredFields};

const SCHEMA: &[FieldSpec] = &[
    FieldSpec::text("title"),
    FieldSpec::text("original_title"),
    FieldSpec::text("aliases"),
    FieldSpec::stored("released"),
    FieldSpec::stored("length"),
];

const SEARCH_FIELDS: &[&str] = &["title", "original_title", "aliases"];

/// One entry of the visual novel reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualNovel {
    pub id: String,
    pub title: String,
    /// Title in the original script
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Release date as published by the source ("2004-01-30", "2011", "TBA")
    #[serde(default)]
    pub released: Option<String>,
    /// Length class, 1 (very short) to 5 (very long)
    #[serde(default)]
    pub length: Option<u8>,
}

impl VisualNovel {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            original_title: String::new(),
            aliases: Vec::new(),
            released: None,
            length: None,
        }
    }

    pub fn with_original_title(mut self, title: impl Into<String>) -> Self {
        self.original_title = title.into();
        self
    }

    pub fn with_aliases<S: Into<String>>(mut self, aliases: impl IntoIterator<Item = S>) -> Self {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_released(mut self, released: impl Into<String>) -> Self {
        self.released = Some(released.into());
        self
    }

    pub fn with_length(mut self, length: u8) -> Self {
        self.length = Some(length);
        self
    }
}

impl Record for VisualNovel {
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
        if let Some(length) = self.length {
            if !(1..=5).contains(&length) {
                return Err(RecordError::Encode(format!(
                    "length {} out of range 1-5 for {}",
                    length, self.id
                )));
            }
        }

        Ok(Document::new(self.id.clone())?
            .text("title", self.title.clone())
            .text("original_title", self.original_title.clone())
            .text_list("aliases", &self.aliases)?
            .stored_opt("released", self.released.as_deref())
            .stored_opt("length", self.length))
    }

    fn unmarshal(fields: &StoredFields) -> Result<Self, RecordError> {
        Ok(Self {
            id: fields.id()?.to_string(),
            title: fields.require("title")?.to_string(),
            original_title: fields.text("original_title"),
            aliases: fields.list("aliases"),
            released: fields.get("released").map(str::to_string),
            length: fields.parse_opt("length")?,
        })
    }
}
