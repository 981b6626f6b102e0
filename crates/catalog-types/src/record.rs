//! The record contract shared by every indexed record kind.
//!
//! A record turns itself into a [`Document`] (named fields, each either
//! full-text indexed or stored only) and rebuilds itself from the
//! [`StoredFields`] of a hit. The identity always travels in the reserved
//! [`ID_FIELD`].

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::RecordError;

/// Reserved field holding the record identity.
pub const ID_FIELD: &str = "_id";

/// Separator for list-valued attributes.
const LIST_SEPARATOR: &str = "\n";

/// How a field is handled by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Tokenized, searchable and stored
    Text,
    /// Carried for retrieval only
    Stored,
}

/// Declaration of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
        }
    }

    pub const fn stored(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Stored,
        }
    }

    pub fn is_searchable(&self) -> bool {
        self.kind == FieldKind::Text
    }
}

/// One named value inside a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocField {
    pub spec: FieldSpec,
    pub value: String,
}

/// Index-native representation of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: String,
    fields: Vec<DocField>,
}

impl Document {
    /// Start a document for the given identity.
    ///
    /// Empty identities are rejected since they cannot be looked up again.
    pub fn new(id: impl Into<String>) -> Result<Self, RecordError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RecordError::Encode("record id is empty".to_string()));
        }
        Ok(Self {
            id,
            fields: Vec::new(),
        })
    }

    /// Add a full-text field.
    pub fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push(DocField {
            spec: FieldSpec::text(name),
            value: value.into(),
        });
        self
    }

    /// Add a list as a full-text field, one entry per line.
    ///
    /// Entries must be non-empty and single-line so that
    /// [`StoredFields::list`] gives back exactly what was written.
    pub fn text_list(self, name: &'static str, values: &[String]) -> Result<Self, RecordError> {
        if let Some(bad) = values
            .iter()
            .find(|v| v.is_empty() || v.contains(LIST_SEPARATOR))
        {
            return Err(RecordError::Encode(format!(
                "{} entry {:?} of {} is empty or spans lines",
                name, bad, self.id
            )));
        }
        Ok(self.text(name, values.join(LIST_SEPARATOR)))
    }

    /// Add a stored-only field.
    pub fn stored(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push(DocField {
            spec: FieldSpec::stored(name),
            value: value.into(),
        });
        self
    }

    /// Add a stored-only field when the value is present.
    pub fn stored_opt<T: ToString>(self, name: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.stored(name, v.to_string()),
            None => self,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &[DocField] {
        &self.fields
    }

    /// First value of a named field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.spec.name == name)
            .map(|f| f.value.as_str())
    }

    /// The values a backend hands back for this document.
    pub fn to_stored_fields(&self) -> StoredFields {
        let mut stored = StoredFields::new();
        stored.insert(ID_FIELD, self.id.clone());
        for field in &self.fields {
            stored.insert(field.spec.name, field.value.clone());
        }
        stored
    }
}

/// Field values retrieved from the index for a single hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredFields {
    values: BTreeMap<String, String>,
}

impl StoredFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The reserved identity value.
    pub fn id(&self) -> Result<&str, RecordError> {
        self.require(ID_FIELD)
    }

    /// A value that must be present.
    pub fn require(&self, name: &str) -> Result<&str, RecordError> {
        self.get(name)
            .ok_or_else(|| RecordError::MissingField(name.to_string()))
    }

    /// A text value, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    /// A list value written by [`Document::text_list`]. Blank lines are skipped.
    pub fn list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|v| {
                v.split(LIST_SEPARATOR)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// An optional value parsed with [`FromStr`].
    ///
    /// Absent or empty values are `None`; unparsable values are a decode error.
    pub fn parse_opt<T>(&self, name: &str) -> Result<Option<T>, RecordError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        match self.get(name) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| RecordError::decode(name, e)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StoredFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut stored = StoredFields::new();
        for (k, v) in iter {
            stored.insert(k, v);
        }
        stored
    }
}

/// Contract every indexed record kind implements.
///
/// Kinds are closed: each gets its own store instantiation rather than
/// being dispatched dynamically.
pub trait Record: Sized + Send + Sync + 'static {
    /// Every field this kind writes, excluding [`ID_FIELD`].
    fn schema() -> &'static [FieldSpec];

    /// Searchable fields in query order. Each must be a text field of [`Record::schema`].
    fn search_fields() -> &'static [&'static str];

    /// Stable identity.
    fn id(&self) -> &str;

    fn marshal(&self) -> Result<Document, RecordError>;

    fn unmarshal(fields: &StoredFields) -> Result<Self, RecordError>;
}
