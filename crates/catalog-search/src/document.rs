//! Document mapping between record documents and Tantivy documents.

use tantivy::schema::Value;
use tantivy::TantivyDocument;

use catalog_types::{Document, StoredFields, ID_FIELD};

use crate::error::IndexError;
use crate::schema::CatalogSchema;

/// Convert a record document to a Tantivy document.
///
/// Every field must be declared in the schema with the same kind.
pub fn to_tantivy_doc(schema: &CatalogSchema, doc: &Document) -> Result<TantivyDocument, IndexError> {
    let mut tantivy_doc = TantivyDocument::default();
    tantivy_doc.add_text(schema.id, doc.id());

    for field in doc.fields() {
        let handle = schema
            .fields()
            .iter()
            .find(|(spec, _)| *spec == field.spec)
            .map(|(_, handle)| *handle)
            .ok_or_else(|| {
                IndexError::SchemaMismatch(format!(
                    "document {} has undeclared field {} ({:?})",
                    doc.id(),
                    field.spec.name,
                    field.spec.kind
                ))
            })?;
        tantivy_doc.add_text(handle, &field.value);
    }

    Ok(tantivy_doc)
}

/// Extract the stored values of a retrieved Tantivy document.
pub fn stored_fields(schema: &CatalogSchema, doc: &TantivyDocument) -> StoredFields {
    let mut stored = StoredFields::new();

    if let Some(id) = doc.get_first(schema.id).and_then(|v| v.as_str()) {
        stored.insert(ID_FIELD, id);
    }

    for (spec, field) in schema.fields() {
        if let Some(value) = doc.get_first(*field).and_then(|v| v.as_str()) {
            stored.insert(spec.name, value);
        }
    }

    stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_types::FieldSpec;

    const SPECS: &[FieldSpec] = &[FieldSpec::text("title"), FieldSpec::stored("year")];

    fn sample_doc() -> Document {
        Document::new("anidb-23")
            .unwrap()
            .text("title", "Cowboy Bebop")
            .stored("year", "1998")
    }

    #[test]
    fn test_to_tantivy_doc() {
        let schema = CatalogSchema::build(SPECS);
        let doc = to_tantivy_doc(&schema, &sample_doc()).unwrap();

        let id = doc.get_first(schema.id).unwrap();
        assert_eq!(id.as_str(), Some("anidb-23"));

        let title = doc.get_first(schema.field("title").unwrap()).unwrap();
        assert_eq!(title.as_str(), Some("Cowboy Bebop"));
    }

    #[test]
    fn test_undeclared_field_rejected() {
        let schema = CatalogSchema::build(SPECS);
        let doc = sample_doc().text("synonyms", "Bebop");
        assert!(matches!(
            to_tantivy_doc(&schema, &doc),
            Err(IndexError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let schema = CatalogSchema::build(SPECS);
        let doc = Document::new("x").unwrap().stored("title", "Stored title");
        assert!(to_tantivy_doc(&schema, &doc).is_err());
    }

    #[test]
    fn test_stored_fields_round_trip() {
        let schema = CatalogSchema::build(SPECS);
        let doc = sample_doc();
        let tantivy_doc = to_tantivy_doc(&schema, &doc).unwrap();
        assert_eq!(stored_fields(&schema, &tantivy_doc), doc.to_stored_fields());
    }
}
