//! Tantivy schema derived from a record kind's field declarations.
//!
//! - `_id`: STRING | STORED, the primary key used for upserts and point lookups
//! - text fields: TEXT | STORED, searchable and returned with hits
//! - stored fields: STORED, returned with hits only

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use catalog_types::{FieldKind, FieldSpec, ID_FIELD};

use crate::error::IndexError;

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct CatalogSchema {
    schema: Schema,
    /// Primary key (STRING | STORED)
    pub id: Field,
    fields: Vec<(FieldSpec, Field)>,
}

impl CatalogSchema {
    /// Build a fresh schema for the given declarations.
    pub fn build(specs: &[FieldSpec]) -> Self {
        let mut schema_builder = Schema::builder();

        let id = schema_builder.add_text_field(ID_FIELD, STRING | STORED);

        let fields = specs
            .iter()
            .map(|spec| {
                let field = match spec.kind {
                    FieldKind::Text => schema_builder.add_text_field(spec.name, TEXT | STORED),
                    FieldKind::Stored => schema_builder.add_text_field(spec.name, STORED),
                };
                (*spec, field)
            })
            .collect();

        Self {
            schema: schema_builder.build(),
            id,
            fields,
        }
    }

    /// Bind declarations to the schema of an existing index.
    pub fn from_schema(schema: Schema, specs: &[FieldSpec]) -> Result<Self, IndexError> {
        let id = schema
            .get_field(ID_FIELD)
            .map_err(|_| IndexError::SchemaMismatch(format!("missing {} field", ID_FIELD)))?;

        let mut fields = Vec::with_capacity(specs.len());
        for spec in specs {
            let field = schema
                .get_field(spec.name)
                .map_err(|_| IndexError::SchemaMismatch(format!("missing {} field", spec.name)))?;
            let indexed = schema.get_field_entry(field).is_indexed();
            if indexed != spec.is_searchable() {
                return Err(IndexError::SchemaMismatch(format!(
                    "field {} has indexed={} on disk, expected {}",
                    spec.name,
                    indexed,
                    spec.is_searchable()
                )));
            }
            fields.push((*spec, field));
        }

        Ok(Self { schema, id, fields })
    }

    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fields(&self) -> &[(FieldSpec, Field)] {
        &self.fields
    }

    /// Handle of a declared field.
    pub fn field(&self, name: &str) -> Result<Field, IndexError> {
        self.fields
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, field)| *field)
            .ok_or_else(|| IndexError::SchemaMismatch(format!("unknown field {}", name)))
    }

    /// Handle of a declared field that can be searched.
    pub fn text_field(&self, name: &str) -> Result<Field, IndexError> {
        self.fields
            .iter()
            .find(|(spec, _)| spec.name == name)
            .ok_or_else(|| IndexError::SchemaMismatch(format!("unknown field {}", name)))
            .and_then(|(spec, field)| {
                if spec.is_searchable() {
                    Ok(*field)
                } else {
                    Err(IndexError::SchemaMismatch(format!(
                        "field {} is stored only",
                        name
                    )))
                }
            })
    }
}
