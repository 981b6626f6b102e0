//! Field-scoped queries using BM25 scoring.

use tantivy::collector::TopDocs;
use tantivy::query::{Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, IndexReader, TantivyDocument, Term};
use tracing::debug;

use catalog_types::ID_FIELD;

use crate::backend::{BackendReader, Hit};
use crate::document::stored_fields;
use crate::error::IndexError;
use crate::schema::CatalogSchema;

/// Point-in-time reader over a Tantivy index.
pub struct TantivyReader {
    reader: IndexReader,
    index: Index,
    schema: CatalogSchema,
}

impl TantivyReader {
    pub fn new(reader: IndexReader, index: Index, schema: CatalogSchema) -> Self {
        Self {
            reader,
            index,
            schema,
        }
    }

    fn field_for_term(&self, name: &str) -> Result<Field, IndexError> {
        if name == ID_FIELD {
            Ok(self.schema.id)
        } else {
            self.schema.text_field(name)
        }
    }

    fn collect(&self, query: &dyn Query, limit: usize) -> Result<Vec<Hit>, IndexError> {
        let searcher = self.reader.searcher();
        // TopDocs allocates for the full limit up front
        let limit = limit.min(searcher.num_docs() as usize).max(1);
        let top_docs = searcher.search(query, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            hits.push(Hit {
                score,
                fields: stored_fields(&self.schema, &doc),
            });
        }
        Ok(hits)
    }
}

impl BackendReader for TantivyReader {
    fn match_query(&self, field: &str, text: &str, limit: usize) -> Result<Vec<Hit>, IndexError> {
        if limit == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let field_handle = self.schema.text_field(field)?;
        let query_parser = QueryParser::for_index(&self.index, vec![field_handle]);

        // User input is free text; syntax errors only drop the offending clause
        let (query, errors) = query_parser.parse_query_lenient(text);
        if !errors.is_empty() {
            debug!(field, errors = errors.len(), "Lenient parse dropped query clauses");
        }

        let hits = self.collect(query.as_ref(), limit)?;
        debug!(field, query = text, results = hits.len(), "Field query complete");
        Ok(hits)
    }

    fn term_query(&self, field: &str, value: &str, limit: usize) -> Result<Vec<Hit>, IndexError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let field_handle = self.field_for_term(field)?;
        let term = Term::from_field_text(field_handle, value);
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        self.collect(&query, limit)
    }

    fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}
