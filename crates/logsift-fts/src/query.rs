//! Query building utilities.
//!
//! `QueryBuilder` turns a [`ParsedQuery`] and the filters of a
//! [`SearchParams`] into one Tantivy query. Every constraint becomes a
//! `Must` clause; a request without constraints matches every record.
//!
//! | Source | Query |
//! |--------|-------|
//! | `http:` | exact `http_status` term |
//! | `ip:` | exact `client_ip` term |
//! | `url:` / `service:` | phrase over the analyzed field |
//! | free text | lenient query-string parse over the text fields |
//! | `levels` | any of the exact `log_level` terms |
//! | `server` | exact `server` term |
//! | `logger` | phrase over `logger_name` |
//! | `from` / `to` | `time_utc` range `[from, to)` |
//!
//! This module is only available with the `fts-tantivy` feature.

use std::ops::Bound;

use logsift_core::{Error, Result};
use tantivy::query::{
    AllQuery, BooleanQuery, EmptyQuery, Occur, PhraseQuery, Query, QueryParser, RangeQuery,
    TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, Term};

use crate::backend::SearchParams;
use crate::keywords::ParsedQuery;
use crate::schema::{LogSchema, TIME_FIELD};
use crate::types::QueryMode;

/// Builder for record search queries.
#[derive(Clone)]
pub struct QueryBuilder {
    schema: LogSchema,
    index: Index,
    mode: QueryMode,
}

impl QueryBuilder {
    /// Create a builder for `index`, which must use `schema`.
    pub fn new(schema: LogSchema, index: Index, mode: QueryMode) -> Self {
        Self {
            schema,
            index,
            mode,
        }
    }

    /// Default free-text combination.
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Build the backend query for one request.
    pub fn build(&self, parsed: &ParsedQuery, params: &SearchParams) -> Result<Box<dyn Query>> {
        let schema = &self.schema;
        let mut clauses: Vec<Box<dyn Query>> = Vec::new();

        if let Some(status) = parsed.http_status() {
            clauses.push(exact(schema.http_status, status));
        }
        if let Some(ip) = parsed.client_ip() {
            clauses.push(exact(schema.client_ip, ip));
        }
        if let Some(url) = parsed.url() {
            clauses.push(self.phrase(schema.url, url)?);
        }
        if let Some(service) = parsed.service() {
            clauses.push(self.phrase(schema.service, service)?);
        }
        if let Some(text) = self.free_text(parsed.free_text(), params.query_mode)? {
            clauses.push(text);
        }

        if !params.levels.is_empty() {
            let any_level = params
                .levels
                .iter()
                .map(|level| (Occur::Should, exact(schema.log_level, level)))
                .collect::<Vec<_>>();
            clauses.push(Box::new(BooleanQuery::new(any_level)));
        }
        if let Some(server) = &params.server {
            clauses.push(exact(schema.server, server));
        }
        if let Some(logger) = &params.logger {
            clauses.push(self.phrase(schema.logger_name, logger)?);
        }
        if params.from.is_some() || params.to.is_some() {
            let lower = params
                .from
                .map_or(Bound::Unbounded, |t| Bound::Included(t.timestamp_millis()));
            let upper = params
                .to
                .map_or(Bound::Unbounded, |t| Bound::Excluded(t.timestamp_millis()));
            clauses.push(Box::new(RangeQuery::new_i64_bounds(
                TIME_FIELD.to_string(),
                lower,
                upper,
            )));
        }

        Ok(match clauses.len() {
            0 => Box::new(AllQuery),
            1 => clauses.remove(0),
            _ => Box::new(BooleanQuery::new(
                clauses.into_iter().map(|q| (Occur::Must, q)).collect(),
            )),
        })
    }

    /// Match `value` as a phrase of the field's analyzed tokens.
    fn phrase(&self, field: Field, value: &str) -> Result<Box<dyn Query>> {
        let mut terms = self.tokens(field, value)?;

        Ok(match terms.len() {
            // Nothing searchable in the value: it cannot match any record.
            0 => Box::new(EmptyQuery),
            1 => Box::new(TermQuery::new(
                terms.remove(0),
                IndexRecordOption::WithFreqs,
            )),
            _ => Box::new(PhraseQuery::new(terms)),
        })
    }

    fn free_text(&self, text: &str, mode: Option<QueryMode>) -> Result<Option<Box<dyn Query>>> {
        // Punctuation-only leftovers carry no terms.
        if self.tokens(self.schema.message, text)?.is_empty() {
            return Ok(None);
        }

        let boosted = self.schema.free_text_fields();
        let mut parser = QueryParser::for_index(
            &self.index,
            boosted.iter().map(|(field, _)| *field).collect(),
        );
        for (field, boost) in boosted {
            parser.set_field_boost(field, boost);
        }
        if mode.unwrap_or(self.mode) == QueryMode::And {
            parser.set_conjunction_by_default();
        }

        let (query, errors) = parser.parse_query_lenient(text);
        if !errors.is_empty() {
            log::debug!(
                "Free text {text:?} parsed leniently ({} issue(s))",
                errors.len()
            );
        }
        Ok(Some(query))
    }

    fn tokens(&self, field: Field, value: &str) -> Result<Vec<Term>> {
        let mut analyzer = self
            .index
            .tokenizer_for_field(field)
            .map_err(|e| Error::operation(format!("No tokenizer for field: {e}")))?;

        let mut stream = analyzer.token_stream(value);
        let mut terms = Vec::new();
        while stream.advance() {
            terms.push(Term::from_field_text(field, &stream.token().text));
        }
        Ok(terms)
    }
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("mode", &self.mode)
            .finish()
    }
}

fn exact(field: Field, value: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, value),
        IndexRecordOption::Basic,
    ))
}

// ============================================================================
// Tests
// ============================================================================
