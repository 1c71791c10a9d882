//! Tantivy log store implementation.
//!
//! Provides `TantivyLogStore`, the embedded full-text record store.
//! This module is only available with the `fts-tantivy` feature.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logsift_core::{Error, Result};
use tantivy::query::{Query, RangeQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, Term};

use crate::backend::{LogStore, SearchParams};
use crate::document::LogRecord;
use crate::engine::SearchEngine;
use crate::keywords::ParsedQuery;
use crate::query::QueryBuilder;
use crate::schema::{LogSchema, TIME_FIELD};
use crate::types::{SearchConfig, SearchResults};

/// Tantivy-based log store.
///
/// Search-box text goes through the keyword parser, then the query
/// builder; results come back as decoded [`LogRecord`]s.
pub struct TantivyLogStore {
    engine: SearchEngine,
    schema: LogSchema,
    builder: QueryBuilder,
    default_limit: usize,
    max_limit: usize,
}

impl TantivyLogStore {
    /// Create a store from configuration.
    ///
    /// Opens (or creates) the index at `config.index_path`, or keeps it in
    /// memory when no path is configured.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        match config.resolved_index_path()? {
            Some(path) => Self::open(&path, config),
            None => Self::in_memory(config),
        }
    }

    /// Open (or create) the index at `index_path`.
    pub fn open(index_path: &Path, config: &SearchConfig) -> Result<Self> {
        let schema = LogSchema::build();
        let engine = SearchEngine::open(index_path, &schema, config)?;
        Ok(Self::with_engine(engine, schema, config))
    }

    /// Create a store over a fresh in-memory index.
    pub fn in_memory(config: &SearchConfig) -> Result<Self> {
        let schema = LogSchema::build();
        let engine = SearchEngine::in_memory(&schema, config)?;
        Ok(Self::with_engine(engine, schema, config))
    }

    /// Create a store over an already opened index built from
    /// [`LogSchema::build`].
    pub fn from_index(index: Index, config: &SearchConfig) -> Result<Self> {
        let schema = LogSchema::build();
        let engine = SearchEngine::from_index(index, &schema, config)?;
        Ok(Self::with_engine(engine, schema, config))
    }

    fn with_engine(engine: SearchEngine, schema: LogSchema, config: &SearchConfig) -> Self {
        let builder = QueryBuilder::new(schema.clone(), engine.index().clone(), config.query_mode);
        Self {
            engine,
            schema,
            builder,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    /// Check if an index exists at the given path.
    pub fn index_exists(index_path: &Path) -> bool {
        SearchEngine::index_exists(index_path)
    }

    /// Underlying search engine.
    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Log schema of the index.
    pub fn schema(&self) -> &LogSchema {
        &self.schema
    }

    /// Look up one record by id.
    pub async fn get_record(&self, id: &str) -> Result<Option<LogRecord>> {
        let query = Box::new(TermQuery::new(self.id_term(id), IndexRecordOption::Basic));
        let docs = self.engine.search_top(query, 1).await?;
        docs.first()
            .map(|doc| self.schema.from_document(doc))
            .transpose()
    }

    /// Store several records in one commit. Returns their ids in order.
    pub async fn add_records(&self, records: Vec<LogRecord>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(records.len());
        let mut docs = Vec::with_capacity(records.len());
        for mut record in records {
            ids.push(record.ensure_id().to_string());
            docs.push(self.schema.to_document(&record)?);
        }

        self.engine
            .with_writer("add records", move |session| {
                for doc in docs {
                    session.add(doc)?;
                }
                Ok(())
            })
            .await?;
        Ok(ids)
    }

    /// Page size for a request: the default when absent, capped at the maximum.
    fn page_size(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.default_limit).min(self.max_limit)
    }

    fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.schema.id, id)
    }
}

#[async_trait]
impl LogStore for TantivyLogStore {
    async fn add_record(&self, mut record: LogRecord) -> Result<String> {
        let id = record.ensure_id().to_string();
        let doc = self.schema.to_document(&record)?;
        self.engine.save(doc).await?;
        Ok(id)
    }

    async fn replace_record(&self, id: &str, mut record: LogRecord) -> Result<()> {
        if id.is_empty() {
            return Err(Error::invalid_argument("id", "must not be empty"));
        }
        record.id = id.to_string();
        let doc = self.schema.to_document(&record)?;
        self.engine.replace(self.id_term(id), doc).await
    }

    async fn delete_record(&self, id: &str) -> Result<()> {
        self.engine.delete(self.id_term(id)).await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<()> {
        let older: Box<dyn Query> = Box::new(RangeQuery::new_i64_bounds(
            TIME_FIELD.to_string(),
            std::ops::Bound::Unbounded,
            std::ops::Bound::Excluded(cutoff.timestamp_millis()),
        ));
        self.engine.delete(older).await
    }

    async fn search(&self, params: SearchParams) -> Result<SearchResults<LogRecord>> {
        let parsed = ParsedQuery::parse(&params.query);
        let query = self.builder.build(&parsed, &params)?;

        let page = self
            .engine
            .search(
                query,
                params.sort.to_sort_order(),
                self.page_size(params.limit),
                params.offset,
            )
            .await?;

        page.try_map(|doc| self.schema.from_document(&doc))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.engine.num_docs())
    }

    fn name(&self) -> &str {
        "tantivy"
    }

    fn is_ready(&self) -> bool {
        !self.engine.is_stale()
    }
}

impl std::fmt::Debug for TantivyLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyLogStore")
            .field("engine", &self.engine)
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LogSort;
    use crate::test_support::FlakyDirectory;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn record(message: &str, hour: u32) -> LogRecord {
        LogRecord::builder()
            .logger_name("Shop.Web")
            .log_level("Info")
            .time_utc(at(hour))
            .message(message)
            .build()
    }

    fn store() -> TantivyLogStore {
        TantivyLogStore::in_memory(&SearchConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_add_and_get_record() {
        let store = store();
        let id = store.add_record(record("hello world", 1)).await.unwrap();
        assert!(!id.is_empty());

        let found = store.get_record(&id).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.message.as_deref(), Some("hello world"));
        assert!(store.get_record("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_record_keeps_given_id() {
        let store = store();
        let mut given = record("explicit", 1);
        given.id = "fixed-id".to_string();
        assert_eq!(store.add_record(given).await.unwrap(), "fixed-id");
    }

    #[tokio::test]
    async fn test_replace_record() {
        let store = store();
        let id = store.add_record(record("first version", 1)).await.unwrap();

        store
            .replace_record(&id, record("second version", 2))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let found = store.get_record(&id).await.unwrap().unwrap();
        assert_eq!(found.message.as_deref(), Some("second version"));
    }

    #[tokio::test]
    async fn test_replace_record_requires_id() {
        let store = store();
        let err = store.replace_record("", record("x", 1)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_delete_record() {
        let store = store();
        let keep = store.add_record(record("keep", 1)).await.unwrap();
        let drop = store.add_record(record("drop", 2)).await.unwrap();

        store.delete_record(&drop).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get_record(&keep).await.unwrap().is_some());

        // Deleting an unknown id is not an error.
        store.delete_record("unknown").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let store = store();
        store
            .add_records(vec![record("a", 1), record("b", 2), record("c", 3)])
            .await
            .unwrap();

        store.delete_older_than(at(2)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        store
            .delete_older_than(at(3) + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_newest_first_by_default() {
        let store = store();
        store
            .add_records(vec![record("a", 1), record("b", 3), record("c", 2)])
            .await
            .unwrap();

        let page = store.search(SearchParams::default()).await.unwrap();
        let messages: Vec<_> = page
            .found_items
            .iter()
            .filter_map(|r| r.message.as_deref())
            .collect();
        assert_eq!(messages, vec!["b", "c", "a"]);
        assert_eq!(page.max_items_number, 3);

        let oldest = store
            .search(SearchParams {
                sort: LogSort::OldestFirst,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(oldest.found_items[0].message.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_search_with_keywords() {
        let store = store();
        store
            .add_records(vec![
                LogRecord::builder()
                    .time_utc(at(1))
                    .message("upstream timeout")
                    .http_status(504)
                    .service("billing api")
                    .build(),
                LogRecord::builder()
                    .time_utc(at(2))
                    .message("upstream timeout")
                    .http_status(504)
                    .service("catalog api")
                    .build(),
            ])
            .await
            .unwrap();

        let page = store
            .search(SearchParams::new("http:504 service:'billing api' timeout"))
            .await
            .unwrap();
        assert_eq!(page.max_items_number, 1);
        assert_eq!(page.found_items[0].service(), Some("billing api"));
    }

    #[tokio::test]
    async fn test_page_size_defaults_and_clamps() {
        let config = SearchConfig {
            default_limit: 2,
            max_limit: 3,
            ..Default::default()
        };
        let store = TantivyLogStore::in_memory(&config).unwrap();
        store
            .add_records((0..5).map(|h| record("x", h)).collect())
            .await
            .unwrap();

        let default_page = store.search(SearchParams::default()).await.unwrap();
        assert_eq!(default_page.found_items.len(), 2);
        assert_eq!(default_page.items_to_return, 2);

        let clamped = store
            .search(SearchParams {
                limit: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(clamped.found_items.len(), 3);
        assert_eq!(clamped.max_items_number, 5);
    }

    #[tokio::test]
    async fn test_zero_limit_is_invalid() {
        let store = store();
        let err = store
            .search(SearchParams {
                limit: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_new_uses_configured_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("logs");
        let config = SearchConfig {
            index_path: Some(path.to_string_lossy().to_string()),
            ..Default::default()
        };

        let store = TantivyLogStore::new(&config).unwrap();
        store.add_record(record("on disk", 1)).await.unwrap();
        assert!(TantivyLogStore::index_exists(&path));
        assert!(store.is_ready());
    }

    #[tokio::test]
    async fn test_add_record_with_existing_id_keeps_both_copies() {
        let store = store();
        let mut first = record("first", 1);
        first.id = "dup".to_string();
        let mut second = record("second", 2);
        second.id = "dup".to_string();

        store.add_record(first).await.unwrap();
        store.add_record(second).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        store.replace_record("dup", record("only", 3)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_not_ready_after_failed_reopen_until_next_write() {
        let dir = FlakyDirectory::default();
        let index = dir.create_index(LogSchema::build().schema().clone());
        let store = TantivyLogStore::from_index(index, &SearchConfig::default()).unwrap();
        assert!(store.is_ready());

        let doc = store.schema().to_document(&record("committed", 1)).unwrap();
        let failing = dir.clone();
        store
            .engine()
            .with_writer("save", move |session| {
                failing.fail_meta_reads(true);
                session.add(doc)
            })
            .await
            .unwrap();

        assert!(!store.is_ready());
        assert_eq!(store.count().await.unwrap(), 0);

        dir.fail_meta_reads(false);
        store.add_record(record("next", 2)).await.unwrap();
        assert!(store.is_ready());
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
