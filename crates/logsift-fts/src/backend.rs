//! Log store trait and factory.
//!
//! This module defines the `LogStore` trait that every record store must
//! satisfy, plus the request type shared by all of them.
//!
//! # Backends
//!
//! - `TantivyLogStore`: embedded full-text index (requires `fts-tantivy` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use logsift_fts::{SearchConfig, SearchParams, create_log_store};
//!
//! let config = SearchConfig::default();
//! let store = create_log_store(&config).await?;
//!
//! let params = SearchParams {
//!     query: "http:500 service:'billing api' timeout".to_string(),
//!     limit: Some(50),
//!     ..Default::default()
//! };
//!
//! let page = store.search(params).await?;
//! println!("{} of {} matches", page.found_items.len(), page.max_items_number);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logsift_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::document::LogRecord;
use crate::types::{QueryMode, SearchConfig, SearchResults, SortOrder};

/// Timestamp field every store sorts on.
pub const SORT_FIELD: &str = "time_utc";

/// Result ordering for record searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSort {
    /// Most recent records first.
    #[default]
    NewestFirst,
    /// Oldest records first.
    OldestFirst,
    /// Best matches first.
    Relevance,
}

impl LogSort {
    /// Engine-level ordering for this sort.
    pub fn to_sort_order(self) -> SortOrder {
        match self {
            LogSort::NewestFirst => SortOrder::Descending(SORT_FIELD.to_string()),
            LogSort::OldestFirst => SortOrder::Ascending(SORT_FIELD.to_string()),
            LogSort::Relevance => SortOrder::Relevance,
        }
    }
}

/// Parameters for a record search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Search-box text: keywords (`http:`, `ip:`, `url:`, `service:`) plus free text.
    #[serde(default)]
    pub query: String,

    /// Keep records whose level is any of these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<String>,

    /// Keep records whose logger name contains this dotted name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,

    /// Keep records from this server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Keep records at or after this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,

    /// Keep records strictly before this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,

    /// Result ordering.
    #[serde(default)]
    pub sort: LogSort,

    /// Page size; the store default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Number of ranked hits to skip.
    #[serde(default)]
    pub offset: usize,

    /// Free-text combination override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_mode: Option<QueryMode>,
}

impl SearchParams {
    /// Search for `query` with every other parameter defaulted.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Abstract record store.
///
/// Every mutation is visible to searches issued after it returns.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Store a record, assigning an id when it has none. Returns the id.
    ///
    /// Always appends: a record already stored under the same id is kept
    /// alongside the new one. Use [`LogStore::replace_record`] when the id
    /// may already exist.
    async fn add_record(&self, record: LogRecord) -> Result<String>;

    /// Atomically replace the record stored under `id`.
    ///
    /// Stores `record` under `id` even when nothing was stored there yet.
    async fn replace_record(&self, id: &str, record: LogRecord) -> Result<()>;

    /// Remove the record stored under `id`, if any.
    async fn delete_record(&self, id: &str) -> Result<()>;

    /// Remove every record older than `cutoff`.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<()>;

    /// Execute a search.
    async fn search(&self, params: SearchParams) -> Result<SearchResults<LogRecord>>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64>;

    /// Get the store name for diagnostics.
    fn name(&self) -> &str;

    /// Check if the store is ready to handle requests.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Create the log store named by `config.backend`.
///
/// # Errors
///
/// Returns a configuration error for unknown backends, or the store's own
/// error if it cannot be opened.
pub async fn create_log_store(config: &SearchConfig) -> Result<Box<dyn LogStore>> {
    match config.backend.as_str() {
        #[cfg(feature = "fts-tantivy")]
        "tantivy" => {
            let store = crate::tantivy_search::TantivyLogStore::new(config)?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "fts-tantivy"))]
        "tantivy" => Err(Error::config(
            "the tantivy log store requires the fts-tantivy feature",
        )),
        other => Err(Error::config(format!("Unknown log store backend: {other}"))),
    }
}

// ============================================================================
// Tests
// ============================================================================
