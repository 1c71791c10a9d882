//! Common types for the FTS module.
//!
//! These types are used across all search backends and are always available
//! regardless of feature flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use logsift_core::{Result, config};
use serde::{Deserialize, Serialize};

/// How free-text terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// All terms must match.
    #[default]
    And,
    /// Any term can match.
    Or,
}

/// Ordering of a paginated search, understood by the search engine.
///
/// Field-based orders name an i64 fast field of the index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Highest score first.
    #[default]
    Relevance,
    /// Smallest field value first.
    Ascending(String),
    /// Largest field value first.
    Descending(String),
}

/// One page of a ranked hit list.
///
/// `found_items` is the window `[offset, offset + items_to_return)` of the
/// full hit list, clipped to what the index returned. `max_items_number` is
/// the total number of matches, even when the window is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults<T> {
    /// Index of the first hit in this page.
    pub offset: usize,
    /// Requested page size.
    pub items_to_return: usize,
    /// Total number of matching documents.
    pub max_items_number: usize,
    /// Documents in this page, in rank order.
    pub found_items: Vec<T>,
}

impl<T> SearchResults<T> {
    /// Create an empty page.
    pub fn empty(offset: usize, items_to_return: usize) -> Self {
        Self {
            offset,
            items_to_return,
            max_items_number: 0,
            found_items: Vec::new(),
        }
    }

    /// Convert every found item, keeping paging information.
    pub fn try_map<U, E, F>(self, f: F) -> std::result::Result<SearchResults<U>, E>
    where
        F: FnMut(T) -> std::result::Result<U, E>,
    {
        Ok(SearchResults {
            offset: self.offset,
            items_to_return: self.items_to_return,
            max_items_number: self.max_items_number,
            found_items: self
                .found_items
                .into_iter()
                .map(f)
                .collect::<std::result::Result<Vec<_>, E>>()?,
        })
    }

    /// True when more hits exist past this page.
    pub fn has_more(&self) -> bool {
        self.offset + self.found_items.len() < self.max_items_number
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Backend type; only "tantivy" is registered.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Path to the search index directory. `None` keeps the index in memory.
    #[serde(default)]
    pub index_path: Option<String>,

    /// How free-text terms are combined.
    #[serde(default)]
    pub query_mode: QueryMode,

    /// Page size used when a request does not give one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest page size a request may ask for.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Index writer memory budget in bytes.
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Bound on waiting for the writer slot and on one mutation.
    #[serde(default = "default_writer_timeout_ms")]
    pub writer_timeout_ms: u64,

    /// Bound on one search call.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

fn default_backend() -> String {
    "tantivy".to_string()
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    1000
}

fn default_writer_heap_size() -> usize {
    50_000_000
}

fn default_writer_timeout_ms() -> u64 {
    30_000
}

fn default_query_timeout_ms() -> u64 {
    10_000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            index_path: None,
            query_mode: QueryMode::default(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            writer_heap_size: default_writer_heap_size(),
            writer_timeout_ms: default_writer_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl SearchConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml(content: &str) -> Result<Self> {
        config::from_toml_str(content)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        config::from_toml_file(path)
    }

    /// Index directory with `~` and environment variables expanded.
    pub fn resolved_index_path(&self) -> Result<Option<PathBuf>> {
        self.index_path
            .as_deref()
            .map(config::expand_path)
            .transpose()
    }

    /// Writer timeout as a duration.
    pub fn writer_timeout(&self) -> Duration {
        Duration::from_millis(self.writer_timeout_ms)
    }

    /// Query timeout as a duration.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
