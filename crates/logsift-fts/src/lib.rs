//! Log search for logsift.
//!
//! This crate turns search-box text into structured queries and runs them
//! against an embedded Tantivy index (feature-gated) that accepts writes
//! while readers keep querying a consistent snapshot.
//!
//! # Features
//!
//! - `fts-tantivy`: Enable the Tantivy-backed log store (default)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      logsift-fts                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ParsedQuery (search-box keywords + free text)              │
//! │  LogRecord, SearchParams, SearchConfig                      │
//! │  LogStore trait                                             │
//! │  └── TantivyLogStore                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LogSchema (fields, dotted analyzer)                        │
//! │  QueryBuilder (ParsedQuery + filters → Tantivy query)       │
//! │  RecordSource / rebuild                                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SearchEngine                                               │
//! │  ├── SnapshotGuard (lock-free current snapshot)             │
//! │  └── WriterSlot (one serialized writer session)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Search-box keywords
//!
//! | Keyword | Filters on |
//! |---------|------------|
//! | `http:` | HTTP status (exact) |
//! | `ip:` | client IP (exact) |
//! | `url:` | request URL (phrase) |
//! | `service:` | service name (phrase) |
//!
//! Values containing spaces are quoted: `service:'billing api'`. Everything
//! that is not a well-formed keyword stays in the free text.
//!
//! # Example
//!
//! ```rust,ignore
//! use logsift_fts::{LogRecord, SearchConfig, SearchParams, create_log_store};
//!
//! let store = create_log_store(&SearchConfig::default()).await?;
//!
//! store
//!     .add_record(LogRecord::builder().message("payment timeout").http_status(504).build())
//!     .await?;
//!
//! let page = store.search(SearchParams::new("http:504 timeout")).await?;
//! for record in page.found_items {
//!     println!("{}: {:?}", record.id, record.message);
//! }
//! ```

// Core modules (always available)
pub mod backend;
pub mod document;
pub mod keywords;
pub mod types;

// Feature-gated Tantivy modules
#[cfg(feature = "fts-tantivy")]
pub mod engine;

#[cfg(feature = "fts-tantivy")]
pub mod query;

#[cfg(feature = "fts-tantivy")]
pub mod rebuild;

#[cfg(feature = "fts-tantivy")]
pub mod schema;

#[cfg(feature = "fts-tantivy")]
pub mod snapshot;

#[cfg(feature = "fts-tantivy")]
pub mod tantivy_search;

#[cfg(feature = "fts-tantivy")]
pub mod writer;

#[cfg(all(test, feature = "fts-tantivy"))]
mod test_support;

// Re-exports
pub use backend::{LogSort, LogStore, SearchParams};
pub use document::{LogRecord, LogRecordBuilder};
pub use keywords::{Keyword, ParsedQuery};
pub use types::{QueryMode, SearchConfig, SearchResults, SortOrder};

#[cfg(feature = "fts-tantivy")]
pub use engine::SearchEngine;

#[cfg(feature = "fts-tantivy")]
pub use query::QueryBuilder;

#[cfg(feature = "fts-tantivy")]
pub use rebuild::{InMemorySource, JsonLinesSource, RebuildStats, RecordSource};

#[cfg(feature = "fts-tantivy")]
pub use schema::{IndexLayout, LogSchema};

#[cfg(feature = "fts-tantivy")]
pub use snapshot::{IndexSnapshot, SnapshotGuard};

#[cfg(feature = "fts-tantivy")]
pub use tantivy_search::TantivyLogStore;

#[cfg(feature = "fts-tantivy")]
pub use writer::{Criterion, WriterSession, WriterSlot};

/// Create the log store selected by `config.backend`.
pub async fn create_log_store(config: &SearchConfig) -> logsift_core::Result<Box<dyn LogStore>> {
    backend::create_log_store(config).await
}
