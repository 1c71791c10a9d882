//! Full index rebuild from a source of truth.
//!
//! A rebuild drops every indexed record and re-ingests the set supplied by a
//! [`RecordSource`], in one writer session and one commit. Searches running
//! meanwhile keep answering from the previous snapshot and switch to the
//! rebuilt one as a whole.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logsift_fts::{JsonLinesSource, TantivyLogStore};
//!
//! let source = JsonLinesSource::new("/var/lib/logsift/export.jsonl");
//! let stats = store.rebuild(&source).await?;
//! println!("Re-indexed {} records ({} skipped)", stats.ingested, stats.skipped);
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use logsift_core::{Error, Result};

use crate::document::LogRecord;
use crate::tantivy_search::TantivyLogStore;

/// Statistics about a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Number of records written to the index.
    pub ingested: usize,
    /// Number of source entries that could not be decoded or indexed.
    pub skipped: usize,
}

/// Supplies every record the index should contain.
///
/// The outer error aborts the rebuild before anything is touched; an inner
/// error only skips that entry.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Load all records.
    async fn records(&self) -> Result<Vec<Result<LogRecord>>>;

    /// Source name for logging.
    fn name(&self) -> &str {
        "records"
    }
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<LogRecord>,
}

impl InMemorySource {
    /// Wrap a set of records.
    pub fn new(records: Vec<LogRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn records(&self) -> Result<Vec<Result<LogRecord>>> {
        Ok(self.records.iter().cloned().map(Ok).collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Records exported as JSON lines, one record per line.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    /// Read records from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Export file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for JsonLinesSource {
    async fn records(&self) -> Result<Vec<Result<LogRecord>>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::io_with_path(e, &self.path))?;

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<LogRecord>(line).map_err(Error::from))
            .collect())
    }

    fn name(&self) -> &str {
        "json lines"
    }
}

impl TantivyLogStore {
    /// Replace the whole index content with the records of `source`.
    pub async fn rebuild<S: RecordSource + ?Sized>(&self, source: &S) -> Result<RebuildStats> {
        log::info!("Rebuilding index from {} source", source.name());

        let mut stats = RebuildStats::default();
        let mut docs = Vec::new();

        for (position, entry) in source.records().await?.into_iter().enumerate() {
            let converted = entry.and_then(|mut record| {
                record.ensure_id();
                self.schema().to_document(&record)
            });
            match converted {
                Ok(doc) => docs.push(doc),
                Err(e) => {
                    log::warn!("Skipping source entry {position}: {e}");
                    stats.skipped += 1;
                }
            }
        }

        stats.ingested = self.engine().rebuild(docs).await?;

        log::info!(
            "Rebuilt index with {} records ({} skipped)",
            stats.ingested,
            stats.skipped
        );
        Ok(stats)
    }
}

// ============================================================================
// Tests
// ============================================================================
