//! Search engine over one Tantivy index.
//!
//! `SearchEngine` composes the [`SnapshotGuard`] (reads) and the
//! [`WriterSlot`] (mutations). It knows nothing about log records: callers
//! hand it backend queries and documents built for whatever
//! [`IndexLayout`] the index was opened with.
//!
//! Every read captures exactly one snapshot before doing any work and uses
//! only that snapshot until it returns. Every mutation goes through one
//! writer session and ends with a reopen of the guard.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use logsift_core::{Error, Result};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::Query;
use tantivy::{DocAddress, Index, Order, Searcher, TantivyDocument};

use crate::schema::IndexLayout;
use crate::snapshot::{IndexSnapshot, SnapshotGuard};
use crate::types::{SearchConfig, SearchResults, SortOrder};
use crate::writer::{Criterion, WriterSession, WriterSlot};

/// Reads and writes one index.
pub struct SearchEngine {
    index: Index,
    guard: Arc<SnapshotGuard>,
    writer: WriterSlot,
    query_timeout: Duration,
}

impl SearchEngine {
    /// Open the index stored at `index_path`, creating an empty one when
    /// the directory or its metadata does not exist yet.
    pub fn open<L: IndexLayout>(
        index_path: &Path,
        layout: &L,
        config: &SearchConfig,
    ) -> Result<Self> {
        if !index_path.exists() {
            std::fs::create_dir_all(index_path).map_err(|e| Error::io_with_path(e, index_path))?;
        }

        let index = if Self::index_exists(index_path) {
            Index::open_in_dir(index_path)
                .map_err(|e| Error::operation(format!("Failed to open index: {e}")))?
        } else {
            log::info!(
                "No index found at {}, creating an empty one",
                index_path.display()
            );
            Index::create_in_dir(index_path, layout.schema())
                .map_err(|e| Error::operation(format!("Failed to create index: {e}")))?
        };

        Self::from_index(index, layout, config)
    }

    /// Create an engine over a fresh in-memory index.
    pub fn in_memory<L: IndexLayout>(layout: &L, config: &SearchConfig) -> Result<Self> {
        Self::from_index(Index::create_in_ram(layout.schema()), layout, config)
    }

    /// Check if an index exists at the given path.
    pub fn index_exists(index_path: &Path) -> bool {
        index_path.join("meta.json").exists()
    }

    /// Create an engine over an index the caller already opened, for
    /// example one backed by a custom `Directory`.
    ///
    /// The index schema must be `layout.schema()`.
    pub fn from_index<L: IndexLayout>(
        index: Index,
        layout: &L,
        config: &SearchConfig,
    ) -> Result<Self> {
        layout.register_tokenizers(&index);

        let guard = Arc::new(SnapshotGuard::open(&index)?);
        let writer = WriterSlot::new(
            index.clone(),
            config.writer_heap_size,
            config.writer_timeout(),
        );

        Ok(Self {
            index,
            guard,
            writer,
            query_timeout: config.query_timeout(),
        })
    }

    /// Underlying index, for building terms and query parsers.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.guard.get()
    }

    /// True while the last post-commit reopen has not succeeded.
    pub fn is_stale(&self) -> bool {
        self.guard.is_stale()
    }

    /// Number of documents visible to new queries.
    pub fn num_docs(&self) -> u64 {
        self.guard.get().num_docs()
    }

    /// Adopt the latest committed state, if any.
    pub async fn reopen(&self) -> Result<bool> {
        let guard = Arc::clone(&self.guard);
        self.run_blocking("reopen", move || guard.reopen()).await
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Up to `top` highest-scoring documents.
    pub async fn search_top(
        &self,
        query: Box<dyn Query>,
        top: usize,
    ) -> Result<Vec<TantivyDocument>> {
        if top == 0 {
            return Err(Error::invalid_argument("top", "must be positive"));
        }

        let snapshot = self.guard.get();
        self.run_blocking("search", move || {
            let searcher = snapshot.searcher();
            let hits = searcher
                .search(query.as_ref(), &TopDocs::with_limit(fetch_limit(searcher, top)))
                .map_err(|e| Error::operation(format!("Search failed: {e}")))?;
            load_documents(searcher, hits.into_iter().map(|(_, address)| address))
        })
        .await
    }

    /// One page of the ranked hit list.
    ///
    /// Fetches `offset + items_to_return` hits, reports the total number of
    /// matches and returns the `[offset, offset + items_to_return)` window.
    pub async fn search(
        &self,
        query: Box<dyn Query>,
        sort: SortOrder,
        items_to_return: usize,
        offset: usize,
    ) -> Result<SearchResults<TantivyDocument>> {
        if items_to_return == 0 {
            return Err(Error::invalid_argument(
                "items_to_return",
                "must be positive",
            ));
        }
        let wanted = offset.checked_add(items_to_return).ok_or_else(|| {
            Error::invalid_argument("offset", "offset + items_to_return overflows")
        })?;

        let snapshot = self.guard.get();
        self.run_blocking("search", move || {
            let searcher = snapshot.searcher();
            let limit = fetch_limit(searcher, wanted);
            let (addresses, total) = ranked_hits(searcher, query.as_ref(), &sort, limit)?;

            Ok(SearchResults {
                offset,
                items_to_return,
                max_items_number: total,
                found_items: load_documents(
                    searcher,
                    addresses.into_iter().skip(offset).take(items_to_return),
                )?,
            })
        })
        .await
    }

    /// Number of documents matching `query`.
    pub async fn count(&self, query: Box<dyn Query>) -> Result<usize> {
        let snapshot = self.guard.get();
        self.run_blocking("count", move || {
            snapshot
                .searcher()
                .search(query.as_ref(), &Count)
                .map_err(|e| Error::operation(format!("Count failed: {e}")))
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Append one document.
    pub async fn save(&self, doc: TantivyDocument) -> Result<()> {
        self.with_writer("save", move |session| session.add(doc))
            .await
    }

    /// Delete everything matching `criterion` and add `doc`, in one commit.
    pub async fn replace(
        &self,
        criterion: impl Into<Criterion>,
        doc: TantivyDocument,
    ) -> Result<()> {
        let criterion = criterion.into();
        self.with_writer("replace", move |session| {
            session.delete(criterion)?;
            session.add(doc)
        })
        .await
    }

    /// Delete everything matching `criterion`.
    pub async fn delete(&self, criterion: impl Into<Criterion>) -> Result<()> {
        let criterion = criterion.into();
        self.with_writer("delete", move |session| session.delete(criterion))
            .await
    }

    /// Replace the whole index content with `docs`, in one commit.
    ///
    /// Readers keep seeing the previous content until the commit lands.
    /// Returns the number of documents added.
    pub async fn rebuild(&self, docs: Vec<TantivyDocument>) -> Result<usize> {
        self.with_writer("rebuild", move |session| {
            session.delete_all()?;
            let added = docs.len();
            for doc in docs {
                session.add(doc)?;
            }
            Ok(added)
        })
        .await
    }

    /// Run a custom mutation in an exclusive writer session.
    pub async fn with_writer<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriterSession) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.writer
            .with_writer(Arc::clone(&self.guard), operation, f)
            .await
    }

    async fn run_blocking<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(Error::operation(format!(
                "{operation} task failed: {join_error}"
            ))),
            Err(_) => Err(Error::timeout(operation, self.query_timeout)),
        }
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("snapshot", &self.guard.get())
            .field("writer", &self.writer)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

// Hits can never exceed the live documents, so a larger limit only costs memory.
fn fetch_limit(searcher: &Searcher, wanted: usize) -> usize {
    let available = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
    wanted.min(available).max(1)
}

fn ranked_hits(
    searcher: &Searcher,
    query: &dyn Query,
    sort: &SortOrder,
    limit: usize,
) -> Result<(Vec<DocAddress>, usize)> {
    let search_failed = |e: tantivy::TantivyError| Error::operation(format!("Search failed: {e}"));

    match sort {
        SortOrder::Relevance => {
            let (hits, total) = searcher
                .search(query, &(TopDocs::with_limit(limit), Count))
                .map_err(search_failed)?;
            Ok((hits.into_iter().map(|(_, address)| address).collect(), total))
        }
        SortOrder::Ascending(field) | SortOrder::Descending(field) => {
            let order = match sort {
                SortOrder::Ascending(_) => Order::Asc,
                _ => Order::Desc,
            };
            let collector =
                TopDocs::with_limit(limit).order_by_fast_field::<i64>(field.as_str(), order);
            let (hits, total) = searcher
                .search(query, &(collector, Count))
                .map_err(search_failed)?;
            Ok((hits.into_iter().map(|(_, address)| address).collect(), total))
        }
    }
}

fn load_documents(
    searcher: &Searcher,
    addresses: impl IntoIterator<Item = DocAddress>,
) -> Result<Vec<TantivyDocument>> {
    addresses
        .into_iter()
        .map(|address| {
            searcher
                .doc::<TantivyDocument>(address)
                .map_err(|e| Error::operation(format!("Failed to load document: {e}")))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
