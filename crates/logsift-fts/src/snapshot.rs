//! Point-in-time read views of the index.
//!
//! [`SnapshotGuard`] owns the snapshot readers currently see. Readers call
//! [`SnapshotGuard::get`], which is a lock-free load of an `Arc`; the writer
//! path calls [`SnapshotGuard::reopen`] after every successful commit.
//!
//! Reopen only publishes a new [`IndexSnapshot`] when the committed index
//! really differs from the current one (different segments or deletes), so
//! no-op commits cost one metadata reload and nothing else.
//!
//! A replaced snapshot is never closed by the guard. Each caller holds its
//! own `Arc<IndexSnapshot>`; the segment readers behind it are released
//! when the last holder drops it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use logsift_core::{Error, Result};
use tantivy::{Index, IndexReader, ReloadPolicy, Searcher};

/// Read-only view of the index at one generation.
pub struct IndexSnapshot {
    searcher: Searcher,
    generation: u64,
}

impl IndexSnapshot {
    fn new(searcher: Searcher, generation: u64) -> Self {
        Self {
            searcher,
            generation,
        }
    }

    /// Searcher bound to this snapshot.
    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    /// Generation number, starting at 1 and increasing by one per adoption.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of live documents visible in this snapshot.
    pub fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }

    /// True when both handles observe the same generation.
    pub fn same_generation(&self, other: &IndexSnapshot) -> bool {
        std::ptr::eq(self, other)
    }

    fn shows_same_index_as(&self, searcher: &Searcher) -> bool {
        self.searcher.generation().segments() == searcher.generation().segments()
    }
}

impl std::fmt::Debug for IndexSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSnapshot")
            .field("generation", &self.generation)
            .field("num_docs", &self.num_docs())
            .finish()
    }
}

/// Owner of the current index snapshot.
pub struct SnapshotGuard {
    reader: IndexReader,
    current: ArcSwap<IndexSnapshot>,
    // Serializes reload + publish so an older searcher never replaces a newer one.
    reopen_lock: Mutex<()>,
    stale: AtomicBool,
}

impl SnapshotGuard {
    /// Open a guard over `index`, starting at its last committed state.
    pub fn open(index: &Index) -> Result<Self> {
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::operation(format!("Failed to open index reader: {e}")))?;

        let initial = IndexSnapshot::new(reader.searcher(), 1);

        Ok(Self {
            reader,
            current: ArcSwap::from_pointee(initial),
            reopen_lock: Mutex::new(()),
            stale: AtomicBool::new(false),
        })
    }

    /// Current snapshot.
    ///
    /// Never blocks on writers. Callers keep the returned `Arc` for the
    /// whole of one query and must not fetch a second one mid-query.
    pub fn get(&self) -> Arc<IndexSnapshot> {
        self.current.load_full()
    }

    /// Adopt the latest committed index state if it differs from the current
    /// snapshot.
    ///
    /// Returns `true` when a new snapshot was published. On error the
    /// current snapshot stays in place and the guard is marked stale.
    pub fn reopen(&self) -> Result<bool> {
        let _serialized = self
            .reopen_lock
            .lock()
            .map_err(|_| Error::operation("snapshot reopen lock poisoned"))?;

        if let Err(e) = self.reader.reload() {
            self.stale.store(true, Ordering::Release);
            return Err(Error::operation(format!("Failed to reload index: {e}")));
        }

        let searcher = self.reader.searcher();
        let current = self.current.load();

        if current.shows_same_index_as(&searcher) {
            log::debug!(
                "Reopen found no new generation (still {})",
                current.generation()
            );
            self.stale.store(false, Ordering::Release);
            return Ok(false);
        }

        let next = Arc::new(IndexSnapshot::new(searcher, current.generation() + 1));
        log::debug!(
            "Adopting index generation {} ({} docs)",
            next.generation(),
            next.num_docs()
        );
        self.current.store(next);
        self.stale.store(false, Ordering::Release);

        Ok(true)
    }

    /// True after a failed reopen, until a later reopen succeeds.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Mark the current snapshot as lagging behind committed data.
    pub(crate) fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for SnapshotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotGuard")
            .field("current", &self.get())
            .field("stale", &self.is_stale())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
