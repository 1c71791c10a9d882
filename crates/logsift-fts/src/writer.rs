//! Serialized, scoped access to the index writer.
//!
//! Exactly one [`WriterSession`] exists at a time. [`WriterSlot::with_writer`]
//! waits for the slot, opens a Tantivy `IndexWriter`, runs the caller's
//! mutation, commits, closes the writer and only then notifies the
//! [`SnapshotGuard`]. Every exit path drops the writer, which releases the
//! directory lock and discards anything staged but not committed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logsift_fts::writer::{Criterion, WriterSlot};
//!
//! let slot = WriterSlot::new(index.clone(), 50_000_000, Duration::from_secs(30));
//! slot.with_writer(guard.clone(), "replace", move |session| {
//!     session.delete(Criterion::from(id_term))?;
//!     session.add(new_doc)
//! })
//! .await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use logsift_core::{Error, Result};
use tantivy::query::Query;
use tantivy::{Index, IndexWriter, TantivyDocument, Term};
use tokio::sync::Mutex;

use crate::snapshot::SnapshotGuard;

/// Smallest writer memory budget Tantivy accepts for one indexing thread.
pub const MIN_WRITER_HEAP_SIZE: usize = 15_000_000;

/// Which documents a delete applies to.
#[derive(Debug)]
pub enum Criterion {
    /// Documents containing this exact term.
    Term(Term),
    /// Documents matching this query.
    Query(Box<dyn Query>),
}

impl Clone for Criterion {
    fn clone(&self) -> Self {
        match self {
            Criterion::Term(term) => Criterion::Term(term.clone()),
            Criterion::Query(query) => Criterion::Query(query.box_clone()),
        }
    }
}

impl From<Term> for Criterion {
    fn from(term: Term) -> Self {
        Criterion::Term(term)
    }
}

impl From<Box<dyn Query>> for Criterion {
    fn from(query: Box<dyn Query>) -> Self {
        Criterion::Query(query)
    }
}

/// The open writer during one mutation.
pub struct WriterSession {
    writer: IndexWriter,
    staged: usize,
}

impl WriterSession {
    /// Stage a document for addition.
    pub fn add(&mut self, doc: TantivyDocument) -> Result<()> {
        self.writer
            .add_document(doc)
            .map_err(|e| Error::operation(format!("Failed to add document: {e}")))?;
        self.staged += 1;
        Ok(())
    }

    /// Stage a delete of every document matching `criterion`.
    ///
    /// Only documents added before this call are affected, so a document
    /// added later in the same session survives even if it matches.
    pub fn delete(&mut self, criterion: impl Into<Criterion>) -> Result<()> {
        match criterion.into() {
            Criterion::Term(term) => {
                self.writer.delete_term(term);
            }
            Criterion::Query(query) => {
                self.writer
                    .delete_query(query)
                    .map_err(|e| Error::operation(format!("Failed to delete documents: {e}")))?;
            }
        }
        self.staged += 1;
        Ok(())
    }

    /// Stage removal of every document in the index.
    pub fn delete_all(&mut self) -> Result<()> {
        self.writer
            .delete_all_documents()
            .map_err(|e| Error::operation(format!("Failed to clear index: {e}")))?;
        self.staged += 1;
        Ok(())
    }

    /// Number of operations staged so far.
    pub fn staged(&self) -> usize {
        self.staged
    }

    fn commit(&mut self) -> Result<()> {
        self.writer
            .commit()
            .map_err(|e| Error::operation(format!("Failed to commit index: {e}")))?;
        Ok(())
    }

    fn close(self) {
        if let Err(e) = self.writer.wait_merging_threads() {
            log::warn!("Index merge did not finish cleanly: {e}");
        }
    }
}

impl std::fmt::Debug for WriterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSession")
            .field("staged", &self.staged)
            .finish()
    }
}

/// The single writer slot of an index.
pub struct WriterSlot {
    index: Index,
    slot: Arc<Mutex<()>>,
    heap_size: usize,
    timeout: Duration,
}

impl WriterSlot {
    /// Create the slot for `index`.
    ///
    /// `timeout` bounds both the wait for the slot and the mutation itself.
    pub fn new(index: Index, heap_size: usize, timeout: Duration) -> Self {
        Self {
            index,
            slot: Arc::new(Mutex::new(())),
            heap_size: heap_size.max(MIN_WRITER_HEAP_SIZE),
            timeout,
        }
    }

    /// Run one mutation in an exclusive writer session.
    ///
    /// On success the session is committed, the writer is released and
    /// `guard` is asked to reopen. When `f` or the commit fails, nothing is
    /// committed, the writer is released and the guard is left alone.
    ///
    /// A timed-out caller gets [`Error::Timeout`]. The session still owns the
    /// slot until its blocking work ends, and skips the commit if it has not
    /// started yet.
    pub async fn with_writer<T, F>(
        &self,
        guard: Arc<SnapshotGuard>,
        operation: &'static str,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut WriterSession) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = tokio::time::timeout(self.timeout, Arc::clone(&self.slot).lock_owned())
            .await
            .map_err(|_| Error::timeout(format!("{operation}: waiting for the writer"), self.timeout))?;

        let index = self.index.clone();
        let heap_size = self.heap_size;
        let timeout = self.timeout;
        let abandoned = Arc::new(AtomicBool::new(false));
        let abandoned_by_caller = Arc::clone(&abandoned);

        let task = tokio::task::spawn_blocking(move || {
            let outcome = run_session(&index, heap_size, f, || {
                abandoned.load(Ordering::Acquire)
            });
            drop(permit);

            let value = match outcome {
                Ok(value) => value,
                Err(SessionError::Abandoned) => {
                    return Err(Error::timeout(operation, timeout));
                }
                Err(SessionError::Failed(e)) => return Err(e),
            };

            if let Err(e) = guard.reopen() {
                log::warn!("{operation} committed but the snapshot could not be reopened: {e}");
                guard.mark_stale();
            }
            Ok(value)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(Error::operation(format!(
                "{operation} writer task failed: {join_error}"
            ))),
            Err(_) => {
                abandoned_by_caller.store(true, Ordering::Release);
                Err(Error::timeout(operation, self.timeout))
            }
        }
    }
}

impl std::fmt::Debug for WriterSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSlot")
            .field("heap_size", &self.heap_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

enum SessionError {
    Abandoned,
    Failed(Error),
}

impl From<Error> for SessionError {
    fn from(e: Error) -> Self {
        SessionError::Failed(e)
    }
}

fn run_session<T, F, A>(
    index: &Index,
    heap_size: usize,
    f: F,
    abandoned: A,
) -> std::result::Result<T, SessionError>
where
    F: FnOnce(&mut WriterSession) -> Result<T>,
    A: Fn() -> bool,
{
    let writer: IndexWriter = index
        .writer_with_num_threads(1, heap_size)
        .map_err(|e| Error::operation(format!("Failed to open index writer: {e}")))?;
    let mut session = WriterSession { writer, staged: 0 };

    let value = f(&mut session)?;

    if abandoned() {
        log::warn!(
            "Dropping {} staged operation(s): caller gave up waiting",
            session.staged()
        );
        return Err(SessionError::Abandoned);
    }

    session.commit()?;
    session.close();
    Ok(value)
}

// ============================================================================
// Tests
// ============================================================================
