//! Test-only index directory with injectable metadata failures.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tantivy::directory::error::{DeleteError, OpenReadError, OpenWriteError};
use tantivy::directory::{
    Directory, FileHandle, FileSlice, RamDirectory, WatchCallback, WatchHandle, WritePtr,
};
use tantivy::schema::Schema;
use tantivy::{Index, IndexSettings};

const META_FILE: &str = "meta.json";

/// In-memory directory whose `meta.json` reads or writes fail on demand.
///
/// Failing writes break `commit`; failing reads break reader reloads while
/// leaving already-open writers untouched.
#[derive(Clone, Debug, Default)]
pub(crate) struct FlakyDirectory {
    inner: RamDirectory,
    fail_meta_writes: Arc<AtomicBool>,
    fail_meta_reads: Arc<AtomicBool>,
}

impl FlakyDirectory {
    pub(crate) fn create_index(&self, schema: Schema) -> Index {
        Index::create(self.clone(), schema, IndexSettings::default()).unwrap()
    }

    pub(crate) fn fail_meta_writes(&self, fail: bool) {
        self.fail_meta_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_meta_reads(&self, fail: bool) {
        self.fail_meta_reads.store(fail, Ordering::SeqCst);
    }

    fn is_meta(path: &Path) -> bool {
        path == Path::new(META_FILE)
    }
}

fn injected(what: &str) -> io::Error {
    io::Error::other(format!("injected {what} failure"))
}

impl Directory for FlakyDirectory {
    fn get_file_handle(&self, path: &Path) -> Result<Arc<dyn FileHandle>, OpenReadError> {
        self.inner.get_file_handle(path)
    }

    fn open_read(&self, path: &Path) -> Result<FileSlice, OpenReadError> {
        self.inner.open_read(path)
    }

    fn delete(&self, path: &Path) -> Result<(), DeleteError> {
        self.inner.delete(path)
    }

    fn exists(&self, path: &Path) -> Result<bool, OpenReadError> {
        self.inner.exists(path)
    }

    fn open_write(&self, path: &Path) -> Result<WritePtr, OpenWriteError> {
        self.inner.open_write(path)
    }

    fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError> {
        if Self::is_meta(path) && self.fail_meta_reads.load(Ordering::SeqCst) {
            return Err(OpenReadError::wrap_io_error(
                injected("read"),
                PathBuf::from(path),
            ));
        }
        self.inner.atomic_read(path)
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if Self::is_meta(path) && self.fail_meta_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        self.inner.atomic_write(path, data)
    }

    fn sync_directory(&self) -> io::Result<()> {
        self.inner.sync_directory()
    }

    fn watch(&self, watch_callback: WatchCallback) -> tantivy::Result<WatchHandle> {
        self.inner.watch(watch_callback)
    }
}
