//! Mount source interface shared by every backend.

use std::collections::BTreeMap;

use crate::index::FileInfoIndex;
use crate::model::{FileInfo, Row};
use crate::stencil::SeekableRead;

/// Sentinel `buffering` value meaning "let the backend pick its own
/// default block size", mirroring Python's `io.open(..., buffering=-1)`.
pub const DEFAULT_BUFFERING: i64 = -1;

/// Sealed so `ArMountSource` and `HtmlMountSource` are the only
/// implementors; external crates extend this module, not the trait.
mod sealed {
    pub trait Sealed {}
}

/// Read-only hierarchical namespace over a container file.
pub trait MountSource: sealed::Sealed {
    /// Always `true` — every backend in this crate is read-only.
    fn is_immutable(&self) -> bool {
        true
    }

    fn lookup(&self, path: &str) -> Option<FileInfo>;

    fn list(&self, path: &str) -> Option<BTreeMap<String, FileInfo>>;

    /// Number of stored versions at `path`, 0 if the path does not exist.
    fn versions(&self, path: &str) -> usize;

    /// Open the contents of `file_info`. Fails if `file_info` refers to a
    /// symlink or otherwise does not carry a backing byte range.
    ///
    /// `buffering` follows the same convention as Python's `io.open`:
    /// `0` opens unbuffered, a positive value is the exact block size to
    /// buffer in, and [`DEFAULT_BUFFERING`] (`-1`) lets the backend choose.
    fn open(
        &self,
        file_info: &FileInfo,
        buffering: i64,
    ) -> Result<Box<dyn SeekableRead>, crate::error::MountError>;

    /// Release the backing stream. Idempotent; readers already handed out
    /// by `open` fail their next read instead of operating on a stale
    /// stream. The mount source itself remains valid for `lookup`/`list`/
    /// `versions`, which only consult the in-memory index.
    fn close(&self) -> Result<(), crate::error::MountError>;
}

/// Shared state every index-backed mount source holds by field.
#[derive(Debug, Default)]
pub struct IndexedCore {
    pub index: FileInfoIndex,
}

impl IndexedCore {
    pub fn lookup(&self, path: &str) -> Option<FileInfo> {
        self.index.lookup(path)
    }

    pub fn list(&self, path: &str) -> Option<BTreeMap<String, FileInfo>> {
        self.index.list(path)
    }

    pub fn versions(&self, path: &str) -> usize {
        self.index.versions(path)
    }
}

/// Build a frozen [`FileInfoIndex`] from a backend's row scan in one
/// step, mirroring the teacher's build-then-freeze two-phase
/// construction (`SixCyWriter::finalize` / index-writer patterns).
pub fn finalize_index<F>(scan: F) -> FileInfoIndex
where
    F: FnOnce() -> Vec<Row>,
{
    let mut index = FileInfoIndex::new();
    index.set_rows(scan());
    index
}

impl<R> sealed::Sealed for crate::ar::ArMountSource<R> {}
impl<R> sealed::Sealed for crate::html::HtmlMountSource<R> {}
