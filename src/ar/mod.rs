//! AR archive mount source.

mod parser;

use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::error::MountError;
use crate::model::{FileInfo, Row, TypeTag, UserData};
use crate::mount::{finalize_index, IndexedCore, MountSource};
use crate::path;
use crate::stencil::{
    close_shared, open_shared, RawStencilReader, SeekableRead, SharedStream, Stencil,
    DEFAULT_BUFFER_SIZE,
};

pub use parser::{parse_ar_archive, RawEntry};

/// Read-only mount source exposing the members of an AR archive (GNU,
/// BSD, thin, or Darwin variant) as a flat, single-level file hierarchy.
/// `.deb` files need no special casing: they are plain GNU-variant AR
/// archives and their `debian-binary`/`control.tar.*`/`data.tar.*`
/// members are exposed exactly like any other member.
pub struct ArMountSource<R> {
    stream: SharedStream<R>,
    core: IndexedCore,
    block_size: usize,
}

impl<R: Read + Seek> ArMountSource<R> {
    pub fn new(stream: R) -> Result<Self, MountError> {
        Self::with_transform(stream, identity_transform)
    }

    /// Build with a path-rewriter applied to every member name before
    /// normalization, mirroring `self.transform(name)` in the reference
    /// `ARMountSource`.
    pub fn with_transform<F>(mut stream: R, transform: F) -> Result<Self, MountError>
    where
        F: Fn(&str) -> String,
    {
        let entries = parser::parse_ar_archive(&mut stream)?;
        let rows: Vec<Row> = entries
            .into_iter()
            .map(|entry| convert_to_row(entry, &transform))
            .collect();
        let core = IndexedCore {
            index: finalize_index(|| rows),
        };
        Ok(Self {
            stream: open_shared(stream),
            core,
            block_size: DEFAULT_BUFFER_SIZE,
        })
    }
}

impl ArMountSource<std::fs::File> {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, MountError> {
        Self::new(std::fs::File::open(path)?)
    }

    pub fn open_path_with_transform<F>(path: impl AsRef<Path>, transform: F) -> Result<Self, MountError>
    where
        F: Fn(&str) -> String,
    {
        Self::with_transform(std::fs::File::open(path)?, transform)
    }
}

fn identity_transform(name: &str) -> String {
    name.to_string()
}

fn convert_to_row<F: Fn(&str) -> String>(entry: RawEntry, transform: &F) -> Row {
    let raw_name = String::from_utf8_lossy(&entry.name).into_owned();
    let name = transform(&raw_name);
    let normalized = path::normpath(&name);
    let (parent_path, name) = path::split_parent(&normalized)
        .map(|(p, n)| (p.to_string(), n.to_string()))
        .unwrap_or_else(|| ("/".to_string(), normalized.clone()));

    let linkname = String::from_utf8_lossy(&entry.linkname).into_owned();

    if entry.name.iter().any(|&b| b == 0) {
        warn!(offset = entry.header_offset, "AR member name contained an embedded NUL byte");
    }

    Row {
        parent_path,
        name,
        header_offset: entry.header_offset,
        data_offset: entry.data_offset,
        size: entry.size,
        mtime: entry.mtime,
        mode: entry.mode,
        type_tag: if entry.is_symlink {
            TypeTag::Symlink
        } else {
            TypeTag::Regular
        },
        linkname,
        uid: entry.uid,
        gid: entry.gid,
        is_tar: false,
        is_sparse: false,
        is_generated: false,
        recursion_depth: 0,
        backend: crate::model::Backend::Ar,
    }
}

impl<R: Read + Seek + Send + 'static> ArMountSource<R> {
    fn stencil_for(&self, file_info: &FileInfo) -> Result<Stencil, MountError> {
        if file_info.is_symlink() {
            return Err(MountError::IsSymlink);
        }
        match file_info.userdata {
            UserData::Ar { data_offset, size, .. } => Ok(Stencil {
                offset: data_offset,
                len: size,
            }),
            _ => Err(MountError::NotFound),
        }
    }
}

impl<R: Read + Seek + Send + 'static> MountSource for ArMountSource<R> {
    fn lookup(&self, path: &str) -> Option<FileInfo> {
        self.core.lookup(path)
    }

    fn list(&self, path: &str) -> Option<std::collections::BTreeMap<String, FileInfo>> {
        self.core.list(path)
    }

    fn versions(&self, path: &str) -> usize {
        self.core.versions(path)
    }

    /// `buffering == 0` selects the raw, unbuffered reader; a positive
    /// value uses it as the block size; negative (including
    /// [`crate::mount::DEFAULT_BUFFERING`]) falls back to this source's
    /// own default block size.
    fn open(&self, file_info: &FileInfo, buffering: i64) -> Result<Box<dyn SeekableRead>, MountError> {
        let stencil = self.stencil_for(file_info)?;
        if buffering == 0 {
            return Ok(Box::new(RawStencilReader::new(Arc::clone(&self.stream), vec![stencil])));
        }
        let block_size = if buffering > 0 { buffering as usize } else { self.block_size };
        Ok(Box::new(crate::stencil::BufferedStencilReader::new(
            Arc::clone(&self.stream),
            vec![stencil],
            block_size,
        )))
    }

    fn close(&self) -> Result<(), MountError> {
        close_shared(&self.stream)?;
        Ok(())
    }
}
