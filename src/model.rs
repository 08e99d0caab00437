//! Row and exposed-record types shared by every mount source.

use serde::{Deserialize, Serialize};

/// TAR-style type flag, currently only distinguished for directories vs.
/// everything else. Reserved for future backends that need more variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TypeTag {
    #[default]
    Regular,
    Directory,
    Symlink,
}

/// Which backend produced a row, needed because AR and HTML rows
/// overload the same `header_offset`/`data_offset` pair for different
/// meanings (archive member offsets vs. a `data:` URL's text span).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    #[default]
    Ar,
    Html,
    Synthetic,
}

/// A stored index record. Field order matches the persistence contract:
/// `parent_path, name, header_offset, data_offset, size, mtime, mode,
/// type_tag, linkname, uid, gid, is_tar, is_sparse, is_generated,
/// recursion_depth`, plus a trailing `backend` tag. Do not reorder the
/// first fifteen fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub parent_path: String,
    pub name: String,
    pub header_offset: u64,
    pub data_offset: u64,
    pub size: u64,
    pub mtime: i64,
    pub mode: u32,
    pub type_tag: TypeTag,
    pub linkname: String,
    pub uid: u32,
    pub gid: u32,
    pub is_tar: bool,
    pub is_sparse: bool,
    pub is_generated: bool,
    pub recursion_depth: u32,
    pub backend: Backend,
}

/// Backend-specific payload location, exposed at the `MountSource`
/// boundary. The stored `Row` always keeps the flat `header_offset`/
/// `data_offset` pair; this tags what those offsets mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserData {
    Ar {
        header_offset: u64,
        data_offset: u64,
        size: u64,
    },
    Html {
        span_start: u64,
        span_end: u64,
    },
    Synthetic,
}

/// A file or directory as exposed to mount source callers.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub size: u64,
    pub mtime: i64,
    pub mode: u32,
    pub linkname: String,
    pub uid: u32,
    pub gid: u32,
    pub userdata: UserData,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.mode & libc_s_ifmt::S_IFMT == libc_s_ifmt::S_IFDIR
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & libc_s_ifmt::S_IFMT == libc_s_ifmt::S_IFLNK
    }

    pub fn is_regular(&self) -> bool {
        self.mode & libc_s_ifmt::S_IFMT == libc_s_ifmt::S_IFREG
    }
}

/// Minimal POSIX mode-bit constants. Mirrors `<sys/stat.h>`'s `S_IF*`
/// family without pulling in a libc dependency for five bit patterns.
pub mod libc_s_ifmt {
    pub const S_IFMT: u32 = 0o170000;
    pub const S_IFREG: u32 = 0o100000;
    pub const S_IFDIR: u32 = 0o040000;
    pub const S_IFLNK: u32 = 0o120000;
}

impl Row {
    pub fn full_path(&self) -> String {
        crate::path::join(&self.parent_path, &self.name)
    }
}
