//! File-info index: a frozen row table keyed by `(parent_path, name)`,
//! built once from a backend's scan and never mutated afterward.
//!
//! Directories are never stored as their own rows unless a backend marks
//! one `is_generated`; instead every path prefix reachable by a stored
//! row is synthesized into a directory entry at freeze time, exactly
//! materializing the hierarchy implied by the flat row list.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{libc_s_ifmt, Backend, FileInfo, Row, TypeTag, UserData};
use crate::path;

type Key = (String, String);

#[derive(Debug, Default)]
pub struct FileInfoIndex {
    rows: BTreeMap<Key, Vec<Row>>,
    children: BTreeMap<String, BTreeSet<String>>,
}

impl FileInfoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a backend's scan results and freeze the index. Rows that
    /// share a `(parent_path, name)` key are kept in scan order; the last
    /// one is the current version, earlier ones are prior versions.
    pub fn set_rows(&mut self, rows: Vec<Row>) {
        let mut map: BTreeMap<Key, Vec<Row>> = BTreeMap::new();
        for row in rows {
            map.entry((row.parent_path.clone(), row.name.clone()))
                .or_default()
                .push(row);
        }

        let mut needed_dirs: BTreeSet<String> = BTreeSet::new();
        for (parent, _) in map.keys() {
            for ancestor in ancestors(parent) {
                needed_dirs.insert(ancestor);
            }
        }

        for dir in needed_dirs {
            if dir == "/" {
                continue;
            }
            if let Some((parent, name)) = path::split_parent(&dir) {
                let key = (parent.to_string(), name.to_string());
                map.entry(key).or_insert_with(|| {
                    vec![Row {
                        parent_path: parent.to_string(),
                        name: name.to_string(),
                        header_offset: 0,
                        data_offset: 0,
                        size: 0,
                        mtime: 0,
                        mode: 0o770 | libc_s_ifmt::S_IFDIR,
                        type_tag: TypeTag::Directory,
                        linkname: String::new(),
                        uid: 0,
                        gid: 0,
                        is_tar: false,
                        is_sparse: false,
                        is_generated: true,
                        recursion_depth: 0,
                        backend: Backend::Synthetic,
                    }]
                });
            }
        }

        let mut children: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (parent, name) in map.keys() {
            children.entry(parent.clone()).or_default().insert(name.clone());
        }

        self.rows = map;
        self.children = children;
    }

    pub fn lookup(&self, query: &str) -> Option<FileInfo> {
        let normalized = path::normpath(query);
        if normalized == "/" {
            return Some(root_info());
        }
        let (parent, name) = path::split_parent(&normalized)?;
        let versions = self.rows.get(&(parent.to_string(), name.to_string()))?;
        versions.last().map(row_to_file_info)
    }

    /// All stored versions of `query`, oldest first. Empty if the path does
    /// not exist.
    pub fn version_rows(&self, query: &str) -> Vec<&Row> {
        let normalized = path::normpath(query);
        match path::split_parent(&normalized) {
            None => Vec::new(),
            Some((parent, name)) => self
                .rows
                .get(&(parent.to_string(), name.to_string()))
                .map(|v| v.iter().collect())
                .unwrap_or_default(),
        }
    }

    pub fn versions(&self, query: &str) -> usize {
        self.version_rows(query).len()
    }

    pub fn list(&self, query: &str) -> Option<BTreeMap<String, FileInfo>> {
        let normalized = path::normpath(query);
        let names = self.children.get(&normalized)?;
        let mut out = BTreeMap::new();
        for name in names {
            let versions = self.rows.get(&(normalized.clone(), name.clone()))?;
            if let Some(info) = versions.last().map(row_to_file_info) {
                out.insert(name.clone(), info);
            }
        }
        Some(out)
    }
}

fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = path.to_string();
    loop {
        out.push(current.clone());
        if current == "/" {
            break;
        }
        match path::split_parent(&current) {
            Some((parent, _)) => current = parent.to_string(),
            None => break,
        }
    }
    out
}

fn root_info() -> FileInfo {
    FileInfo {
        size: 0,
        mtime: 0,
        mode: 0o770 | libc_s_ifmt::S_IFDIR,
        linkname: String::new(),
        uid: 0,
        gid: 0,
        userdata: UserData::Synthetic,
    }
}

fn row_to_file_info(row: &Row) -> FileInfo {
    let userdata = if row.is_generated || matches!(row.backend, Backend::Synthetic) {
        UserData::Synthetic
    } else {
        match row.backend {
            Backend::Ar => UserData::Ar {
                header_offset: row.header_offset,
                data_offset: row.data_offset,
                size: row.size,
            },
            Backend::Html => UserData::Html {
                span_start: row.header_offset,
                span_end: row.data_offset,
            },
            Backend::Synthetic => UserData::Synthetic,
        }
    };
    FileInfo {
        size: row.size,
        mtime: row.mtime,
        mode: row.mode,
        linkname: row.linkname.clone(),
        uid: row.uid,
        gid: row.gid,
        userdata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::libc_s_ifmt;

    fn names_of(listing: Option<BTreeMap<String, FileInfo>>) -> Vec<String> {
        listing.unwrap_or_default().into_keys().collect()
    }

    fn file_row(parent: &str, name: &str, size: u64) -> Row {
        Row {
            parent_path: parent.to_string(),
            name: name.to_string(),
            header_offset: 0,
            data_offset: 68,
            size,
            mtime: 0,
            mode: 0o644 | libc_s_ifmt::S_IFREG,
            type_tag: TypeTag::Regular,
            linkname: String::new(),
            uid: 0,
            gid: 0,
            is_tar: false,
            is_sparse: false,
            is_generated: false,
            recursion_depth: 0,
            backend: Backend::Ar,
        }
    }

    #[test]
    fn synthesizes_intermediate_directories() {
        let mut index = FileInfoIndex::new();
        index.set_rows(vec![file_row("/a/b", "c.txt", 4)]);

        let root = index.lookup("/").unwrap();
        assert!(root.is_dir());

        let a = index.lookup("/a").unwrap();
        assert!(a.is_dir());

        let ab = index.lookup("/a/b").unwrap();
        assert!(ab.is_dir());

        assert_eq!(names_of(index.list("/")), vec!["a".to_string()]);
        assert_eq!(names_of(index.list("/a")), vec!["b".to_string()]);
        let ab_listing = index.list("/a/b").unwrap();
        assert_eq!(names_of(Some(ab_listing.clone())), vec!["c.txt".to_string()]);
        assert_eq!(ab_listing["c.txt"].size, 4);

        let file = index.lookup("/a/b/c.txt").unwrap();
        assert!(file.is_regular());
        assert_eq!(file.size, 4);
    }

    #[test]
    fn versions_tracks_duplicate_entries() {
        let mut index = FileInfoIndex::new();
        index.set_rows(vec![file_row("/", "dup", 1), file_row("/", "dup", 2)]);
        assert_eq!(index.versions("/dup"), 2);
        assert_eq!(index.lookup("/dup").unwrap().size, 2);
    }

    #[test]
    fn missing_path_returns_none() {
        let index = FileInfoIndex::new();
        assert!(index.lookup("/nope").is_none());
        assert!(index.list("/nope").is_none());
    }
}
