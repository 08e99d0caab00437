//! HTML embedded data-URL mount source.

mod data_url;
mod scanner;

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::SystemTime;

use sha2::{Digest, Sha256};

pub use data_url::DataUrl;
pub use scanner::{gather_embedded_files, EmbeddedFileCandidate};

use crate::error::{HtmlParseError, MountError};
use crate::model::{libc_s_ifmt, FileInfo, Row, TypeTag, UserData};
use crate::mount::{finalize_index, IndexedCore, MountSource};
use crate::path;
use crate::stencil::{close_shared, open_shared, SeekableRead, SharedStream};

/// Read-only mount source exposing every `data:` URL embedded in an HTML
/// document's attributes and CSS/script string literals as a virtual
/// file.
pub struct HtmlMountSource<R> {
    stream: SharedStream<R>,
    core: IndexedCore,
}

impl<R: Read + Seek> HtmlMountSource<R> {
    /// Build from an arbitrary stream. There is no backing file to stat,
    /// so every row's `mtime` is the wall-clock time of construction.
    pub fn new(stream: R) -> Result<Self, MountError> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self::build(stream, now, identity_transform)
    }

    /// Build from an arbitrary stream with a path-rewriter applied to
    /// every virtual path before normalization.
    pub fn new_with_transform<F>(stream: R, transform: F) -> Result<Self, MountError>
    where
        F: Fn(&str) -> String,
    {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self::build(stream, now, transform)
    }

    fn build<F>(mut stream: R, mtime: i64, transform: F) -> Result<Self, MountError>
    where
        F: Fn(&str) -> String,
    {
        let mut bytes = Vec::new();
        stream.seek(SeekFrom::Start(0))?;
        stream.read_to_end(&mut bytes)?;

        let (text, _, _) = encoding_rs::UTF_8.decode(&bytes);
        if !looks_like_html(&text) {
            return Err(MountError::Html(HtmlParseError::NotHtml));
        }

        let candidates = gather_embedded_files(&text);
        let rows: Vec<Row> = candidates
            .into_iter()
            .filter_map(|c| build_row(&bytes, c, mtime, &transform))
            .collect();

        let core = IndexedCore {
            index: finalize_index(|| rows),
        };
        Ok(Self {
            stream: open_shared(stream),
            core,
        })
    }
}

impl HtmlMountSource<std::fs::File> {
    /// Build from a path on disk; `mtime` is read from the file's
    /// metadata instead of defaulting to the current time.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, MountError> {
        Self::open_path_with_transform(path, identity_transform)
    }

    pub fn open_path_with_transform<F>(path: impl AsRef<Path>, transform: F) -> Result<Self, MountError>
    where
        F: Fn(&str) -> String,
    {
        let file = std::fs::File::open(path.as_ref())?;
        let mtime = std::fs::metadata(path.as_ref())?
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self::build(file, mtime, transform)
    }
}

fn identity_transform(name: &str) -> String {
    name.to_string()
}

fn looks_like_html(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    lowered.contains("<html") || lowered.contains("<!doctype html") || lowered.contains("<body")
}

fn build_row<F>(bytes: &[u8], candidate: EmbeddedFileCandidate, mtime: i64, transform: &F) -> Option<Row>
where
    F: Fn(&str) -> String,
{
    let (start, end) = candidate.span;
    let raw = std::str::from_utf8(&bytes[start as usize..end as usize]).ok()?;
    let parsed = DataUrl::parse(raw);
    if !parsed.is_valid() {
        return None;
    }
    let content = parsed.read();

    let virtual_path = match &candidate.original_url {
        Some(url) => normalize_url_as_path(url),
        None => hashed_path(&content, &parsed.mime_type),
    };
    let normalized = path::normpath(&transform(&virtual_path));
    let (parent_path, name) = path::split_parent(&normalized)?;

    Some(Row {
        parent_path: parent_path.to_string(),
        name: name.to_string(),
        header_offset: start,
        data_offset: end,
        size: content.len() as u64,
        mtime,
        mode: 0o440 | libc_s_ifmt::S_IFREG,
        type_tag: TypeTag::Regular,
        linkname: String::new(),
        uid: 0,
        gid: 0,
        is_tar: false,
        is_sparse: false,
        is_generated: false,
        recursion_depth: 0,
        backend: crate::model::Backend::Html,
    })
}

fn normalize_url_as_path(url: &str) -> String {
    let collapsed = url.replacen("://", ":/", 1);
    if collapsed.starts_with('/') {
        collapsed
    } else {
        format!("/{collapsed}")
    }
}

fn hashed_path(content: &[u8], mime_type: &str) -> String {
    let digest = Sha256::digest(content);
    let extension = extension_for_mime(mime_type);
    format!("/{}{}", hex::encode(digest), extension)
}

fn extension_for_mime(mime_type: &str) -> String {
    if mime_type.eq_ignore_ascii_case("text/javascript")
        || mime_type.eq_ignore_ascii_case("application/javascript")
    {
        return ".js".to_string();
    }
    mime_guess::get_mime_extensions_str(mime_type)
        .and_then(|exts| exts.first())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

impl<R: Read + Seek + Send + 'static> MountSource for HtmlMountSource<R> {
    fn lookup(&self, path: &str) -> Option<FileInfo> {
        self.core.lookup(path)
    }

    fn list(&self, path: &str) -> Option<std::collections::BTreeMap<String, FileInfo>> {
        self.core.list(path)
    }

    fn versions(&self, path: &str) -> usize {
        self.core.versions(path)
    }

    // `buffering` is part of the trait for uniformity with `ArMountSource`
    // but unused here, same as the reference `HTMLMountSource.open`: the
    // whole decoded span is read in one seek regardless of block size.
    fn open(&self, file_info: &FileInfo, _buffering: i64) -> Result<Box<dyn SeekableRead>, MountError> {
        let (span_start, span_end) = match file_info.userdata {
            UserData::Html { span_start, span_end } => (span_start, span_end),
            _ => return Err(MountError::NotFound),
        };
        let len = (span_end - span_start) as usize;
        let mut raw = vec![0u8; len];
        {
            let mut guard = self
                .stream
                .lock()
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "stream lock poisoned"))?;
            let inner = guard.as_mut().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "mount source stream is closed")
            })?;
            inner.seek(SeekFrom::Start(span_start))?;
            inner.read_exact(&mut raw)?;
        }
        let text = std::str::from_utf8(&raw).map_err(|_| HtmlParseError::NotHtml)?;
        let content = DataUrl::parse(text).read();
        Ok(Box::new(Cursor::new(content)))
    }

    fn close(&self) -> Result<(), MountError> {
        close_shared(&self.stream)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    fn html_doc(body: &str) -> String {
        format!("<html><body>{body}</body></html>")
    }

    #[test]
    fn lookup_and_open_base64_image() {
        let url = "data:image/webp;base64,UklGRiQAAABXRUJQVlA4IBgAAAAwAQCdASoBAAEAAQAcJaQAA3AA/v3AgAA=";
        let doc = html_doc(&format!(r#"<img src="{url}">"#));
        let source = HtmlMountSource::new(IoCursor::new(doc.into_bytes())).unwrap();

        let names = source.list("/").expect("root should list one file");
        assert_eq!(names.len(), 1);

        let name = names.keys().next().unwrap();
        let info = source.lookup(&format!("/{name}")).unwrap();
        assert!(info.is_regular());
        assert!(info.mtime > 0, "stream input should fall back to the current time");
        let mut reader = source.open(&info, crate::mount::DEFAULT_BUFFERING).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), info.size as usize);
        assert!(!out.is_empty());
    }

    #[test]
    fn original_url_becomes_virtual_path() {
        let doc = html_doc(
            r#"<img data-savepage-src="https://example.com/a.png" src="data:image/png;base64,AAAA">"#,
        );
        let source = HtmlMountSource::new(IoCursor::new(doc.into_bytes())).unwrap();
        assert!(source.lookup("/https:/example.com/a.png").is_some());
    }

    #[test]
    fn non_html_input_is_rejected() {
        let err = HtmlMountSource::new(IoCursor::new(b"just some text".to_vec()));
        assert!(err.is_err());
    }

    #[test]
    fn path_backed_source_reads_mtime_from_disk() {
        let doc = html_doc(r#"<img src="data:image/png;base64,AAAA">"#);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, doc.as_bytes()).unwrap();
        let expected = std::fs::metadata(file.path())
            .unwrap()
            .modified()
            .unwrap()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;

        let source = HtmlMountSource::open_path(file.path()).unwrap();
        let names = source.list("/").unwrap();
        let name = names.keys().next().unwrap();
        let info = source.lookup(&format!("/{name}")).unwrap();
        assert_eq!(info.mtime, expected);
    }

    #[test]
    fn transform_rewrites_virtual_path_before_normalization() {
        let doc = html_doc(r#"<img src="data:image/png;base64,AAAA">"#);
        let source = HtmlMountSource::new_with_transform(IoCursor::new(doc.into_bytes()), |name| {
            format!("/prefixed{name}")
        })
        .unwrap();
        let names = source.list("/prefixed").unwrap();
        assert_eq!(names.len(), 1);
    }
}
