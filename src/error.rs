//! Domain error types, one enum per failure domain, layered the way the
//! teacher layers its codec/superblock errors.

use thiserror::Error;

/// Reserved for path-normalization failures. Normalization never fails
/// today (every input string has a valid normal form), but the type
/// exists for symmetry with the other per-domain error enums and so a
/// future validating variant of `path::normpath` has somewhere to report
/// to without changing call sites.
#[derive(Error, Debug)]
pub enum PathError {}

#[derive(Error, Debug)]
pub enum ArParseError {
    #[error("invalid AR magic bytes: {0:?}")]
    BadMagic(Vec<u8>),
    #[error("incomplete AR header at offset {offset}: got {len} of 60 bytes")]
    IncompleteHeader { offset: u64, len: usize },
    #[error("invalid AR header terminator at offset {offset}: {bytes:?}")]
    BadTerminator { offset: u64, bytes: [u8; 2] },
    #[error("malformed numeric field {field}: {value:?}")]
    BadNumericField { field: &'static str, value: Vec<u8> },
    #[error("insufficient data for BSD long name ({expected} bytes): got {got}")]
    TruncatedLongName { expected: usize, got: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum HtmlParseError {
    #[error("not a supported HTML document")]
    NotHtml,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MountError {
    #[error("cannot read contents of a symbolic link")]
    IsSymlink,
    #[error("path not found")]
    NotFound,
    #[error(transparent)]
    Ar(#[from] ArParseError),
    #[error(transparent)]
    Html(#[from] HtmlParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
