//! # stencilmount — read-only virtual filesystem mount sources
//!
//! Exposes the contents of a container file as a hierarchical, read-only
//! namespace without extracting it to disk first:
//!
//! - [`ar`] mounts AR archives (GNU, BSD, thin, and Darwin variants,
//!   including `.deb` files, which are plain GNU-variant archives).
//! - [`html`] mounts every `data:` URL embedded in an HTML document's
//!   attributes or CSS/script string literals as its own virtual file.
//!
//! Both backends implement the shared [`mount::MountSource`] trait and
//! are built on the same [`stencil`] random-access byte-range reader and
//! [`index`] frozen row table.

pub mod ar;
pub mod error;
pub mod html;
pub mod index;
pub mod model;
pub mod mount;
pub mod path;
pub mod stencil;

pub use ar::ArMountSource;
pub use error::{ArParseError, HtmlParseError, MountError, PathError};
pub use html::{DataUrl, HtmlMountSource};
pub use index::FileInfoIndex;
pub use model::{Backend, FileInfo, Row, TypeTag, UserData};
pub use mount::{MountSource, DEFAULT_BUFFERING};
pub use stencil::{BufferedStencilReader, RawStencilReader, SeekableRead, Stencil};
