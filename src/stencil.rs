//! Thread-safe random-access reading over byte ranges ("stencils") cut out
//! of a shared backing stream.
//!
//! Generalizes the spanning-chunk-boundary random access idiom used for
//! compressed chunk reconstruction into a direct raw byte-range reader: a
//! stencil reader exposes one or more `(offset, len)` windows of the
//! backing stream as a single contiguous logical file, without ever
//! copying the full window up front.

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

/// Anything `MountSource::open` can hand back: seekable, readable, and
/// safe to move across thread boundaries.
pub trait SeekableRead: Read + Send {
    fn seek_to(&mut self, pos: u64) -> io::Result<u64>;
}

/// A backing stream shared between a mount source and every reader it has
/// handed out. The `Option` is the close mechanism: `close()` takes the
/// lock and leaves `None` behind, so any reader still holding the `Arc`
/// observes the stream gone on its next read instead of operating on a
/// stale handle.
pub type SharedStream<R> = Arc<Mutex<Option<R>>>;

pub fn open_shared<R>(stream: R) -> SharedStream<R> {
    Arc::new(Mutex::new(Some(stream)))
}

/// Drop the backing stream, invalidating every reader sharing it.
/// Idempotent: closing an already-closed stream is a no-op.
pub fn close_shared<R>(stream: &SharedStream<R>) -> io::Result<()> {
    let mut guard = stream
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "stencil stream lock poisoned"))?;
    *guard = None;
    Ok(())
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "mount source stream is closed")
}

/// One contiguous byte range in the backing stream.
#[derive(Debug, Clone, Copy)]
pub struct Stencil {
    pub offset: u64,
    pub len: u64,
}

fn locate(stencils: &[Stencil], logical_pos: u64) -> Option<(usize, u64)> {
    let mut base = 0u64;
    for (idx, stencil) in stencils.iter().enumerate() {
        let end = base + stencil.len;
        if logical_pos < end {
            return Some((idx, logical_pos - base));
        }
        base = end;
    }
    None
}

fn total_len(stencils: &[Stencil]) -> u64 {
    stencils.iter().map(|s| s.len).sum()
}

/// Unbuffered stencil reader: every `read` call issues exactly one
/// `seek` + `read` against the shared stream under the mutex.
pub struct RawStencilReader<R> {
    stream: SharedStream<R>,
    stencils: Vec<Stencil>,
    pos: u64,
}

impl<R: Read + Seek> RawStencilReader<R> {
    pub fn new(stream: SharedStream<R>, stencils: Vec<Stencil>) -> Self {
        Self {
            stream,
            stencils,
            pos: 0,
        }
    }

    pub fn single(stream: SharedStream<R>, offset: u64, len: u64) -> Self {
        Self::new(stream, vec![Stencil { offset, len }])
    }
}

impl<R: Read + Seek> Read for RawStencilReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let total = total_len(&self.stencils);
        if self.pos >= total || buf.is_empty() {
            return Ok(0);
        }
        let (idx, within) = match locate(&self.stencils, self.pos) {
            Some(hit) => hit,
            None => return Ok(0),
        };
        let stencil = self.stencils[idx];
        let remaining_in_stencil = stencil.len - within;
        let to_read = (buf.len() as u64).min(remaining_in_stencil) as usize;

        let mut guard = self
            .stream
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stencil stream lock poisoned"))?;
        let inner = guard.as_mut().ok_or_else(closed_error)?;
        inner.seek(SeekFrom::Start(stencil.offset + within))?;
        let read = inner.read(&mut buf[..to_read])?;
        drop(guard);

        self.pos += read as u64;
        Ok(read)
    }
}

impl SeekableRead for Cursor<Vec<u8>> {
    fn seek_to(&mut self, pos: u64) -> io::Result<u64> {
        self.seek(SeekFrom::Start(pos))
    }
}

impl<R: Read + Seek + Send> SeekableRead for RawStencilReader<R> {
    fn seek_to(&mut self, pos: u64) -> io::Result<u64> {
        self.pos = pos;
        Ok(self.pos)
    }
}

/// Default buffer size when `buffering == -1` is requested and the
/// backing stream's block size cannot be determined.
pub const DEFAULT_BUFFER_SIZE: usize = 512;

/// Block-buffered stencil reader: reads ahead in `buffer_size` chunks to
/// amortize lock/seek overhead for sequential access patterns.
pub struct BufferedStencilReader<R> {
    stream: SharedStream<R>,
    stencils: Vec<Stencil>,
    pos: u64,
    buffer_size: usize,
    buffer: Vec<u8>,
    buffer_start: u64,
}

impl<R: Read + Seek> BufferedStencilReader<R> {
    pub fn new(stream: SharedStream<R>, stencils: Vec<Stencil>, buffer_size: usize) -> Self {
        Self {
            stream,
            stencils,
            pos: 0,
            buffer_size: buffer_size.max(1),
            buffer: Vec::new(),
            buffer_start: 0,
        }
    }

    fn fill_buffer(&mut self) -> io::Result<()> {
        let total = total_len(&self.stencils);
        if self.pos >= total {
            self.buffer.clear();
            return Ok(());
        }
        let (idx, within) = match locate(&self.stencils, self.pos) {
            Some(hit) => hit,
            None => {
                self.buffer.clear();
                return Ok(());
            }
        };
        let stencil = self.stencils[idx];
        let remaining_in_stencil = stencil.len - within;
        let want = (self.buffer_size as u64).min(remaining_in_stencil) as usize;

        let mut guard = self
            .stream
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stencil stream lock poisoned"))?;
        let inner = guard.as_mut().ok_or_else(closed_error)?;
        inner.seek(SeekFrom::Start(stencil.offset + within))?;
        let mut chunk = vec![0u8; want];
        let read = inner.read(&mut chunk)?;
        drop(guard);

        chunk.truncate(read);
        self.buffer_start = self.pos;
        self.buffer = chunk;
        Ok(())
    }
}

impl<R: Read + Seek> Read for BufferedStencilReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let buffer_covers = self.pos >= self.buffer_start
            && self.pos < self.buffer_start + self.buffer.len() as u64;
        if !buffer_covers {
            self.fill_buffer()?;
            if self.buffer.is_empty() {
                return Ok(0);
            }
        }
        let offset_in_buffer = (self.pos - self.buffer_start) as usize;
        let available = &self.buffer[offset_in_buffer..];
        let to_copy = buf.len().min(available.len());
        buf[..to_copy].copy_from_slice(&available[..to_copy]);
        self.pos += to_copy as u64;
        Ok(to_copy)
    }
}

impl<R: Read + Seek + Send> SeekableRead for BufferedStencilReader<R> {
    fn seek_to(&mut self, pos: u64) -> io::Result<u64> {
        self.pos = pos;
        Ok(self.pos)
    }
}
