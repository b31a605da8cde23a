//! # Seekable Byte Streams
//!
//! The decoder reads its container through the [`AudioStream`] contract. The
//! engine's own file-access layer normally supplies the implementation; this
//! module ships an in-memory stream and a plain file stream.
//!
//! Streams are shared with the decoder through a [`SharedStream`] handle. The
//! caller keeps its own handle; the decoder only locks the stream while the
//! codec library issues a read or seek, and drops its handle on `close()`.

use bytes::Bytes;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Reference point for [`AudioStream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

/// Seekable byte stream consumed by the decoder.
///
/// Opening a decoder fails immediately if any of `is_open`, `is_readable` or
/// `is_seekable` is false.
pub trait AudioStream: Send {
    /// Whether the stream is open.
    fn is_open(&self) -> bool;

    /// Whether the stream can be read.
    fn is_readable(&self) -> bool;

    /// Whether the stream supports random access.
    fn is_seekable(&self) -> bool;

    /// Read up to `buf.len()` bytes, returning the number read (0 at end).
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Move the read position and return the new absolute position.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64>;

    /// Total size in bytes, if known.
    fn size(&self) -> Option<u64>;
}

/// Stream handle shared between the caller and a decoder.
pub type SharedStream = Arc<Mutex<dyn AudioStream>>;

/// Wrap a stream into a [`SharedStream`].
pub fn shared<S>(stream: S) -> SharedStream
where
    S: AudioStream + 'static,
{
    Arc::new(Mutex::new(stream))
}

/// Resolve a seek request against a current position and a length.
fn resolve_seek(position: u64, len: u64, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
    let base = match origin {
        SeekOrigin::Begin => 0i128,
        SeekOrigin::Current => position as i128,
        SeekOrigin::End => len as i128,
    };
    let target = base + offset as i128;

    if target < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "seek before start of stream",
        ));
    }

    u64::try_from(target)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek position overflow"))
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "stream is closed")
}

// ============================================================================
// Memory Stream
// ============================================================================

/// Read-only stream over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    data: Bytes,
    position: u64,
    open: bool,
}

impl MemoryStream {
    /// Create a stream over `data`, positioned at the start.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            open: true,
        }
    }

    /// Close the stream. Further reads and seeks fail.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl AudioStream for MemoryStream {
    fn is_open(&self) -> bool {
        self.open
    }

    fn is_readable(&self) -> bool {
        self.open
    }

    fn is_seekable(&self) -> bool {
        self.open
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.open {
            return Err(closed_error());
        }

        let len = self.data.len() as u64;
        if self.position >= len {
            return Ok(0);
        }

        let start = self.position as usize;
        let count = buf.len().min(self.data.len() - start);
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        self.position += count as u64;

        Ok(count)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        if !self.open {
            return Err(closed_error());
        }

        self.position = resolve_seek(self.position, self.data.len() as u64, offset, origin)?;
        Ok(self.position)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

// ============================================================================
// File Stream
// ============================================================================

/// Read-only stream over a file on the local filesystem.
#[derive(Debug)]
pub struct FileStream {
    file: Option<File>,
    len: u64,
}

impl FileStream {
    /// Open `path` for reading.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        debug!("Opened file stream {} ({} bytes)", path.display(), len);

        Ok(Self {
            file: Some(file),
            len,
        })
    }

    /// Close the underlying file handle.
    pub fn close(&mut self) {
        self.file = None;
    }
}

impl AudioStream for FileStream {
    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn is_readable(&self) -> bool {
        self.file.is_some()
    }

    fn is_seekable(&self) -> bool {
        self.file.is_some()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.as_mut().ok_or_else(closed_error)?.read(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        let file = self.file.as_mut().ok_or_else(closed_error)?;
        let position = file.stream_position()?;
        let target = resolve_seek(position, self.len, offset, origin)?;
        file.seek(SeekFrom::Start(target))
    }

    fn size(&self) -> Option<u64> {
        self.file.as_ref().map(|_| self.len)
    }
}
