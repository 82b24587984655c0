use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::TransferError;
use crate::plan::ByteRange;

/// Seekable byte stream that can move to a blocking thread.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Opens independent handles onto the bytes being uploaded.
///
/// Every chunk worker opens its own handle and drops it when it exits.
pub trait ChunkSource: Send + Sync {
    fn open(&self) -> std::io::Result<Box<dyn ReadSeek>>;
}

/// A file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChunkSource for LocalFile {
    fn open(&self) -> std::io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(std::fs::File::open(&self.path)?))
    }
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads arbitrary byte ranges from a handle, checking that the handle
/// really is where the range says and that the range is complete.
///
/// All calls block; run them inside `spawn_blocking`.
pub struct ChunkReader {
    inner: Box<dyn ReadSeek>,
}

impl ChunkReader {
    pub fn new(inner: Box<dyn ReadSeek>) -> Self {
        Self { inner }
    }

    /// Opens a fresh handle from `source`.
    pub fn open(source: &dyn ChunkSource) -> Result<Self, TransferError> {
        Ok(Self::new(source.open()?))
    }

    /// Reads exactly the bytes of `range`.
    pub fn read_range(&mut self, range: ByteRange) -> Result<Vec<u8>, TransferError> {
        let pos = self.inner.seek(SeekFrom::Start(range.start))?;
        if pos != range.start {
            return Err(TransferError::SeekMismatch {
                expected: range.start,
                actual: pos,
            });
        }

        let len = usize::try_from(range.len)
            .map_err(|_| TransferError::InvalidConfig(format!("chunk of {} bytes", range.len)))?;
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled < len {
            return Err(TransferError::ShortRead {
                offset: range.start,
                expected: range.len,
                read: filled as u64,
            });
        }
        Ok(buf)
    }
}
