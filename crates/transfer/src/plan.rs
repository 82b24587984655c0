use std::fmt;

use crate::TransferError;

/// Splits a file of known size into fixed-size byte ranges.
///
/// The plan is the only producer of chunk boundaries: its offsets partition
/// `[0, file_size)` with no gaps or overlaps, and every range but the last
/// is exactly `chunk_size` long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    pub fn new(file_size: u64, chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidConfig(
                "chunk size must be greater than zero".into(),
            ));
        }
        Ok(Self {
            file_size,
            chunk_size,
        })
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks in the plan.
    pub fn chunk_count(&self) -> u64 {
        self.file_size.div_ceil(self.chunk_size)
    }

    /// Lazy sequence of chunk start offsets. Each call starts over at 0.
    pub fn offsets(&self) -> ChunkOffsets {
        ChunkOffsets {
            next: Some(0),
            file_size: self.file_size,
            chunk_size: self.chunk_size,
        }
    }

    /// Byte range starting at `offset`, clipped to the end of the file.
    pub fn range(&self, offset: u64) -> ByteRange {
        let len = self
            .chunk_size
            .min(self.file_size.saturating_sub(offset));
        ByteRange {
            start: offset,
            len,
            total: self.file_size,
        }
    }
}

/// Iterator over the start offsets of a [`ChunkPlan`].
#[derive(Debug, Clone)]
pub struct ChunkOffsets {
    next: Option<u64>,
    file_size: u64,
    chunk_size: u64,
}

impl Iterator for ChunkOffsets {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let offset = self.next.filter(|&o| o < self.file_size)?;
        self.next = offset.checked_add(self.chunk_size);
        Some(offset)
    }
}

/// Contiguous byte range of a file of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub len: u64,
    pub total: u64,
}

impl ByteRange {
    /// Offset of the last byte (inclusive). Undefined for empty ranges.
    pub fn end(&self) -> u64 {
        self.start + self.len.saturating_sub(1)
    }

    /// Value of the `Content-Range` header for this range.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end(), self.total)
    }

    /// Returns `true` if the range reaches the end of the file.
    pub fn is_final(&self) -> bool {
        self.start.saturating_add(self.len) >= self.total
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.start, self.end(), self.total)
    }
}
