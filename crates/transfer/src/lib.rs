//! Chunked parallel file upload with first-error-wins failure handling.
//!
//! Files above the chunk threshold are split into fixed-size byte ranges and
//! uploaded by a bounded pool of workers into a server-side upload session,
//! which is then committed under the SHA-256 of the whole file. Smaller
//! files go through a single multipart request.

mod checksum;
mod plan;
mod pool;
mod progress;
mod session;
mod source;
mod tracker;
mod transport;

use std::time::Duration;

use pulpdeploy_api::ApiError;

pub use checksum::{calculate_file_checksum, checksum_bytes, file_sha256};
pub use plan::{ByteRange, ChunkOffsets, ChunkPlan};
pub use pool::{ChunkPool, PoolReport};
pub use progress::{SpeedCalculator, TransferProgress};
pub use session::{ApiFuture, UploadApi, UploadOutcome, Uploader};
pub use source::{ChunkReader, ChunkSource, LocalFile, ReadSeek};
pub use tracker::FailureTracker;
pub use transport::{ChunkConnection, ChunkTransport, HttpChunkTransport, PutChunkFuture};

/// Default chunk size and direct-upload threshold: 8 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Default number of concurrent chunk workers.
pub const DEFAULT_WORKERS: usize = 10;

/// Tuning of the chunked upload path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    /// Bytes per chunk. Files of at most this size are uploaded directly.
    pub chunk_size: u64,
    pub workers: usize,
    /// Timeout of a single chunk request.
    pub chunk_timeout: Duration,
    /// Interval between polls of the commit task.
    pub poll_interval: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            chunk_timeout: pulpdeploy_protocol::constants::UPLOAD_REQUEST_TIMEOUT,
            poll_interval: pulpdeploy_protocol::constants::TASK_POLL_INTERVAL,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chunk_size == 0 {
            return Err(TransferError::InvalidConfig(
                "chunk size must be greater than zero".into(),
            ));
        }
        if self.workers == 0 {
            return Err(TransferError::InvalidConfig(
                "worker count must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("seek to offset {expected} landed at {actual}")]
    SeekMismatch { expected: u64, actual: u64 },

    #[error("short read at offset {offset}: read {read} bytes, expected {expected}")]
    ShortRead {
        offset: u64,
        expected: u64,
        read: u64,
    },

    #[error("size of data mismatch at offset {offset}: read {read} bytes, sent {sent} bytes")]
    ByteCountMismatch { offset: u64, read: u64, sent: u64 },

    #[error("chunk worker failed: {0}")]
    Worker(String),

    #[error("invalid upload configuration: {0}")]
    InvalidConfig(String),
}
