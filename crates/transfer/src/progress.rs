use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

use crate::plan::ByteRange;

/// Byte and chunk counters of one upload, shared by its workers.
///
/// Every completed chunk is logged with the running totals.
#[derive(Debug)]
pub struct TransferProgress {
    total_bytes: u64,
    total_chunks: u64,
    bytes: AtomicU64,
    chunks: AtomicU64,
    speed: SpeedCalculator,
}

impl TransferProgress {
    pub fn new(total_bytes: u64, total_chunks: u64) -> Self {
        Self {
            total_bytes,
            total_chunks,
            bytes: AtomicU64::new(0),
            chunks: AtomicU64::new(0),
            speed: SpeedCalculator::new(None, None),
        }
    }

    /// Records a chunk accepted by the server.
    pub fn chunk_done(&self, worker: usize, range: ByteRange) {
        let bytes = self.bytes.fetch_add(range.len, Ordering::SeqCst) + range.len;
        let chunks = self.chunks.fetch_add(1, Ordering::SeqCst) + 1;
        self.speed.add_sample(range.len);

        let percent = if self.total_bytes == 0 {
            100.0
        } else {
            bytes as f64 * 100.0 / self.total_bytes as f64
        };
        info!(
            worker,
            chunk = %range,
            chunks = %format!("{chunks}/{}", self.total_chunks),
            percent = %format!("{percent:.1}"),
            rate_kib = (self.speed.bytes_per_second() / 1024.0) as u64,
            "chunk uploaded"
        );
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }

    pub fn chunks(&self) -> u64 {
        self.chunks.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SpeedSample {
    bytes: u64,
    timestamp: Instant,
}

/// Calculates transfer speed using a sliding window of samples.
#[derive(Debug)]
pub struct SpeedCalculator {
    inner: Mutex<SpeedInner>,
}

#[derive(Debug)]
struct SpeedInner {
    samples: Vec<SpeedSample>,
    max_samples: usize,
    window_size: Duration,
}

impl SpeedCalculator {
    /// Creates a new calculator.
    ///
    /// - `window_size`: time window for speed calculation (default 10 s).
    /// - `max_samples`: maximum retained samples (default 100).
    pub fn new(window_size: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(SpeedInner {
                samples: Vec::new(),
                max_samples: max_samples.unwrap_or(100),
                window_size: window_size.unwrap_or(Duration::from_secs(10)),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SpeedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a sample of `bytes` transferred at the current instant.
    pub fn add_sample(&self, bytes: u64) {
        self.add_sample_at(bytes, Instant::now());
    }

    fn add_sample_at(&self, bytes: u64, now: Instant) {
        let mut s = self.lock();
        s.samples.push(SpeedSample {
            bytes,
            timestamp: now,
        });

        if let Some(cutoff) = now.checked_sub(s.window_size) {
            s.samples.retain(|sample| sample.timestamp >= cutoff);
        }

        if s.samples.len() > s.max_samples {
            let excess = s.samples.len() - s.max_samples;
            s.samples.drain(..excess);
        }
    }

    /// Returns the average speed in bytes/second within the window.
    ///
    /// Returns 0.0 if fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let s = self.lock();
        let (Some(first), Some(last)) = (s.samples.first(), s.samples.last()) else {
            return 0.0;
        };
        if s.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = last.timestamp.duration_since(first.timestamp);
        if elapsed.is_zero() {
            return 0.0;
        }

        let total_bytes: u64 = s.samples.iter().map(|sample| sample.bytes).sum();
        total_bytes as f64 / elapsed.as_secs_f64()
    }
}
