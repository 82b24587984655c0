//! Bounded pool of chunk workers.
//!
//! The producer feeds chunk offsets into a channel whose capacity equals the
//! worker count. Every worker owns one file handle and one connection,
//! pulls offsets until the channel closes, and stops at its first failure.
//! The producer stops feeding as soon as any worker failed, closes the
//! channel, and waits for every worker to exit before reporting.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::TransferError;
use crate::plan::ChunkPlan;
use crate::progress::TransferProgress;
use crate::source::{ChunkReader, ChunkSource};
use crate::tracker::FailureTracker;
use crate::transport::ChunkTransport;

/// Totals of a successful pool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    pub chunks: u64,
    pub bytes: u64,
}

/// Uploads every chunk of a [`ChunkPlan`] with a fixed number of workers.
pub struct ChunkPool {
    plan: ChunkPlan,
    workers: usize,
    source: Arc<dyn ChunkSource>,
    transport: Arc<dyn ChunkTransport>,
}

impl ChunkPool {
    pub fn new(
        plan: ChunkPlan,
        workers: usize,
        source: Arc<dyn ChunkSource>,
        transport: Arc<dyn ChunkTransport>,
    ) -> Result<Self, TransferError> {
        if workers == 0 {
            return Err(TransferError::InvalidConfig(
                "worker count must be greater than zero".into(),
            ));
        }
        Ok(Self {
            plan,
            workers,
            source,
            transport,
        })
    }

    /// Uploads all chunks into `session_href`.
    ///
    /// Returns the first worker error, if any, only after every worker has
    /// exited and released its file handle and connection.
    pub async fn run(&self, session_href: &str) -> Result<PoolReport, TransferError> {
        let tracker = Arc::new(FailureTracker::new());
        let progress = Arc::new(TransferProgress::new(
            self.plan.file_size(),
            self.plan.chunk_count(),
        ));
        let (tx, rx) = mpsc::channel::<u64>(self.workers);
        let rx = Arc::new(Mutex::new(rx));
        let session: Arc<str> = Arc::from(session_href);

        for id in 0..self.workers {
            tracker.register();
            let guard = ExitGuard::new(tracker.clone());
            let worker = Worker {
                id,
                plan: self.plan,
                session: session.clone(),
                queue: rx.clone(),
                source: self.source.clone(),
                transport: self.transport.clone(),
                progress: progress.clone(),
            };
            tokio::spawn(async move {
                let mut guard = guard;
                guard.result = Some(worker.run().await);
            });
        }
        // Only workers hold the receiver: if they all exit, sends fail.
        drop(rx);

        for offset in self.plan.offsets() {
            if tracker.has_failed() {
                debug!(offset, "worker failed, no longer producing chunks");
                break;
            }
            if tx.send(offset).await.is_err() {
                break;
            }
        }
        drop(tx);

        if let Some(err) = tracker.wait_until_drained().await {
            warn!(error = %err, "chunk upload failed");
            return Err(err);
        }

        Ok(PoolReport {
            chunks: progress.chunks(),
            bytes: progress.bytes(),
        })
    }
}

/// Records the worker's exit when dropped, including on panic.
struct ExitGuard {
    tracker: Arc<FailureTracker>,
    result: Option<Result<(), TransferError>>,
}

impl ExitGuard {
    fn new(tracker: Arc<FailureTracker>) -> Self {
        Self {
            tracker,
            result: None,
        }
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let result = self
            .result
            .take()
            .unwrap_or_else(|| Err(TransferError::Worker("worker exited abnormally".into())));
        self.tracker.record_exit(result);
    }
}

struct Worker {
    id: usize,
    plan: ChunkPlan,
    session: Arc<str>,
    queue: Arc<Mutex<mpsc::Receiver<u64>>>,
    source: Arc<dyn ChunkSource>,
    transport: Arc<dyn ChunkTransport>,
    progress: Arc<TransferProgress>,
}

impl Worker {
    async fn run(self) -> Result<(), TransferError> {
        let mut reader = tokio::task::spawn_blocking({
            let source = self.source.clone();
            move || ChunkReader::open(source.as_ref())
        })
        .await
        .map_err(|e| TransferError::Worker(format!("task join error: {e}")))??;
        let mut conn = self.transport.connect()?;

        loop {
            let next = self.queue.lock().await.recv().await;
            let Some(offset) = next else {
                debug!(worker = self.id, "queue closed, worker done");
                return Ok(());
            };
            let range = self.plan.range(offset);

            let (r, data) = tokio::task::spawn_blocking(move || {
                let data = reader.read_range(range);
                (reader, data)
            })
            .await
            .map_err(|e| TransferError::Worker(format!("task join error: {e}")))?;
            reader = r;
            let data = data?;

            let read = data.len() as u64;
            let sent = conn.put_chunk(&self.session, range, data).await?;
            if sent != read {
                return Err(TransferError::ByteCountMismatch {
                    offset,
                    read,
                    sent,
                });
            }
            self.progress.chunk_done(self.id, range);
        }
    }
}
