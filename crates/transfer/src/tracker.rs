use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::TransferError;

/// Live-worker count plus a write-once error slot shared by a worker pool.
///
/// Workers are registered when spawned and must record exactly one exit.
/// The mutex is never held across an await.
#[derive(Debug, Default)]
pub struct FailureTracker {
    state: Mutex<TrackerState>,
    drained: Notify,
}

#[derive(Debug, Default)]
struct TrackerState {
    live: usize,
    first_error: Option<TransferError>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts a newly spawned worker as live.
    pub fn register(&self) {
        self.lock().live += 1;
    }

    /// Records that a worker exited. Only the first error is kept.
    pub fn record_exit(&self, result: Result<(), TransferError>) {
        let drained = {
            let mut state = self.lock();
            state.live = state.live.saturating_sub(1);
            if let Err(e) = result
                && state.first_error.is_none()
            {
                state.first_error = Some(e);
            }
            state.live == 0
        };
        if drained {
            self.drained.notify_one();
        }
    }

    /// Returns `true` once any worker recorded an error.
    pub fn has_failed(&self) -> bool {
        self.lock().first_error.is_some()
    }

    pub fn live(&self) -> usize {
        self.lock().live
    }

    /// Waits until every registered worker has exited, then hands out the
    /// recorded error, if any.
    pub async fn wait_until_drained(&self) -> Option<TransferError> {
        loop {
            if self.live() == 0 {
                return self.lock().first_error.take();
            }
            self.drained.notified().await;
        }
    }
}
