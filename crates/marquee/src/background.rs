//! Registry for fire-and-forget session work.
//!
//! The session manager spawns follow-up work (identity refresh after start or
//! login) here so callers can wait for it to settle before exiting.

// std::sync::Mutex is correct here: the lock is never held across .await points.
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A spawned task together with the label it was registered under.
struct Tracked {
    label: &'static str,
    handle: JoinHandle<()>,
}

/// Tracks spawned tasks so they can be awaited before exit.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tracked: Arc<Mutex<Vec<Tracked>>>,
}

impl BackgroundTasks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` and register it under `label`.
    ///
    /// The handle is recorded before this returns, so a task that finishes
    /// immediately is still observed by [`settle`](Self::settle).
    pub fn spawn<F>(&self, label: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);

        let mut guard = self.tracked.lock().expect("mutex poisoned");
        guard.retain(|t| !t.handle.is_finished());
        guard.push(Tracked { label, handle });
    }

    /// Wait until every registered task has finished.
    ///
    /// Tasks spawned while waiting are awaited as well.
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.tracked.lock().expect("mutex poisoned"));
            if batch.is_empty() {
                return;
            }

            debug!(count = batch.len(), "Waiting for background tasks");
            for Tracked { label, handle } in batch {
                if let Err(e) = handle.await {
                    warn!(task = label, error = %e, "Background task failed");
                }
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        let mut guard = self.tracked.lock().expect("mutex poisoned");
        guard.retain(|t| !t.handle.is_finished());
        guard.len()
    }
}
