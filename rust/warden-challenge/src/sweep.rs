//! Periodic background eviction.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running sweep task.
///
/// The task is aborted on [`Sweeper::stop`] or when the handle is dropped,
/// so a store never leaks its background task past its owner's lifetime.
#[derive(Debug)]
pub struct Sweeper {
    task: JoinHandle<()>,
}

impl Sweeper {
    pub(crate) fn spawn<F>(every: Duration, mut sweep: F) -> Self
    where
        F: FnMut() -> usize + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the sweep
            // cadence starts one full interval out.
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = sweep();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired entries");
                }
            }
        });
        Self { task }
    }

    /// Stop the background sweep.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}
