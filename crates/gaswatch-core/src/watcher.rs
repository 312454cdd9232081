//! Repeats check cycles on a fixed interval

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::runner::PriceCheckRunner;

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Cycles that completed
    pub completed: u64,
    /// Cycles that returned an error
    pub failed: u64,
}

/// Drives a [`PriceCheckRunner`] until shutdown
pub struct Watcher {
    runner: PriceCheckRunner,
    interval: Duration,
    max_runs: Option<u64>,
}

impl Watcher {
    /// Create a watcher that checks every `interval`
    pub fn new(runner: PriceCheckRunner, interval: Duration) -> Self {
        Self {
            runner,
            interval,
            max_runs: None,
        }
    }

    /// Stop after this many cycles
    #[must_use]
    pub fn max_runs(mut self, runs: u64) -> Self {
        self.max_runs = Some(runs);
        self
    }

    /// Run cycles until `shutdown` resolves; the first cycle starts immediately
    ///
    /// Cycle errors are logged and do not stop the loop.
    pub async fn run_until<F>(&self, shutdown: F) -> WatchStats
    where
        F: Future<Output = ()>,
    {
        info!(interval = ?self.interval, "Starting gas price watcher");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut stats = WatchStats::default();

        loop {
            if self
                .max_runs
                .is_some_and(|max| stats.completed + stats.failed >= max)
            {
                debug!("Run limit reached");
                break;
            }

            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    match self.runner.run().await {
                        Ok(report) => {
                            stats.completed += 1;
                            debug!(outcome = ?report.outcome, value = report.observation.value, "Check finished");
                        }
                        Err(e) => {
                            stats.failed += 1;
                            error!(error = %e, "Check failed");
                        }
                    }
                }
            }
        }

        info!(completed = stats.completed, failed = stats.failed, "Watcher stopped");
        stats
    }
}
