//! Periodic refresh scheduling
//!
//! The scheduler runs one cycle as soon as it starts, then one per
//! configured interval. A manual trigger runs an extra cycle right away.
//! Cycles never overlap: a trigger or tick that arrives mid-cycle is served
//! once the running cycle finishes. Cancellation is observed between cycles
//! only, so a running cycle always completes.

use crate::refresher::FeedRefresher;
use crate::types::Feed;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Why a cycle was started
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CycleCause {
    Scheduled,
    Manual,
}

/// Background loop driving [`FeedRefresher::refresh_all`]
pub struct RefreshScheduler {
    refresher: FeedRefresher,
    feeds: Vec<Feed>,
    interval: Duration,
    trigger: Arc<Notify>,
    cancel_token: CancellationToken,
}

impl RefreshScheduler {
    /// Create a scheduler for `feeds`
    ///
    /// `trigger` wakes the loop for an immediate cycle; cancelling
    /// `cancel_token` ends it after the current cycle.
    pub fn new(
        refresher: FeedRefresher,
        feeds: Vec<Feed>,
        interval: Duration,
        trigger: Arc<Notify>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            refresher,
            feeds,
            interval,
            trigger,
            cancel_token,
        }
    }

    /// Run until cancelled
    pub async fn run(self) {
        info!(
            feeds = self.feeds.len(),
            interval_secs = self.interval.as_secs(),
            "Refresh scheduler started"
        );

        // The first tick completes immediately. A zero period would panic.
        let mut interval = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let cause = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                _ = interval.tick() => CycleCause::Scheduled,
                _ = self.trigger.notified() => CycleCause::Manual,
            };

            self.run_cycle(cause).await;
        }

        info!("Refresh scheduler stopped");
    }

    async fn run_cycle(&self, cause: CycleCause) {
        debug!(?cause, "Refresh cycle due");
        match self.refresher.refresh_all(&self.feeds).await {
            Ok(report) => debug!(
                ?cause,
                succeeded = report.succeeded(),
                failed = report.failed(),
                "Refresh cycle finished"
            ),
            Err(e) => error!(?cause, error = %e, "Refresh cycle did not run"),
        }
    }
}
