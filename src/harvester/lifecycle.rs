//! Startup and shutdown coordination.

use super::Harvester;
use crate::refresh_scheduler::RefreshScheduler;
use crate::types::Event;
use std::time::Duration;

/// Longest wait for a running cycle on shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl Harvester {
    /// Spawn the refresh scheduler on the current runtime
    ///
    /// The first cycle starts immediately. Returns `false` (and spawns
    /// nothing) if the scheduler is already running or shutdown has begun.
    pub async fn spawn_scheduler(&self) -> bool {
        let mut handle = self.scheduler_handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::warn!("Refresh scheduler already running");
            return false;
        }
        if self.cancel_token.is_cancelled() {
            tracing::warn!("Harvester is shut down, not starting scheduler");
            return false;
        }

        let scheduler = RefreshScheduler::new(
            self.refresher.clone(),
            self.config.harvest.feeds.clone(),
            self.config.harvest.refresh_interval,
            self.trigger.clone(),
            self.cancel_token.clone(),
        );
        *handle = Some(tokio::spawn(scheduler.run()));
        true
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Stop the scheduler
    ///
    /// A cycle in progress is allowed to finish (bounded by a 30 second
    /// timeout); no new cycle starts afterwards. Emits [`Event::Shutdown`].
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");
        self.cancel_token.cancel();

        let handle = self.scheduler_handle.lock().await.take();
        if let Some(handle) = handle {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => tracing::info!("Refresh scheduler stopped"),
                Ok(Err(e)) => tracing::error!(error = %e, "Refresh scheduler task failed"),
                Err(_) => tracing::warn!("Timeout waiting for refresh cycle, proceeding with shutdown"),
            }
        }

        let _ = self.event_tx.send(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
    }
}
