//! Per-feed refresh cycle
//!
//! A refresh clears the feed's directory, lists the feed's current top items
//! and downloads every downloadable one. Each feed owns its directory, so
//! different feeds refresh concurrently without coordination, while two
//! refreshes of the same feed (a scheduled cycle and a manual one, say) run
//! one after the other. No failure inside one
//! feed's refresh reaches another feed or the caller: everything is
//! recorded in the returned [`FeedResult`].

use crate::cache::CacheStore;
use crate::config::HarvestConfig;
use crate::error::{Error, Result};
use crate::feed_client::FeedClient;
use crate::item_downloader::ItemDownloader;
use crate::types::{CycleReport, Event, Feed, FeedFailure, FeedResult, Item, ItemFailure, TimeWindow};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

/// Runs refresh cycles for a set of feeds
#[derive(Clone)]
pub struct FeedRefresher {
    client: Arc<dyn FeedClient>,
    downloader: ItemDownloader,
    store: CacheStore,
    window: TimeWindow,
    limit: u32,
    max_concurrent_downloads: usize,
    event_tx: Option<broadcast::Sender<Event>>,
    /// One lock per feed, held for a whole clear-and-populate
    feed_locks: Arc<Mutex<HashMap<Feed, Arc<Mutex<()>>>>>,
}

impl FeedRefresher {
    /// Create a refresher using the listing and download settings of `config`
    pub fn new(
        client: Arc<dyn FeedClient>,
        downloader: ItemDownloader,
        store: CacheStore,
        config: &HarvestConfig,
    ) -> Self {
        Self {
            client,
            downloader,
            store,
            window: config.time_window,
            limit: config.item_limit,
            max_concurrent_downloads: config.max_concurrent_downloads.max(1),
            event_tx: None,
            feed_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Publish progress events on `event_tx`
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// The cache store this refresher writes to
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Refresh every feed concurrently
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheRootMissing`] without touching any feed when the
    /// cache root does not exist. Per-feed failures are reported in the
    /// [`CycleReport`], never as an error.
    pub async fn refresh_all(&self, feeds: &[Feed]) -> Result<CycleReport> {
        if !self.store.root_exists() {
            let err = Error::CacheRootMissing(self.store.root().to_path_buf());
            error!(error = %err, "Skipping refresh cycle");
            self.emit_event(Event::CycleSkipped {
                reason: err.to_string(),
            });
            return Err(err);
        }

        let started_at = Utc::now();
        info!(feeds = feeds.len(), client = self.client.name(), "Starting refresh cycle");
        self.emit_event(Event::CycleStarted { feeds: feeds.len() });

        let results = futures::future::join_all(feeds.iter().map(|feed| self.refresh_feed(feed))).await;

        let store = self.store.clone();
        let total_cached = tokio::task::spawn_blocking(move || store.enumerate().len())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to count cached files");
                0
            });

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            feeds: results,
            total_cached,
        };

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            total_cached,
            "Downloaded {} files",
            total_cached
        );
        self.emit_event(Event::CycleCompleted {
            succeeded: report.succeeded(),
            failed: report.failed(),
            total_cached,
        });

        Ok(report)
    }

    /// Clear and repopulate one feed's directory
    ///
    /// Waits for any refresh of the same feed already in progress, so a
    /// feed's directory only ever holds the items of a single cycle.
    pub async fn refresh_feed(&self, feed: &Feed) -> FeedResult {
        let lock = self.feed_lock(feed).await;
        let _guard = lock.lock().await;

        let mut result = FeedResult::new(feed.clone());

        match self.populate(feed, &mut result).await {
            Ok(()) => info!(
                feed = %feed,
                attempted = result.attempted,
                succeeded = result.succeeded,
                unsupported = result.unsupported,
                failed = result.failures.len(),
                "Refreshed feed"
            ),
            Err(e) => {
                error!(feed = %feed, error = %e, "Feed refresh failed");
                result.feed_error = Some(FeedFailure::from(&e));
            }
        }

        self.emit_event(Event::FeedRefreshed {
            result: result.clone(),
        });
        result
    }

    async fn feed_lock(&self, feed: &Feed) -> Arc<Mutex<()>> {
        self.feed_locks
            .lock()
            .await
            .entry(feed.clone())
            .or_default()
            .clone()
    }

    async fn populate(&self, feed: &Feed, result: &mut FeedResult) -> Result<()> {
        let dir = self.store.clear(feed).await?;

        let items = self.client.list_top_items(feed, self.window, self.limit).await?;

        let (self_posts, downloadable): (Vec<Item>, Vec<Item>) =
            items.into_iter().partition(|item| item.is_self);
        result.skipped_self = self_posts.len();
        result.attempted = downloadable.len();
        debug!(
            feed = %feed,
            downloadable = downloadable.len(),
            skipped_self = self_posts.len(),
            "Listed feed"
        );

        let outcomes: Vec<(String, Result<PathBuf>)> = stream::iter(downloadable)
            .map(|item| self.download_one(item, &dir))
            .buffer_unordered(self.max_concurrent_downloads)
            .collect()
            .await;

        for (item_id, outcome) in outcomes {
            match outcome {
                Ok(_) => result.succeeded += 1,
                Err(e) if e.is_skip() => {
                    debug!(feed = %feed, item_id = %item_id, error = %e, "Skipping item");
                    result.unsupported += 1;
                }
                Err(e) => {
                    warn!(feed = %feed, item_id = %item_id, error = %e, "Failed to cache item");
                    result.failures.push(ItemFailure::new(item_id, &e));
                }
            }
        }

        Ok(())
    }

    async fn download_one(&self, item: Item, dir: &Path) -> (String, Result<PathBuf>) {
        let outcome = self.downloader.download(&item, dir).await;
        (item.id, outcome)
    }

    fn emit_event(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            // No subscribers is fine
            tx.send(event).ok();
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
