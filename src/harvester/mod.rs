//! The harvester: configuration, refresh pipeline and serving path in one handle
//!
//! A [`Harvester`] is cheap to clone; every clone shares the same event
//! channel, refresh trigger and shutdown token. The scheduler task and any
//! number of consumers can each hold one.

mod lifecycle;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::Result;
use crate::feed_client::{FeedClient, RedditClient, build_http_client};
use crate::item_downloader::ItemDownloader;
use crate::refresher::FeedRefresher;
use crate::selector::RandomSelector;
use crate::types::{CycleReport, Event, Feed, FeedResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Main harvester instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Harvester {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Refresh pipeline shared by the scheduler and manual refreshes
    pub(crate) refresher: FeedRefresher,
    /// Random pick over the cache for the serving path
    pub(crate) selector: RandomSelector,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Wakes the scheduler for an immediate cycle
    pub(crate) trigger: Arc<Notify>,
    /// Cancelled on shutdown
    pub(crate) cancel_token: CancellationToken,
    /// Handle of the spawned scheduler task, if any
    pub(crate) scheduler_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Harvester {
    /// Create a harvester talking to the Reddit API
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration
    /// does not validate or the HTTP clients cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client: Arc<dyn FeedClient> = Arc::new(RedditClient::new(&config.api)?);
        Self::with_feed_client(config, client)
    }

    /// Create a harvester with a custom feed client
    ///
    /// The configuration is used as given; only media downloads use the
    /// API settings (timeout and user agent).
    pub fn with_feed_client(config: Config, client: Arc<dyn FeedClient>) -> Result<Self> {
        let http = build_http_client(&config.api)?;
        let store = CacheStore::new(&config.harvest.cache_dir);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let refresher = FeedRefresher::new(
            client.clone(),
            ItemDownloader::new(http),
            store.clone(),
            &config.harvest,
        )
        .with_events(event_tx.clone());

        info!(
            client = client.name(),
            feeds = config.harvest.feeds.len(),
            cache_dir = %store.root().display(),
            "Harvester created"
        );

        Ok(Self {
            config: Arc::new(config),
            refresher,
            selector: RandomSelector::new(store),
            event_tx,
            trigger: Arc::new(Notify::new()),
            cancel_token: CancellationToken::new(),
            scheduler_handle: Arc::new(Mutex::new(None)),
        })
    }

    /// The configuration this harvester runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The cache store refreshes write to
    pub fn store(&self) -> &CacheStore {
        self.refresher.store()
    }

    /// Subscribe to harvester events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Pick a random cached file, or `None` when the cache is empty
    ///
    /// The directory walk runs on the blocking pool, so this never stalls the
    /// runtime and never waits for a refresh in progress.
    pub async fn random_cached_file(&self) -> Option<PathBuf> {
        let selector = self.selector.clone();
        match tokio::task::spawn_blocking(move || selector.pick()).await {
            Ok(pick) => pick,
            Err(e) => {
                warn!(error = %e, "Random pick task failed");
                None
            }
        }
    }

    /// Ask the scheduler to run a cycle now
    ///
    /// Returns immediately. Has no effect until the scheduler is spawned; a
    /// trigger that arrives mid-cycle runs one more cycle afterwards.
    pub fn trigger_manual_refresh(&self) {
        info!("Manual refresh requested");
        self.trigger.notify_one();
    }

    /// Run a full refresh cycle on the current task
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheRootMissing`](crate::Error::CacheRootMissing) if the
    /// cache root does not exist.
    pub async fn refresh_now(&self) -> Result<CycleReport> {
        self.refresher.refresh_all(&self.config.harvest.feeds).await
    }

    /// Refresh a single feed on the current task
    pub async fn refresh_feed(&self, feed: &Feed) -> FeedResult {
        self.refresher.refresh_feed(feed).await
    }
}
