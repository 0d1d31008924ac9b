//! # feed-harvest
//!
//! Keeps a local cache of the top media posts of a set of subreddits and
//! serves random picks from it.
//!
//! ## How it works
//!
//! - A background scheduler refreshes every configured feed once at startup
//!   and then on a fixed interval (one day by default)
//! - Each refresh clears the feed's cache directory, lists the feed's top
//!   items and downloads every JPEG, PNG, GIF or MP4 among them
//! - Consumers ask for a random cached file at any time; the pick reflects
//!   whatever complete files exist at that moment
//!
//! ## Quick Start
//!
//! ```no_run
//! use feed_harvest::{Config, Harvester};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let harvester = Harvester::new(config)?;
//!
//!     // First cycle starts right away
//!     harvester.spawn_scheduler().await;
//!
//!     if let Some(path) = harvester.random_cached_file().await {
//!         println!("{}", path.display());
//!     }
//!
//!     harvester.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Cache directory layout and enumeration
pub mod cache;
/// Content-type classification
pub mod classifier;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Upstream feed API clients
pub mod feed_client;
/// Harvester handle tying the pipeline together
pub mod harvester;
/// Single-item media download
pub mod item_downloader;
/// Periodic refresh scheduling
pub mod refresh_scheduler;
/// Per-feed refresh cycle
pub mod refresher;
/// Random selection over the cache
pub mod selector;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use cache::CacheStore;
pub use config::{ApiConfig, Config, HarvestConfig};
pub use error::{Error, ErrorKind, Result};
pub use feed_client::{FeedClient, RedditClient};
pub use harvester::Harvester;
pub use item_downloader::ItemDownloader;
pub use refresher::FeedRefresher;
pub use selector::{RandomSelector, random_cached_file};
pub use types::{CycleReport, Event, Feed, FeedResult, Item, ItemFailure, TimeWindow};

/// Helper function to run the harvester with graceful signal handling.
///
/// Waits for a termination signal and then calls the harvester's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use feed_harvest::{Config, Harvester, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let harvester = Harvester::new(Config::from_env()?)?;
///     harvester.spawn_scheduler().await;
///
///     // Run with automatic signal handling
///     run_with_shutdown(harvester).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(harvester: Harvester) {
    wait_for_signal().await;
    harvester.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register both signal handlers, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
