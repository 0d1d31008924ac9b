//! Test configuration helpers for building harvesters over temporary caches

use feed_harvest::config::{
    CACHE_DIR_ENV, CLIENT_ID_ENV, CLIENT_SECRET_ENV, FEED_LIST_ENV, HarvestConfig,
};
use feed_harvest::{Config, Feed, FeedClient, Harvester};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Configuration over `cache_dir` for the given feeds (no credentials)
pub fn test_config(cache_dir: &Path, feeds: &[&str]) -> Config {
    Config {
        harvest: HarvestConfig {
            feeds: feeds.iter().map(|f| Feed::new(*f)).collect(),
            cache_dir: cache_dir.to_path_buf(),
            max_concurrent_downloads: 2,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Harvester over a fresh temporary cache root, driven by `client`
///
/// The TempDir must be kept alive for the duration of the test.
pub fn create_test_harvester(
    feeds: &[&str],
    client: Arc<dyn FeedClient>,
) -> (Harvester, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let harvester =
        Harvester::with_feed_client(test_config(temp_dir.path(), feeds), client).unwrap();
    (harvester, temp_dir)
}

/// Check if live Reddit credentials are available (.env or process environment)
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    [CLIENT_ID_ENV, CLIENT_SECRET_ENV]
        .iter()
        .all(|key| std::env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false))
}

/// Load live configuration, overriding the feed list and cache root
pub fn live_config(cache_dir: &Path, feeds: &str) -> Config {
    dotenvy::dotenv().ok();
    Config::from_lookup(|key| match key {
        FEED_LIST_ENV => Some(feeds.to_string()),
        CACHE_DIR_ENV => Some(cache_dir.display().to_string()),
        other => std::env::var(other).ok(),
    })
    .unwrap()
}
