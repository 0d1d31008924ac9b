//! Configuration types for feed-harvest
//!
//! Configuration can be built in code (every field has a default except the
//! credentials and feed list) or loaded from the process environment with
//! [`Config::from_env`]. Loaded configuration is always validated; any
//! missing or invalid required value is a [`Error::Config`].

use crate::error::{Error, Result};
use crate::types::{Feed, TimeWindow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use tracing::info;

/// Environment variable holding the feed API client id
pub const CLIENT_ID_ENV: &str = "REDDIT_API_CLIENT_ID";
/// Environment variable holding the feed API client secret
pub const CLIENT_SECRET_ENV: &str = "REDDIT_API_CLIENT_SECRET";
/// Environment variable holding the comma-separated feed list
pub const FEED_LIST_ENV: &str = "SUBREDDIT_SCRAPE_LIST";
/// Environment variable holding the cache root directory
pub const CACHE_DIR_ENV: &str = "MEME_DOWNLOAD_DIR";
/// Optional: refresh interval in seconds
pub const REFRESH_INTERVAL_ENV: &str = "REFRESH_INTERVAL_SECS";
/// Optional: listing time window (hour, day, week, month, year, all)
pub const TIME_WINDOW_ENV: &str = "REDDIT_TIME_WINDOW";
/// Optional: number of top items to list per feed
pub const ITEM_LIMIT_ENV: &str = "REDDIT_ITEM_LIMIT";

/// Largest listing page the upstream API serves
pub const MAX_ITEM_LIMIT: u32 = 100;

/// Feed API access settings
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// OAuth client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Base URL for listing calls (default: "https://oauth.reddit.com")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL for token requests (default: "https://www.reddit.com")
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,

    /// Timeout applied to every HTTP request, API and media alike (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: default_user_agent(),
            api_base_url: default_api_base_url(),
            auth_base_url: default_auth_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

// Hand-written so the secret never reaches a log line
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("user_agent", &self.user_agent)
            .field("api_base_url", &self.api_base_url)
            .field("auth_base_url", &self.auth_base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// What to harvest, where to put it, and how often
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Feeds to harvest, de-duplicated, in order of first appearance
    #[serde(default)]
    pub feeds: Vec<Feed>,

    /// Cache root; must already exist (default: "./cache")
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Time between refresh cycles (default: 1 day)
    #[serde(default = "default_refresh_interval", with = "duration_serde")]
    pub refresh_interval: Duration,

    /// Listing window for top items (default: week)
    #[serde(default)]
    pub time_window: TimeWindow,

    /// Top items to list per feed (default: 50, max 100)
    #[serde(default = "default_item_limit")]
    pub item_limit: u32,

    /// Item downloads in flight per feed (default: 4)
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            cache_dir: default_cache_dir(),
            refresh_interval: default_refresh_interval(),
            time_window: TimeWindow::default(),
            item_limit: default_item_limit(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
        }
    }
}

/// Main configuration for [`Harvester`](crate::Harvester)
///
/// Sub-configs are flattened for serialization, so the JSON form is a single
/// flat object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed API access
    #[serde(flatten)]
    pub api: ApiConfig,

    /// Harvest behavior
    #[serde(flatten)]
    pub harvest: HarvestConfig,
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// Required: [`CLIENT_ID_ENV`], [`CLIENT_SECRET_ENV`], [`FEED_LIST_ENV`],
    /// [`CACHE_DIR_ENV`]. Optional: [`REFRESH_INTERVAL_ENV`], [`TIME_WINDOW_ENV`],
    /// [`ITEM_LIMIT_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing, empty or invalid variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => Err(Error::config(
                    format!("missing required environment variable: {}", key),
                    key,
                )),
            }
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Config {
            api: ApiConfig {
                client_id: required(CLIENT_ID_ENV)?,
                client_secret: required(CLIENT_SECRET_ENV)?,
                ..ApiConfig::default()
            },
            harvest: HarvestConfig {
                feeds: parse_feed_list(&required(FEED_LIST_ENV)?),
                cache_dir: PathBuf::from(required(CACHE_DIR_ENV)?),
                ..HarvestConfig::default()
            },
        };

        if let Some(raw) = optional(REFRESH_INTERVAL_ENV) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                Error::config(
                    format!("invalid refresh interval '{}': {}", raw, e),
                    REFRESH_INTERVAL_ENV,
                )
            })?;
            config.harvest.refresh_interval = Duration::from_secs(secs);
        }

        if let Some(raw) = optional(TIME_WINDOW_ENV) {
            config.harvest.time_window = raw.parse().map_err(|_| {
                Error::config(format!("invalid time window '{}'", raw), TIME_WINDOW_ENV)
            })?;
        }

        if let Some(raw) = optional(ITEM_LIMIT_ENV) {
            config.harvest.item_limit = raw.trim().parse::<u32>().map_err(|e| {
                Error::config(format!("invalid item limit '{}': {}", raw, e), ITEM_LIMIT_ENV)
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api.client_id.trim().is_empty() {
            return Err(Error::config("client id must not be empty", CLIENT_ID_ENV));
        }
        if self.api.client_secret.trim().is_empty() {
            return Err(Error::config(
                "client secret must not be empty",
                CLIENT_SECRET_ENV,
            ));
        }
        if self.harvest.feeds.is_empty() {
            return Err(Error::config("at least one feed is required", FEED_LIST_ENV));
        }

        let name_pattern = Regex::new(r"^[A-Za-z0-9_]{2,21}$")
            .map_err(|e| Error::config(format!("feed name pattern: {}", e), FEED_LIST_ENV))?;
        if let Some(bad) = self
            .harvest
            .feeds
            .iter()
            .find(|feed| !name_pattern.is_match(feed.name()))
        {
            return Err(Error::config(
                format!("invalid feed name '{}'", bad),
                FEED_LIST_ENV,
            ));
        }

        if self.harvest.cache_dir.as_os_str().is_empty() {
            return Err(Error::config("cache directory must not be empty", CACHE_DIR_ENV));
        }
        if self.harvest.refresh_interval.is_zero() {
            return Err(Error::config(
                "refresh interval must be greater than zero",
                REFRESH_INTERVAL_ENV,
            ));
        }
        if self.harvest.item_limit == 0 || self.harvest.item_limit > MAX_ITEM_LIMIT {
            return Err(Error::config(
                format!(
                    "item limit must be between 1 and {}, got {}",
                    MAX_ITEM_LIMIT, self.harvest.item_limit
                ),
                ITEM_LIMIT_ENV,
            ));
        }
        if self.harvest.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be greater than zero".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        Ok(())
    }

    /// Log the effective configuration, secrets redacted
    pub fn log_summary(&self) {
        info!(
            client_id = %self.api.client_id,
            client_secret = %redact(&self.api.client_secret),
            feeds = ?self.harvest.feeds.iter().map(Feed::name).collect::<Vec<_>>(),
            cache_dir = %self.harvest.cache_dir.display(),
            refresh_interval = ?self.harvest.refresh_interval,
            time_window = %self.harvest.time_window,
            item_limit = self.harvest.item_limit,
            "Loaded configuration"
        );
    }
}

/// Split a comma-separated feed list, dropping blanks and duplicates
///
/// Order of first appearance is preserved.
pub fn parse_feed_list(raw: &str) -> Vec<Feed> {
    let mut feeds: Vec<Feed> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !feeds.iter().any(|f| f.name() == name) {
            feeds.push(Feed::new(name));
        }
    }
    feeds
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "***" }
}

fn default_user_agent() -> String {
    format!("feed-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_api_base_url() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_auth_base_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(24 * 60 * 60) // 1 day
}

fn default_item_limit() -> u32 {
    50
}

fn default_max_concurrent_downloads() -> usize {
    4
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
