//! Core types for feed-harvest

use crate::error::{Error, ErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of an upstream content feed (a subreddit)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feed(String);

impl Feed {
    /// Create a new Feed
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the feed name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Feed {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Feed {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for Feed {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One piece of upstream content listed by a feed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Upstream item id, used as the cached file stem
    pub id: String,

    /// Text-only post with nothing to download
    pub is_self: bool,

    /// Source URL of the item
    pub url: String,

    /// Direct media URL for embedded-video items, when the upstream provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}

/// Time window for "top" listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Past hour
    Hour,
    /// Past 24 hours
    Day,
    /// Past week
    #[default]
    Week,
    /// Past month
    Month,
    /// Past year
    Year,
    /// All time
    All,
}

impl TimeWindow {
    /// Value of the `t` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeWindow::Hour),
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "year" => Ok(TimeWindow::Year),
            "all" => Ok(TimeWindow::All),
            other => Err(Error::Config {
                message: format!("unknown time window '{}'", other),
                key: None,
            }),
        }
    }
}

/// A single item that could not be cached
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Upstream item id
    pub item_id: String,
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl ItemFailure {
    /// Record a failure for an item
    pub fn new(item_id: impl Into<String>, error: &Error) -> Self {
        Self {
            item_id: item_id.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Failure that stopped a whole feed's refresh
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFailure {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl From<&Error> for FeedFailure {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of refreshing one feed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedResult {
    /// The feed that was refreshed
    pub feed: Feed,
    /// Number of downloadable (non-self) items attempted
    pub attempted: usize,
    /// Number of items written to the cache
    pub succeeded: usize,
    /// Number of self/text-only items skipped
    pub skipped_self: usize,
    /// Number of items skipped for an unsupported content type
    pub unsupported: usize,
    /// Items that failed to download
    pub failures: Vec<ItemFailure>,
    /// Set when the feed could not be refreshed at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_error: Option<FeedFailure>,
}

impl FeedResult {
    /// Create an empty result for a feed
    pub fn new(feed: Feed) -> Self {
        Self {
            feed,
            attempted: 0,
            succeeded: 0,
            skipped_self: 0,
            unsupported: 0,
            failures: Vec::new(),
            feed_error: None,
        }
    }

    /// Whether the feed-level step (clear + listing) succeeded
    pub fn is_ok(&self) -> bool {
        self.feed_error.is_none()
    }
}

/// Outcome of one refresh cycle across all feeds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleReport {
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// When the cycle finished
    pub finished_at: DateTime<Utc>,
    /// Per-feed results, in configured feed order
    pub feeds: Vec<FeedResult>,
    /// Number of files in the cache after the cycle
    pub total_cached: usize,
}

impl CycleReport {
    /// Total items written across all feeds
    pub fn succeeded(&self) -> usize {
        self.feeds.iter().map(|f| f.succeeded).sum()
    }

    /// Total item failures across all feeds
    pub fn failed(&self) -> usize {
        self.feeds.iter().map(|f| f.failures.len()).sum()
    }

    /// Look up the result for a feed
    pub fn feed(&self, feed: &Feed) -> Option<&FeedResult> {
        self.feeds.iter().find(|f| &f.feed == feed)
    }
}

/// Event emitted by the harvester
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A refresh cycle started
    CycleStarted {
        /// Number of feeds in the cycle
        feeds: usize,
    },

    /// One feed finished refreshing
    FeedRefreshed {
        /// The feed's result
        result: FeedResult,
    },

    /// A refresh cycle finished
    CycleCompleted {
        /// Items written across all feeds
        succeeded: usize,
        /// Item failures across all feeds
        failed: usize,
        /// Files in the cache after the cycle
        total_cached: usize,
    },

    /// A refresh cycle was skipped before touching any feed
    CycleSkipped {
        /// Why the cycle was skipped
        reason: String,
    },

    /// Harvester is shutting down
    Shutdown,
}
