//! Error types for feed-harvest
//!
//! This module provides the error taxonomy shared by every stage of the
//! harvest pipeline:
//! - Startup errors (configuration) that stop the process
//! - Feed-level errors (authentication, upstream API failures) that end one
//!   feed's refresh cycle without touching the others
//! - Item-level errors (HTTP status, truncated bodies, unsupported content)
//!   that are recorded and skipped
//! - Filesystem errors on the cache tree
//!
//! [`ErrorKind`] is a `Copy` classification used when errors are aggregated
//! into [`FeedResult`](crate::types::FeedResult) values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for feed-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for feed-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "MEME_DOWNLOAD_DIR")
        key: Option<String>,
    },

    /// The feed API rejected our credentials or access token
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The feed API answered, but not with something we can use
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A media host answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response declared a content type we do not cache
    #[error("unsupported content type: {content_type}")]
    UnsupportedContent {
        /// The declared content type ("" when the header was missing)
        content_type: String,
    },

    /// The body ended before the declared Content-Length was received
    #[error("truncated body: expected {expected} bytes, received {received}")]
    TruncatedBody {
        /// Bytes announced by Content-Length
        expected: u64,
        /// Bytes actually received
        received: u64,
    },

    /// The response body was empty
    #[error("empty response body from {0}")]
    EmptyBody(String),

    /// Filesystem operation on a cache path failed
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// The path being operated on
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache root directory does not exist
    #[error("cache root {0} does not exist")]
    CacheRootMissing(PathBuf),
}

/// Coarse classification of an [`Error`], used for aggregation and policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or missing configuration (fatal at startup)
    Config,
    /// Credentials rejected (fatal for the affected feed's cycle)
    Auth,
    /// Upstream returned an error status or an unusable payload
    Upstream,
    /// Transport failure or incomplete body
    Network,
    /// Content type not cached (expected, skipped)
    UnsupportedContent,
    /// Cache directory could not be cleared, created or written
    Filesystem,
}

impl Error {
    /// Create a configuration error tied to a specific setting
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. } => ErrorKind::Config,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Upstream(_) | Error::HttpStatus { .. } => ErrorKind::Upstream,
            Error::Network(_) | Error::TruncatedBody { .. } | Error::EmptyBody(_) => {
                ErrorKind::Network
            }
            Error::UnsupportedContent { .. } => ErrorKind::UnsupportedContent,
            Error::Filesystem { .. } | Error::CacheRootMissing(_) => ErrorKind::Filesystem,
        }
    }

    /// Returns true for errors that mean "skip this item", not "this item failed"
    pub fn is_skip(&self) -> bool {
        matches!(self.kind(), ErrorKind::UnsupportedContent)
    }

    /// Returns true for errors that should stop the process
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config)
    }
}
