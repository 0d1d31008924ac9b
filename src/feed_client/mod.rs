//! Upstream feed API access
//!
//! [`FeedClient`] is the seam between the refresher and the content API.
//! [`RedditClient`] is the production implementation; tests plug in scripted
//! clients instead.
//!
//! Clients never retry. Credential problems surface as [`Error::Auth`],
//! everything else as [`Error::Upstream`] or [`Error::Network`], and the
//! caller decides what a failure means for its cycle.

mod reddit;

pub use reddit::RedditClient;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{Feed, Item, TimeWindow};
use async_trait::async_trait;

/// Lists the current top items of a feed
///
/// # Examples
///
/// ```no_run
/// use feed_harvest::config::ApiConfig;
/// use feed_harvest::feed_client::{FeedClient, RedditClient};
/// use feed_harvest::types::{Feed, TimeWindow};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let api = ApiConfig {
///     client_id: "id".to_string(),
///     client_secret: "secret".to_string(),
///     ..Default::default()
/// };
/// let client = RedditClient::new(&api)?;
/// let items = client
///     .list_top_items(&Feed::new("pics"), TimeWindow::Week, 50)
///     .await?;
/// println!("{} items", items.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// List up to `limit` top items of `feed` over `window`, in upstream order
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] when the credentials or access token are rejected
    /// - [`Error::Upstream`] for error statuses and unusable payloads
    /// - [`Error::Network`] for transport failures
    async fn list_top_items(
        &self,
        feed: &Feed,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Item>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Build the HTTP client shared by API calls and media downloads
///
/// Redirects are followed (reqwest's default policy) and every request is
/// bounded by `api.request_timeout`.
pub fn build_http_client(api: &ApiConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(api.request_timeout)
        .user_agent(api.user_agent.clone())
        .build()
        .map_err(|e| Error::Config {
            message: format!("failed to create HTTP client: {}", e),
            key: None,
        })
}
