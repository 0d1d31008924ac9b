//! Reddit API client (application-only OAuth)

use super::{FeedClient, build_http_client};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{Feed, Item, TimeWindow};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Tokens are refreshed this long before upstream expiry
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Reddit client using the client-credentials grant
///
/// The access token is fetched lazily on the first listing call and reused
/// until shortly before it expires. A 401/403 on a listing call drops the cached
/// token, so the next call authenticates again.
pub struct RedditClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    api_base_url: Url,
    auth_base_url: Url,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

impl RedditClient {
    /// Create a client from API settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(api: &ApiConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(api)?,
            client_id: api.client_id.clone(),
            client_secret: api.client_secret.clone(),
            api_base_url: parse_base_url(&api.api_base_url, "api_base_url")?,
            auth_base_url: parse_base_url(&api.auth_base_url, "auth_base_url")?,
            token: Mutex::new(None),
        })
    }

    /// Return a valid access token, authenticating if needed
    ///
    /// The lock is held across the token request so concurrent feeds share a
    /// single authentication round-trip.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref()
            && token.is_fresh()
        {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        self.token.lock().await.take();
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let url = join_path(&self.auth_base_url, &["api", "v1", "access_token"])?;
        debug!(%url, "Requesting access token");

        let response = self
            .http
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!(
                "token request rejected with HTTP {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "token request returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("malformed token response: {}", e)))?;

        match body {
            TokenResponse {
                access_token: Some(value),
                error: None,
                expires_in,
            } => {
                let lifetime = Duration::from_secs(expires_in.unwrap_or(3600));
                info!(expires_in_secs = lifetime.as_secs(), "Obtained access token");
                Ok(AccessToken {
                    value,
                    expires_at: Instant::now() + lifetime,
                })
            }
            TokenResponse { error, .. } => Err(Error::Auth(format!(
                "token request refused: {}",
                error.map(|e| e.to_string()).unwrap_or_else(|| "no token".to_string())
            ))),
        }
    }
}

#[async_trait]
impl FeedClient for RedditClient {
    async fn list_top_items(
        &self,
        feed: &Feed,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Item>> {
        let token = self.access_token().await?;
        let url = join_path(&self.api_base_url, &["r", feed.name(), "top"])?;
        let limit = limit.to_string();

        debug!(feed = %feed, %window, %limit, "Listing top items");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("t", window.as_str()),
                ("limit", limit.as_str()),
                ("raw_json", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.invalidate_token().await;
            return Err(Error::Auth(format!(
                "listing for {} rejected with HTTP {}",
                feed,
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "listing for {} returned HTTP {}",
                feed,
                status.as_u16()
            )));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("malformed listing for {}: {}", feed, e)))?;

        let items: Vec<Item> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into_item())
            .collect();

        if items.iter().any(|item| !item.is_self && item.url.is_empty()) {
            warn!(feed = %feed, "Listing contains link posts without a URL");
        }
        info!(feed = %feed, count = items.len(), "Listed top items");
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

fn parse_base_url(raw: &str, key: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::config(format!("invalid {}: {}", key, e), key))?;
    if url.cannot_be_a_base() {
        return Err(Error::config(format!("{} cannot be a base URL", key), key));
    }
    Ok(url)
}

fn join_path(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Upstream(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Deserialize)]
struct Post {
    id: String,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    media: Option<Media>,
    #[serde(default)]
    secure_media: Option<Media>,
}

#[derive(Deserialize)]
struct Media {
    #[serde(default)]
    reddit_video: Option<RedditVideo>,
}

#[derive(Deserialize)]
struct RedditVideo {
    #[serde(default)]
    fallback_url: Option<String>,
}

impl Post {
    fn into_item(self) -> Item {
        let fallback_url = [self.media, self.secure_media]
            .into_iter()
            .flatten()
            .filter_map(|media| media.reddit_video)
            .find_map(|video| video.fallback_url);

        Item {
            id: self.id,
            is_self: self.is_self,
            url: self.url.unwrap_or_default(),
            fallback_url,
        }
    }
}
