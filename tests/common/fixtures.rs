//! Scripted feed client and media server fixtures

use async_trait::async_trait;
use feed_harvest::{Error, Feed, FeedClient, Item, Result, TimeWindow};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Canned answer for one feed
#[derive(Clone)]
pub enum Scripted {
    /// List these items
    Items(Vec<Item>),
    /// Fail as if the token was rejected
    Auth,
    /// Fail as if the API returned a server error
    Upstream,
}

/// Feed client answering from a fixed table
#[derive(Default)]
pub struct ScriptedClient {
    listings: Mutex<HashMap<String, Scripted>>,
}

impl ScriptedClient {
    /// Set the answer for `feed`
    pub fn with(self, feed: &str, scripted: Scripted) -> Self {
        self.set(feed, scripted);
        self
    }

    /// Replace the answer for `feed` (takes effect on the next listing)
    pub fn set(&self, feed: &str, scripted: Scripted) {
        self.listings
            .lock()
            .unwrap()
            .insert(feed.to_string(), scripted);
    }
}

#[async_trait]
impl FeedClient for ScriptedClient {
    async fn list_top_items(
        &self,
        feed: &Feed,
        _window: TimeWindow,
        _limit: u32,
    ) -> Result<Vec<Item>> {
        let scripted = self.listings.lock().unwrap().get(feed.name()).cloned();
        match scripted {
            Some(Scripted::Items(items)) => Ok(items),
            Some(Scripted::Auth) => Err(Error::Auth("HTTP 401".to_string())),
            Some(Scripted::Upstream) | None => Err(Error::Upstream("HTTP 500".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Downloadable item pointing at `url`
pub fn media_item(id: &str, url: String) -> Item {
    Item {
        id: id.to_string(),
        is_self: false,
        url,
        fallback_url: None,
    }
}

/// Text-only item
pub fn self_item(id: &str) -> Item {
    Item {
        id: id.to_string(),
        is_self: true,
        url: format!("https://www.reddit.com/comments/{id}"),
        fallback_url: None,
    }
}

/// Serve `body` as `mime` at `route`
pub async fn serve_media(server: &MockServer, route: &str, body: Vec<u8>, mime: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, mime))
        .mount(server)
        .await;
}

/// Serve `body` as `mime` at `route`, after `delay`
pub async fn serve_slow_media(
    server: &MockServer,
    route: &str,
    body: Vec<u8>,
    mime: &str,
    delay: Duration,
) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, mime)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}
