use super::*;
use crate::error::ErrorKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

enum Listing {
    Items(Vec<Item>),
    AuthFailure,
    UpstreamFailure,
}

/// Feed client answering from a table and recording its calls
#[derive(Default)]
struct ScriptedClient {
    listings: Mutex<HashMap<String, Listing>>,
    calls: Mutex<Vec<(String, TimeWindow, u32)>>,
}

impl ScriptedClient {
    fn with(mut self, feed: &str, listing: Listing) -> Self {
        self.listings
            .get_mut()
            .unwrap()
            .insert(feed.to_string(), listing);
        self
    }

    fn set(&self, feed: &str, listing: Listing) {
        self.listings
            .lock()
            .unwrap()
            .insert(feed.to_string(), listing);
    }
}

#[async_trait]
impl FeedClient for ScriptedClient {
    async fn list_top_items(
        &self,
        feed: &Feed,
        window: TimeWindow,
        limit: u32,
    ) -> Result<Vec<Item>> {
        self.calls
            .lock()
            .unwrap()
            .push((feed.name().to_string(), window, limit));
        match self.listings.lock().unwrap().get(feed.name()) {
            Some(Listing::Items(items)) => Ok(items.clone()),
            Some(Listing::AuthFailure) => Err(Error::Auth("HTTP 401".to_string())),
            Some(Listing::UpstreamFailure) | None => {
                Err(Error::Upstream("HTTP 503".to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn link(id: &str, url: String) -> Item {
    Item {
        id: id.to_string(),
        is_self: false,
        url,
        fallback_url: None,
    }
}

fn text_post(id: &str) -> Item {
    Item {
        id: id.to_string(),
        is_self: true,
        url: format!("https://www.reddit.com/comments/{id}"),
        fallback_url: None,
    }
}

async fn media_server() -> MockServer {
    let server = MockServer::start().await;
    for (p, body, mime) in [
        ("/a.jpg", b"jpeg".to_vec(), "image/jpeg"),
        ("/b.png", b"png".to_vec(), "image/png"),
        ("/c.gif", b"gif".to_vec(), "image/gif"),
        ("/page", b"<html/>".to_vec(), "text/html"),
    ] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, mime))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    server
}

fn feed_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    files
}

fn refresher(client: ScriptedClient, root: &Path) -> (FeedRefresher, Arc<ScriptedClient>) {
    let client = Arc::new(client);
    let config = HarvestConfig {
        max_concurrent_downloads: 2,
        ..Default::default()
    };
    let refresher = FeedRefresher::new(
        client.clone(),
        ItemDownloader::new(reqwest::Client::new()),
        CacheStore::new(root),
        &config,
    );
    (refresher, client)
}

#[tokio::test]
async fn refresh_feed_caches_supported_items_and_counts_the_rest() {
    let server = media_server().await;
    let uri = server.uri();
    let client = ScriptedClient::default().with(
        "pics",
        Listing::Items(vec![
            link("a", format!("{uri}/a.jpg")),
            text_post("t"),
            link("b", format!("{uri}/b.png")),
            link("h", format!("{uri}/page")),
            link("x", format!("{uri}/broken")),
        ]),
    );
    let temp_dir = TempDir::new().unwrap();
    let (refresher, client) = refresher(client, temp_dir.path());

    let result = refresher.refresh_feed(&Feed::new("pics")).await;

    assert!(result.is_ok());
    assert_eq!(result.skipped_self, 1);
    assert_eq!(result.attempted, 4);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.unsupported, 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].item_id, "x");
    assert_eq!(result.failures[0].kind, ErrorKind::Upstream);

    assert_eq!(feed_files(&temp_dir.path().join("pics")), vec!["a.jpeg", "b.png"]);

    let calls = client.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[("pics".to_string(), TimeWindow::Week, 50)]);
}

#[tokio::test]
async fn refresh_replaces_previous_contents() {
    let server = media_server().await;
    let client = ScriptedClient::default().with(
        "pics",
        Listing::Items(vec![link("c", format!("{}/c.gif", server.uri()))]),
    );
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir(temp_dir.path().join("pics")).unwrap();
    std::fs::write(temp_dir.path().join("pics/stale.png"), b"old").unwrap();
    let (refresher, _) = refresher(client, temp_dir.path());

    refresher.refresh_feed(&Feed::new("pics")).await;

    assert!(!temp_dir.path().join("pics/stale.png").exists());
    assert!(temp_dir.path().join("pics/c.gif").exists());
}

#[tokio::test]
async fn listing_failure_leaves_feed_empty_and_recorded() {
    let client = ScriptedClient::default().with("pics", Listing::AuthFailure);
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir(temp_dir.path().join("pics")).unwrap();
    std::fs::write(temp_dir.path().join("pics/old.jpeg"), b"old").unwrap();
    let (refresher, _) = refresher(client, temp_dir.path());

    let result = refresher.refresh_feed(&Feed::new("pics")).await;

    let failure = result.feed_error.expect("feed error recorded");
    assert_eq!(failure.kind, ErrorKind::Auth);
    assert_eq!(result.attempted, 0);
    assert!(temp_dir.path().join("pics").is_dir());
    assert_eq!(refresher.store().count_feed(&Feed::new("pics")), 0);
}

#[tokio::test]
async fn missing_cache_root_is_recorded_as_filesystem_feed_error() {
    let client = ScriptedClient::default().with("pics", Listing::Items(vec![text_post("t")]));
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("missing");
    let (refresher, client) = refresher(client, &root);

    let result = refresher.refresh_feed(&Feed::new("pics")).await;

    let failure = result.feed_error.expect("feed error recorded");
    assert_eq!(failure.kind, ErrorKind::Filesystem);
    assert_eq!(result.attempted, 0);
    assert!(!root.exists());
    assert!(client.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn overlapping_refreshes_of_one_feed_run_in_turn() {
    let server = media_server().await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"old".to_vec(), "image/png")
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    let uri = server.uri();
    let client = ScriptedClient::default().with(
        "pics",
        Listing::Items(vec![link("old1", format!("{uri}/slow.png"))]),
    );
    let temp_dir = TempDir::new().unwrap();
    let (refresher, client) = refresher(client, temp_dir.path());
    let feed = Feed::new("pics");

    let first = {
        let refresher = refresher.clone();
        let feed = feed.clone();
        tokio::spawn(async move { refresher.refresh_feed(&feed).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.set(
        "pics",
        Listing::Items(vec![link("new1", format!("{uri}/b.png"))]),
    );
    let second = refresher.refresh_feed(&feed).await;
    let first = first.await.unwrap();

    assert_eq!(first.succeeded, 1);
    assert_eq!(second.succeeded, 1);
    assert_eq!(feed_files(&temp_dir.path().join("pics")), vec!["new1.png"]);
    assert_eq!(client.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn refresh_all_isolates_failing_feeds() {
    let server = media_server().await;
    let uri = server.uri();
    let client = ScriptedClient::default()
        .with(
            "pics",
            Listing::Items(vec![
                link("a", format!("{uri}/a.jpg")),
                link("b", format!("{uri}/b.png")),
            ]),
        )
        .with("gifs", Listing::UpstreamFailure)
        .with("memes", Listing::AuthFailure);
    let temp_dir = TempDir::new().unwrap();
    let (refresher, _) = refresher(client, temp_dir.path());
    let feeds = vec![Feed::new("pics"), Feed::new("gifs"), Feed::new("memes")];

    let report = refresher.refresh_all(&feeds).await.unwrap();

    assert_eq!(report.feeds.len(), 3);
    assert_eq!(report.feeds[0].feed, Feed::new("pics"));
    assert!(report.feed(&Feed::new("pics")).unwrap().is_ok());
    assert_eq!(
        report.feed(&Feed::new("gifs")).unwrap().feed_error.as_ref().unwrap().kind,
        ErrorKind::Upstream
    );
    assert_eq!(
        report.feed(&Feed::new("memes")).unwrap().feed_error.as_ref().unwrap().kind,
        ErrorKind::Auth
    );
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.total_cached, 2);
    assert!(report.finished_at >= report.started_at);
}

#[tokio::test]
async fn refresh_all_skips_cycle_without_cache_root() {
    let client = ScriptedClient::default().with("pics", Listing::Items(vec![]));
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("missing");
    let (refresher, client) = refresher(client, &root);
    let (tx, mut rx) = broadcast::channel(16);
    let refresher = refresher.with_events(tx);

    let err = refresher.refresh_all(&[Feed::new("pics")]).await.unwrap_err();

    assert!(matches!(err, Error::CacheRootMissing(_)));
    assert!(!root.exists());
    assert!(client.calls.lock().unwrap().is_empty());
    assert!(matches!(rx.try_recv().unwrap(), Event::CycleSkipped { .. }));
}

#[tokio::test]
async fn refresh_all_emits_cycle_events() {
    let client = ScriptedClient::default()
        .with("pics", Listing::Items(vec![text_post("t1")]))
        .with("gifs", Listing::Items(vec![]));
    let temp_dir = TempDir::new().unwrap();
    let (refresher, _) = refresher(client, temp_dir.path());
    let (tx, mut rx) = broadcast::channel(16);
    let refresher = refresher.with_events(tx);

    refresher
        .refresh_all(&[Feed::new("pics"), Feed::new("gifs")])
        .await
        .unwrap();

    assert!(matches!(rx.try_recv().unwrap(), Event::CycleStarted { feeds: 2 }));
    let mut refreshed = 0;
    loop {
        match rx.try_recv().unwrap() {
            Event::FeedRefreshed { result } => {
                assert!(result.is_ok());
                refreshed += 1;
            }
            Event::CycleCompleted {
                succeeded,
                failed,
                total_cached,
            } => {
                assert_eq!((succeeded, failed, total_cached), (0, 0, 0));
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(refreshed, 2);
}
