//! Single-item media download into a feed directory
//!
//! A download either produces exactly one complete file at
//! `{dest_dir}/{item_id}.{ext}` or leaves nothing behind. Bytes are streamed
//! into a hidden staging file and only renamed into place after the body has
//! been fully received and flushed.

use crate::cache::{cached_file_name, staging_file_name};
use crate::classifier::{extension_for, media_type_essence};
use crate::error::{Error, Result};
use crate::types::Item;
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

/// Host serving embedded videos whose page URL is not the media itself
pub const EMBEDDED_VIDEO_HOST: &str = "v.redd.it";

/// Downloads items over a shared HTTP client
#[derive(Clone, Debug)]
pub struct ItemDownloader {
    http: reqwest::Client,
}

impl ItemDownloader {
    /// Create a downloader (the client's timeout bounds every download)
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Download one item into `dest_dir`
    ///
    /// # Errors
    ///
    /// - [`Error::Upstream`] when the item id is not a plain alphanumeric id
    /// - [`Error::HttpStatus`] for a non-success response
    /// - [`Error::UnsupportedContent`] when the content type is missing or not cached
    /// - [`Error::EmptyBody`] / [`Error::TruncatedBody`] for incomplete bodies
    /// - [`Error::Network`] for transport failures mid-stream
    /// - [`Error::Filesystem`] when the staging file cannot be written or renamed
    pub async fn download(&self, item: &Item, dest_dir: &Path) -> Result<PathBuf> {
        // Ids become file names
        if !is_valid_item_id(&item.id) {
            return Err(Error::Upstream(format!("invalid item id {:?}", item.id)));
        }

        let url = resolve_url(item);
        debug!(item_id = %item.id, %url, "Downloading item");

        let mut response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let Some(ext) = extension_for(media_type_essence(&content_type)) else {
            return Err(Error::UnsupportedContent { content_type });
        };

        let expected = response.content_length();
        let staging = dest_dir.join(staging_file_name(&item.id, ext));
        let target = dest_dir.join(cached_file_name(&item.id, ext));

        let written = match write_body(&mut response, &staging, url, expected).await {
            Ok(written) => written,
            Err(e) => {
                discard(&staging).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            discard(&staging).await;
            return Err(Error::filesystem(&target, e));
        }

        debug!(
            item_id = %item.id,
            path = %target.display(),
            bytes = written,
            "Cached item"
        );
        Ok(target)
    }
}

/// URL to fetch for an item
///
/// Embedded-video items point at a player page; their direct media URL is
/// used instead when the listing provided one.
pub fn resolve_url(item: &Item) -> &str {
    if is_embedded_video(&item.url)
        && let Some(fallback) = item.fallback_url.as_deref()
    {
        return fallback;
    }
    &item.url
}

/// Whether `id` is safe to use as a file name stem (`[A-Za-z0-9_]+`)
pub fn is_valid_item_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_embedded_video(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| host.eq_ignore_ascii_case(EMBEDDED_VIDEO_HOST))
            .unwrap_or(false),
        Err(_) => url.to_ascii_lowercase().contains(EMBEDDED_VIDEO_HOST),
    }
}

/// Stream the response body into `staging`, returning the byte count
async fn write_body(
    response: &mut reqwest::Response,
    staging: &Path,
    url: &str,
    expected: Option<u64>,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(staging)
        .await
        .map_err(|e| Error::filesystem(staging, e))?;

    let mut received: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::filesystem(staging, e))?;
        received += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| Error::filesystem(staging, e))?;
    file.sync_all()
        .await
        .map_err(|e| Error::filesystem(staging, e))?;

    if received == 0 {
        return Err(Error::EmptyBody(url.to_string()));
    }
    if let Some(expected) = expected
        && received < expected
    {
        return Err(Error::TruncatedBody { expected, received });
    }

    Ok(received)
}

async fn discard(staging: &Path) {
    match tokio::fs::remove_file(staging).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %staging.display(), error = %e, "Failed to remove staging file"),
    }
}
