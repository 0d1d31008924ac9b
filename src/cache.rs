//! On-disk cache store
//!
//! Layout: `{root}/{feed}/{item_id}.{ext}`. The root is created by the
//! operator, never by this crate; feed subdirectories are created and
//! cleared by the refresher that owns them.
//!
//! Items are written to a hidden staging file (`.{item_id}.{ext}.part`) and
//! renamed into place once complete. [`CacheStore::enumerate`] only reports
//! visible files with a cacheable extension, so readers never see a partial
//! download. There is no lock: a reader walking the tree while a feed is
//! being cleared simply sees fewer files.

use crate::classifier::is_supported_extension;
use crate::error::{Error, Result};
use crate::types::Feed;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Suffix of in-progress downloads
pub const STAGING_SUFFIX: &str = "part";

/// Handle to the cache directory tree (cheap to clone)
#[derive(Clone, Debug)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root` (the directory is not created)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the cache root exists and is a directory
    pub fn root_exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Directory holding a feed's cached items
    pub fn feed_dir(&self, feed: &Feed) -> PathBuf {
        self.root.join(feed.name())
    }

    /// Remove a feed's directory and recreate it empty
    ///
    /// The root itself is never created: if it is missing, creating the feed
    /// directory fails and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the old directory cannot be removed or
    /// the new one cannot be created. In the latter case the feed has no
    /// directory until the next successful clear.
    pub async fn clear(&self, feed: &Feed) -> Result<PathBuf> {
        let dir = self.feed_dir(feed);

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => info!(feed = %feed, path = %dir.display(), "Cleared feed directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(feed = %feed, path = %dir.display(), "No feed directory to clear");
            }
            Err(e) => return Err(Error::filesystem(&dir, e)),
        }

        tokio::fs::create_dir(&dir)
            .await
            .map_err(|e| Error::filesystem(&dir, e))?;

        Ok(dir)
    }

    /// List every cached file under the root
    ///
    /// Entries that disappear mid-walk, unreadable directories and a missing
    /// root are all treated as "no files there". Hidden files, staging files
    /// and files without a cacheable extension are skipped.
    pub fn enumerate(&self) -> Vec<PathBuf> {
        if !self.root_exists() {
            return Vec::new();
        }

        WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_cached_file_name(entry.file_name()))
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Number of cached files in one feed's directory
    pub fn count_feed(&self, feed: &Feed) -> usize {
        let dir = self.feed_dir(feed);
        match std::fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
                .filter(|entry| is_cached_file_name(&entry.file_name()))
                .count(),
            Err(_) => 0,
        }
    }
}

/// Final file name of a cached item
pub fn cached_file_name(item_id: &str, ext: &str) -> String {
    format!("{}.{}", item_id, ext)
}

/// Hidden staging name used while an item is being written
pub fn staging_file_name(item_id: &str, ext: &str) -> String {
    format!(".{}.{}.{}", item_id, ext, STAGING_SUFFIX)
}

fn is_cached_file_name(name: &OsStr) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(is_supported_extension)
        .unwrap_or(false)
}
