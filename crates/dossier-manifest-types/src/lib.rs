//! Wire types for the blog content branch.
//!
//! The content branch publishes three kinds of JSON documents which the
//! server reads and the manifest generator writes:
//!
//! - `manifests/index.json` ([`BlogIndex`])
//! - `manifests/page-{n}.json` ([`PageManifest`])
//! - `manifests/metadata/{slug}.json` ([`BlogMetadata`])
//!
//! Field names are camelCase on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};

/// Number of posts carried in [`BlogIndex::latest_posts`].
pub const LATEST_POSTS_PREVIEW: usize = 10;

/// Default classification label for posts that do not declare one.
pub const DEFAULT_CLASSIFICATION: &str = "UNCLASSIFIED";

/// Default document version for posts that do not declare one.
pub const DEFAULT_VERSION: &str = "1.0";

/// Default thumbnail path, relative to the content branch root.
pub const DEFAULT_THUMBNAIL: &str = "thumbnails/default.svg";

/// Metadata describing a single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogMetadata {
    pub slug: String,
    pub title: String,
    pub classification: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    /// `YYYY-MM-DD`.
    pub publish_date: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl BlogMetadata {
    /// Parse [`Self::publish_date`] as a calendar date.
    pub fn publish_date(&self) -> Option<Date> {
        parse_publish_date(&self.publish_date)
    }

    /// Thumbnail path, falling back to the branch-wide default.
    pub fn thumbnail_path(&self) -> &str {
        self.thumbnail
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .unwrap_or(DEFAULT_THUMBNAIL)
    }
}

/// Parse a `YYYY-MM-DD` date string.
pub fn parse_publish_date(value: &str) -> Option<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value.trim(), format).ok()
}

/// Top-level manifest with pagination metadata and a preview of recent posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogIndex {
    /// ISO 8601 generation timestamp.
    pub version: String,
    pub total_posts: usize,
    pub total_pages: usize,
    pub posts_per_page: usize,
    pub latest_posts: Vec<BlogMetadata>,
    /// Page number (as a string) to manifest path.
    pub pages: BTreeMap<String, String>,
}

impl BlogIndex {
    /// Clamp a requested page number into `1..=total_pages`.
    ///
    /// An index with zero pages still reports page 1 so callers always have
    /// a concrete page to request.
    pub fn clamp_page(&self, requested: usize) -> usize {
        requested.clamp(1, self.total_pages.max(1))
    }
}

/// A single page of posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageManifest {
    pub page: usize,
    pub posts: Vec<BlogMetadata>,
}

/// Timestamped snapshot of a fetched resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}
