//! Blog content access.
//!
//! [`ContentSource`] is the seam to the content branch; [`BlogService`] wraps
//! any source with the read-through [`ContentCache`].

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use dossier_manifest_types::{BlogIndex, BlogMetadata, PageManifest};
use thiserror::Error;
use tracing::debug;

use crate::cache::{BackendError, BlogCacheKey, CacheStats, ContentCache};

/// Resource on the content branch, used to label failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentResource {
    Index,
    Page(usize),
    Metadata(String),
    Post(String),
}

impl fmt::Display for ContentResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentResource::Index => f.write_str("blog index"),
            ContentResource::Page(page) => write!(f, "page {page}"),
            ContentResource::Metadata(slug) => write!(f, "metadata {slug}"),
            ContentResource::Post(slug) => write!(f, "post {slug}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    /// The host answered with a non-success status.
    #[error("Failed to fetch {resource}: {status_text}")]
    Status {
        resource: ContentResource,
        status: u16,
        status_text: String,
    },
    /// The request never produced a response.
    #[error("Failed to fetch {resource}: {message}")]
    Transport {
        resource: ContentResource,
        message: String,
    },
    #[error("Failed to decode {resource}: {message}")]
    Decode {
        resource: ContentResource,
        message: String,
    },
}

impl ContentError {
    /// `true` when the host reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::Status { status: 404, .. })
    }
}

/// Read access to the published content branch.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// `manifests/index.json`
    async fn fetch_index(&self) -> Result<BlogIndex, ContentError>;

    /// `manifests/page-{page}.json`
    async fn fetch_page(&self, page: usize) -> Result<PageManifest, ContentError>;

    /// `manifests/metadata/{slug}.json`. Any failure reads as absent.
    async fn fetch_metadata(&self, slug: &str) -> Option<BlogMetadata>;

    /// `posts/{slug}.mdx`
    async fn fetch_post_source(&self, slug: &str) -> Result<String, ContentError>;

    /// Absolute URL of a branch-relative asset such as a thumbnail.
    fn asset_url(&self, path: &str) -> String;
}

/// Read-through cache in front of a [`ContentSource`].
#[derive(Clone)]
pub struct BlogService {
    source: Arc<dyn ContentSource>,
    cache: ContentCache,
}

impl BlogService {
    pub fn new(source: Arc<dyn ContentSource>, cache: ContentCache) -> Self {
        Self { source, cache }
    }

    pub async fn index(&self) -> Result<BlogIndex, ContentError> {
        let key = BlogCacheKey::Index;
        if let Some(index) = self.cache.get(&key).await {
            return Ok(index);
        }

        let index = self.source.fetch_index().await?;
        self.cache.set(&key, &index).await;
        Ok(index)
    }

    pub async fn page(&self, page: usize) -> Result<PageManifest, ContentError> {
        let key = BlogCacheKey::Page(page);
        if let Some(manifest) = self.cache.get(&key).await {
            return Ok(manifest);
        }

        let manifest = self.source.fetch_page(page).await?;
        self.cache.set(&key, &manifest).await;
        Ok(manifest)
    }

    /// Metadata for one post. Absent results are not cached.
    pub async fn metadata(&self, slug: &str) -> Option<BlogMetadata> {
        let key = BlogCacheKey::Metadata(slug.to_string());
        if let Some(metadata) = self.cache.get(&key).await {
            return Some(metadata);
        }

        let metadata = self.source.fetch_metadata(slug).await?;
        self.cache.set(&key, &metadata).await;
        Some(metadata)
    }

    /// Raw MDX source of one post, front matter included.
    pub async fn post_source(&self, slug: &str) -> Result<String, ContentError> {
        let key = BlogCacheKey::Content(slug.to_string());
        if let Some(source) = self.cache.get::<String>(&key).await {
            return Ok(source);
        }

        let source = self.source.fetch_post_source(slug).await?;
        self.cache.set(&key, &source).await;
        Ok(source)
    }

    pub fn asset_url(&self, path: &str) -> String {
        self.source.asset_url(path)
    }

    pub async fn clear_cache(&self) -> Result<usize, BackendError> {
        let removed = self.cache.clear().await?;
        debug!(
            target: "dossier::application::content",
            removed, "Blog cache cleared"
        );
        Ok(removed)
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, BackendError> {
        self.cache.stats().await
    }
}
