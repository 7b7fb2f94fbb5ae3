//! Manifest generation for the content branch.
//!
//! Scans `posts/*.mdx` under a content root and writes the JSON documents the
//! server reads: per-post metadata, paginated page manifests and the index.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use dossier_manifest_types::{
    BlogIndex, BlogMetadata, DEFAULT_CLASSIFICATION, DEFAULT_THUMBNAIL, DEFAULT_VERSION,
    LATEST_POSTS_PREVIEW, PageManifest,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::domain::{frontmatter::extract_frontmatter, slug::validate_post_slug};

const SOURCE: &str = "dossier::application::manifest";

pub const POSTS_PER_PAGE: usize = 50;

static SLUG_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})").expect("slug date pattern must compile"));

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("posts directory not found: {path}")]
    MissingPostsDir { path: PathBuf },
    #[error("failed to list posts: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to write `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode `{path}`: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to format generation timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Why a post file was left out of the manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    Unreadable(String),
    /// The file stem cannot be served as a post slug.
    InvalidSlug(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPost {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestOutcome {
    /// `.mdx` files found.
    pub scanned: usize,
    pub skipped: Vec<SkippedPost>,
    pub total_posts: usize,
    pub total_pages: usize,
    /// `false` when no valid post was found and no index was written.
    pub wrote_index: bool,
}

pub struct ManifestGenerator {
    root: PathBuf,
    posts_per_page: usize,
}

impl ManifestGenerator {
    /// Generator for a content root holding `posts/` and `manifests/`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            posts_per_page: POSTS_PER_PAGE,
        }
    }

    pub fn with_posts_per_page(mut self, posts_per_page: usize) -> Self {
        self.posts_per_page = posts_per_page.max(1);
        self
    }

    pub fn generate(&self) -> Result<ManifestOutcome, ManifestError> {
        self.generate_at(OffsetDateTime::now_utc())
    }

    pub fn generate_at(&self, now: OffsetDateTime) -> Result<ManifestOutcome, ManifestError> {
        let posts_dir = self.root.join("posts");
        if !posts_dir.is_dir() {
            return Err(ManifestError::MissingPostsDir { path: posts_dir });
        }

        let manifests_dir = self.root.join("manifests");
        let metadata_dir = manifests_dir.join("metadata");
        fs::create_dir_all(&metadata_dir).map_err(|source| ManifestError::Write {
            path: metadata_dir.clone(),
            source,
        })?;

        let files = list_post_files(&posts_dir)?;
        info!(target: SOURCE, count = files.len(), "Found post sources");

        let mut outcome = ManifestOutcome {
            scanned: files.len(),
            ..ManifestOutcome::default()
        };
        let mut posts = Vec::new();

        for path in files {
            match read_post_metadata(&path) {
                Ok(metadata) => {
                    write_json(&metadata_dir.join(format!("{}.json", metadata.slug)), &metadata)?;
                    info!(target: SOURCE, slug = %metadata.slug, "Post metadata written");
                    posts.push(metadata);
                }
                Err(reason) => {
                    match &reason {
                        SkipReason::MissingTitle => {
                            warn!(target: SOURCE, path = %path.display(), "Post missing title")
                        }
                        SkipReason::Unreadable(error) => {
                            warn!(target: SOURCE, path = %path.display(), error, "Post unreadable")
                        }
                        SkipReason::InvalidSlug(error) => {
                            warn!(target: SOURCE, path = %path.display(), error, "Post name unusable as slug")
                        }
                    }
                    outcome.skipped.push(SkippedPost { path, reason });
                }
            }
        }

        if posts.is_empty() {
            warn!(target: SOURCE, "No valid posts found");
            return Ok(outcome);
        }

        posts.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));

        let total_pages = posts.len().div_ceil(self.posts_per_page);
        let mut pages = BTreeMap::new();
        for (offset, chunk) in posts.chunks(self.posts_per_page).enumerate() {
            let page = offset + 1;
            let manifest = PageManifest {
                page,
                posts: chunk.to_vec(),
            };
            write_json(&manifests_dir.join(format!("page-{page}.json")), &manifest)?;
            pages.insert(page.to_string(), format!("manifests/page-{page}.json"));
            info!(target: SOURCE, page, posts = chunk.len(), "Page manifest written");
        }

        let index = BlogIndex {
            version: now.format(&Rfc3339)?,
            total_posts: posts.len(),
            total_pages,
            posts_per_page: self.posts_per_page,
            latest_posts: posts.iter().take(LATEST_POSTS_PREVIEW).cloned().collect(),
            pages,
        };
        write_json(&manifests_dir.join("index.json"), &index)?;

        outcome.total_posts = posts.len();
        outcome.total_pages = total_pages;
        outcome.wrote_index = true;
        info!(
            target: SOURCE,
            posts = outcome.total_posts,
            pages = outcome.total_pages,
            "Manifests generated"
        );
        Ok(outcome)
    }
}

/// `posts/*.mdx`, newest file name first.
fn list_post_files(posts_dir: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(posts_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "mdx") {
            files.push(path.to_path_buf());
        }
    }
    files.sort_by(|a, b| b.cmp(a));
    Ok(files)
}

fn read_post_metadata(path: &Path) -> Result<BlogMetadata, SkipReason> {
    let content = fs::read_to_string(path).map_err(|err| SkipReason::Unreadable(err.to_string()))?;
    let slug = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    metadata_from_source(slug, &content)
}

/// Build metadata for a post source named `slug`.
///
/// A `YYYY-MM-DD` slug prefix wins over a `publishDate` front matter field.
/// Fields that are present but empty stay empty.
pub fn metadata_from_source(slug: String, content: &str) -> Result<BlogMetadata, SkipReason> {
    validate_post_slug(&slug).map_err(|err| SkipReason::InvalidSlug(err.to_string()))?;
    let front = extract_frontmatter(content);
    let Some(title) = front.non_empty("title") else {
        return Err(SkipReason::MissingTitle);
    };

    let publish_date = SLUG_DATE
        .captures(&slug)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
        .or_else(|| front.get("publishDate"))
        .unwrap_or_default()
        .to_string();

    Ok(BlogMetadata {
        title: title.to_string(),
        classification: front
            .get("classification")
            .unwrap_or(DEFAULT_CLASSIFICATION)
            .to_string(),
        summary: front.get("abstract").unwrap_or_default().to_string(),
        publish_date,
        version: front.get("version").unwrap_or(DEFAULT_VERSION).to_string(),
        thumbnail: Some(front.get("thumbnail").unwrap_or(DEFAULT_THUMBNAIL).to_string()),
        slug,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ManifestError> {
    let encoded = serde_json::to_string_pretty(value).map_err(|source| ManifestError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, encoded).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })
}
