//! Cache key definitions.
//!
//! Keys follow the content path they shadow and carry a schema version so a
//! change to the stored shape can be rolled out by bumping [`KEY_VERSION`].

use std::fmt;

/// Every key owned by the blog cache starts with this prefix.
pub const BLOG_KEY_PREFIX: &str = "blog-";

const KEY_VERSION: &str = "v1";

/// Identifies one cached content resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlogCacheKey {
    /// `manifests/index.json`
    Index,
    /// `manifests/page-{n}.json`
    Page(usize),
    /// `manifests/metadata/{slug}.json`
    Metadata(String),
    /// `posts/{slug}.mdx`
    Content(String),
}

impl BlogCacheKey {
    /// The string stored in the backend, e.g. `blog-page-2-v1`.
    pub fn storage_key(&self) -> String {
        match self {
            BlogCacheKey::Index => format!("{BLOG_KEY_PREFIX}index-{KEY_VERSION}"),
            BlogCacheKey::Page(page) => format!("{BLOG_KEY_PREFIX}page-{page}-{KEY_VERSION}"),
            BlogCacheKey::Metadata(slug) => {
                format!("{BLOG_KEY_PREFIX}metadata-{slug}-{KEY_VERSION}")
            }
            BlogCacheKey::Content(slug) => {
                format!("{BLOG_KEY_PREFIX}content-{slug}-{KEY_VERSION}")
            }
        }
    }

    /// Short label used in log fields and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BlogCacheKey::Index => "index",
            BlogCacheKey::Page(_) => "page",
            BlogCacheKey::Metadata(_) => "metadata",
            BlogCacheKey::Content(_) => "content",
        }
    }
}

impl fmt::Display for BlogCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keys_are_versioned() {
        assert_eq!(BlogCacheKey::Index.storage_key(), "blog-index-v1");
        assert_eq!(BlogCacheKey::Page(3).storage_key(), "blog-page-3-v1");
        assert_eq!(
            BlogCacheKey::Metadata("2024-01-02-intro".into()).storage_key(),
            "blog-metadata-2024-01-02-intro-v1"
        );
        assert_eq!(
            BlogCacheKey::Content("intro".into()).to_string(),
            "blog-content-intro-v1"
        );
    }

    #[test]
    fn all_keys_share_prefix() {
        let keys = [
            BlogCacheKey::Index,
            BlogCacheKey::Page(1),
            BlogCacheKey::Metadata("a".into()),
            BlogCacheKey::Content("a".into()),
        ];
        assert!(
            keys.iter()
                .all(|key| key.storage_key().starts_with(BLOG_KEY_PREFIX))
        );
    }
}
