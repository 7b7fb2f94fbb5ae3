//! Blog archive listing: one manifest page, filtered in place.

use dossier_manifest_types::{BlogMetadata, parse_publish_date};
use thiserror::Error;
use time::Date;
use tracing::error;

use crate::application::content::{BlogService, ContentError};

const SOURCE: &str = "dossier::application::listing";

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Failed to load blog index")]
    Index(#[source] ContentError),
    #[error("Failed to load page {page}")]
    Page {
        page: usize,
        #[source]
        source: ContentError,
    },
}

/// Title and date-range filter applied to the posts of the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub query: Option<String>,
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl PostFilter {
    /// Build a filter from raw query-string values. Blank values and dates
    /// that do not parse as `YYYY-MM-DD` are ignored.
    pub fn from_query(query: Option<&str>, start: Option<&str>, end: Option<&str>) -> Self {
        let query = query
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self {
            query,
            start: start.and_then(parse_publish_date),
            end: end.and_then(parse_publish_date),
        }
    }

    pub fn is_active(&self) -> bool {
        self.query.is_some() || self.start.is_some() || self.end.is_some()
    }

    /// Case-insensitive title match plus an inclusive date range.
    ///
    /// A post whose publish date does not parse never satisfies a date bound.
    pub fn matches(&self, post: &BlogMetadata) -> bool {
        if let Some(query) = &self.query
            && !post.title.to_lowercase().contains(&query.to_lowercase())
        {
            return false;
        }

        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(published) = post.publish_date() else {
            return false;
        };
        self.start.is_none_or(|start| published >= start)
            && self.end.is_none_or(|end| published <= end)
    }
}

/// Previous/next controls for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current: usize,
    pub total: usize,
}

impl Pagination {
    /// Previous page number, `None` on the first page.
    pub fn previous(&self) -> Option<usize> {
        (self.current > 1).then(|| self.current - 1)
    }

    /// Next page number, `None` on the last page.
    pub fn next(&self) -> Option<usize> {
        (self.current < self.total).then(|| self.current + 1)
    }
}

#[derive(Debug, Clone)]
pub struct ListingPage {
    pub total_posts: usize,
    pub current_page: usize,
    pub total_pages: usize,
    /// Number of posts on the loaded page before filtering.
    pub page_post_count: usize,
    pub posts: Vec<BlogMetadata>,
    pub filter: PostFilter,
    /// Present only when there is more than one page and no filter is active.
    pub pagination: Option<Pagination>,
}

impl ListingPage {
    pub fn is_filtered(&self) -> bool {
        self.filter.is_active()
    }
}

#[derive(Clone)]
pub struct ListingService {
    blog: BlogService,
}

impl ListingService {
    pub fn new(blog: BlogService) -> Self {
        Self { blog }
    }

    pub async fn page(&self, requested: usize, filter: PostFilter) -> Result<ListingPage, ListingError> {
        let index = self.blog.index().await.map_err(|err| {
            error!(target: SOURCE, error = %err, "Blog index unavailable");
            ListingError::Index(err)
        })?;

        let current_page = index.clamp_page(requested);
        let page_posts = if index.total_posts == 0 {
            Vec::new()
        } else {
            self.blog
                .page(current_page)
                .await
                .map_err(|source| {
                    error!(target: SOURCE, page = current_page, error = %source, "Blog page unavailable");
                    ListingError::Page {
                        page: current_page,
                        source,
                    }
                })?
                .posts
        };

        let page_post_count = page_posts.len();
        let posts = page_posts
            .into_iter()
            .filter(|post| filter.matches(post))
            .collect();

        let pagination = (index.total_pages > 1 && !filter.is_active()).then(|| Pagination {
            current: current_page,
            total: index.total_pages,
        });

        Ok(ListingPage {
            total_posts: index.total_posts,
            current_page,
            total_pages: index.total_pages,
            page_post_count,
            posts,
            filter,
            pagination,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, num::NonZeroUsize, sync::Arc};

    use async_trait::async_trait;
    use dossier_manifest_types::{BlogIndex, PageManifest};
    use time::macros::date;

    use super::*;
    use crate::{
        application::content::{ContentResource, ContentSource},
        cache::{CacheConfig, ContentCache, MemoryBackend},
    };

    fn post(slug: &str, title: &str, date: &str) -> BlogMetadata {
        BlogMetadata {
            slug: slug.to_string(),
            title: title.to_string(),
            classification: "SECRET".to_string(),
            summary: String::new(),
            publish_date: date.to_string(),
            version: "1.0".to_string(),
            thumbnail: None,
        }
    }

    struct ArchiveSource {
        pages: Vec<Vec<BlogMetadata>>,
        fail_index: bool,
    }

    #[async_trait]
    impl ContentSource for ArchiveSource {
        async fn fetch_index(&self) -> Result<BlogIndex, ContentError> {
            if self.fail_index {
                return Err(ContentError::Transport {
                    resource: ContentResource::Index,
                    message: "offline".to_string(),
                });
            }
            Ok(BlogIndex {
                version: "2024-06-01T00:00:00+00:00".to_string(),
                total_posts: self.pages.iter().map(Vec::len).sum(),
                total_pages: self.pages.len(),
                posts_per_page: 2,
                latest_posts: Vec::new(),
                pages: BTreeMap::new(),
            })
        }

        async fn fetch_page(&self, page: usize) -> Result<PageManifest, ContentError> {
            self.pages
                .get(page - 1)
                .map(|posts| PageManifest {
                    page,
                    posts: posts.clone(),
                })
                .ok_or_else(|| ContentError::Status {
                    resource: ContentResource::Page(page),
                    status: 404,
                    status_text: "Not Found".to_string(),
                })
        }

        async fn fetch_metadata(&self, _slug: &str) -> Option<BlogMetadata> {
            None
        }

        async fn fetch_post_source(&self, slug: &str) -> Result<String, ContentError> {
            Err(ContentError::Status {
                resource: ContentResource::Post(slug.to_string()),
                status: 404,
                status_text: "Not Found".to_string(),
            })
        }

        fn asset_url(&self, path: &str) -> String {
            path.to_string()
        }
    }

    fn service(pages: Vec<Vec<BlogMetadata>>) -> ListingService {
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(8).expect("non-zero")));
        let cache = ContentCache::new(backend, &CacheConfig::default());
        let source = ArchiveSource {
            pages,
            fail_index: false,
        };
        ListingService::new(BlogService::new(Arc::new(source), cache))
    }

    fn archive() -> Vec<Vec<BlogMetadata>> {
        vec![
            vec![
                post("c", "Night Watch", "2024-05-10"),
                post("b", "Dawn Patrol", "2024-03-01"),
            ],
            vec![post("a", "First Contact", "2023-12-24")],
        ]
    }

    #[tokio::test]
    async fn unfiltered_page_shows_pagination() {
        let listing = service(archive())
            .page(1, PostFilter::default())
            .await
            .expect("listing");

        assert_eq!(listing.total_posts, 3);
        assert_eq!(listing.posts.len(), 2);
        let pagination = listing.pagination.expect("pagination shown");
        assert_eq!(pagination.previous(), None);
        assert_eq!(pagination.next(), Some(2));
    }

    #[tokio::test]
    async fn requested_page_is_clamped() {
        let listing = service(archive())
            .page(9, PostFilter::default())
            .await
            .expect("listing");

        assert_eq!(listing.current_page, 2);
        let pagination = listing.pagination.expect("pagination shown");
        assert_eq!(pagination.previous(), Some(1));
        assert_eq!(pagination.next(), None);
    }

    #[tokio::test]
    async fn filters_hide_pagination_and_narrow_the_page() {
        let filter = PostFilter::from_query(Some("DAWN"), None, None);
        let listing = service(archive()).page(1, filter).await.expect("listing");

        assert!(listing.is_filtered());
        assert!(listing.pagination.is_none());
        assert_eq!(listing.page_post_count, 2);
        assert_eq!(listing.posts.len(), 1);
        assert_eq!(listing.posts[0].slug, "b");
    }

    #[tokio::test]
    async fn single_page_archive_has_no_pagination() {
        let listing = service(vec![vec![post("a", "Only", "2024-01-01")]])
            .page(1, PostFilter::default())
            .await
            .expect("listing");
        assert!(listing.pagination.is_none());
    }

    #[tokio::test]
    async fn empty_archive_skips_page_fetch() {
        // An empty index publishes no page-1.json; fetching it would 404 and
        // turn an empty archive into an error page.
        let listing = service(Vec::new())
            .page(1, PostFilter::default())
            .await
            .expect("listing");
        assert_eq!(listing.current_page, 1);
        assert!(listing.posts.is_empty());
    }

    #[tokio::test]
    async fn index_failure_has_fixed_message() {
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(8).expect("non-zero")));
        let cache = ContentCache::new(backend, &CacheConfig::default());
        let source = ArchiveSource {
            pages: Vec::new(),
            fail_index: true,
        };
        let service = ListingService::new(BlogService::new(Arc::new(source), cache));

        let err = service
            .page(1, PostFilter::default())
            .await
            .expect_err("index fails");
        assert_eq!(err.to_string(), "Failed to load blog index");
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let filter = PostFilter {
            query: None,
            start: Some(date!(2024 - 03 - 01)),
            end: Some(date!(2024 - 05 - 10)),
        };
        assert!(filter.matches(&post("b", "Dawn Patrol", "2024-03-01")));
        assert!(filter.matches(&post("c", "Night Watch", "2024-05-10")));
        assert!(!filter.matches(&post("a", "First Contact", "2023-12-24")));
    }

    #[test]
    fn undated_posts_fail_date_bounds_only() {
        let undated = post("x", "Lost File", "someday");
        assert!(PostFilter::from_query(Some("lost"), None, None).matches(&undated));
        assert!(!PostFilter::from_query(None, Some("2024-01-01"), None).matches(&undated));
    }

    #[test]
    fn blank_and_malformed_query_values_are_ignored() {
        let filter = PostFilter::from_query(Some("  "), Some("yesterday"), Some(""));
        assert!(!filter.is_active());
    }
}
