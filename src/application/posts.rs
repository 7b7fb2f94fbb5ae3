//! Loading a single post: metadata, MDX source and compiled HTML.

use std::{sync::Arc, time::Instant};

use dossier_manifest_types::BlogMetadata;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    application::{
        content::{BlogService, ContentError},
        render::{RenderError, RenderService, describe_failure},
    },
    domain::slug::{SlugError, validate_post_slug},
};

const SOURCE: &str = "dossier::application::posts";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("No slug provided")]
    MissingSlug,
    #[error("Post not found")]
    InvalidSlug(#[source] SlugError),
    #[error("Post not found")]
    NotFound,
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("rendering task failed: {0}")]
    Task(String),
}

impl PostError {
    /// `true` when the post does not exist rather than failing to load.
    pub fn is_not_found(&self) -> bool {
        match self {
            PostError::MissingSlug | PostError::InvalidSlug(_) | PostError::NotFound => true,
            PostError::Content(err) => err.is_not_found(),
            PostError::Render(_) | PostError::Task(_) => false,
        }
    }

    /// Reader-facing explanation of the failure.
    pub fn user_message(&self) -> String {
        describe_failure(self)
    }
}

/// A post ready for presentation.
#[derive(Debug, Clone)]
pub struct PostView {
    pub metadata: BlogMetadata,
    pub html: String,
    pub contains_code: bool,
    pub contains_mermaid: bool,
}

#[derive(Clone)]
pub struct PostService {
    blog: BlogService,
    renderer: Arc<dyn RenderService>,
}

impl PostService {
    pub fn new(blog: BlogService, renderer: Arc<dyn RenderService>) -> Self {
        Self { blog, renderer }
    }

    /// Fetch and compile one post.
    ///
    /// Metadata and source are fetched concurrently. Dropping the returned
    /// future abandons both fetches; a compile already handed to the blocking
    /// pool runs to completion and its result is discarded.
    pub async fn load(&self, slug: &str) -> Result<PostView, PostError> {
        if slug.trim().is_empty() {
            return Err(PostError::MissingSlug);
        }
        let slug = validate_post_slug(slug).map_err(PostError::InvalidSlug)?;

        let (metadata, source) = tokio::join!(self.blog.metadata(slug), self.blog.post_source(slug));
        let Some(metadata) = metadata else {
            debug!(target: SOURCE, slug, "Post metadata missing");
            return Err(PostError::NotFound);
        };
        let source = source?;

        let renderer = Arc::clone(&self.renderer);
        let started = Instant::now();
        let compiled = tokio::task::spawn_blocking(move || renderer.compile(&source))
            .await
            .map_err(|err| PostError::Task(err.to_string()))?
            .inspect_err(|err| {
                counter!("dossier_post_render_failures_total").increment(1);
                warn!(target: SOURCE, slug, error = %err, "Post failed to compile");
            })?;
        histogram!("dossier_post_compile_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        Ok(PostView {
            metadata,
            html: compiled.html,
            contains_code: compiled.contains_code,
            contains_mermaid: compiled.contains_mermaid,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, num::NonZeroUsize};

    use async_trait::async_trait;
    use dossier_manifest_types::{BlogIndex, PageManifest};

    use super::*;
    use crate::{
        application::{
            content::{ContentResource, ContentSource},
            render::render_service,
        },
        cache::{CacheConfig, ContentCache, MemoryBackend},
    };

    #[derive(Default)]
    struct FixtureSource {
        metadata: HashMap<String, BlogMetadata>,
        sources: HashMap<String, String>,
    }

    impl FixtureSource {
        fn with_post(mut self, slug: &str, source: &str) -> Self {
            self.metadata.insert(
                slug.to_string(),
                BlogMetadata {
                    slug: slug.to_string(),
                    title: "Operation Daybreak".to_string(),
                    classification: "SECRET".to_string(),
                    summary: "Dawn report".to_string(),
                    publish_date: "2024-03-01".to_string(),
                    version: "1.0".to_string(),
                    thumbnail: None,
                },
            );
            self.sources.insert(slug.to_string(), source.to_string());
            self
        }
    }

    #[async_trait]
    impl ContentSource for FixtureSource {
        async fn fetch_index(&self) -> Result<BlogIndex, ContentError> {
            unreachable!("posts never load the index")
        }

        async fn fetch_page(&self, _page: usize) -> Result<PageManifest, ContentError> {
            unreachable!("posts never load pages")
        }

        async fn fetch_metadata(&self, slug: &str) -> Option<BlogMetadata> {
            self.metadata.get(slug).cloned()
        }

        async fn fetch_post_source(&self, slug: &str) -> Result<String, ContentError> {
            self.sources
                .get(slug)
                .cloned()
                .ok_or_else(|| ContentError::Status {
                    resource: ContentResource::Post(slug.to_string()),
                    status: 404,
                    status_text: "Not Found".to_string(),
                })
        }

        fn asset_url(&self, path: &str) -> String {
            format!("https://content.test/{path}")
        }
    }

    fn service(source: FixtureSource) -> PostService {
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(16).expect("non-zero")));
        let cache = ContentCache::new(backend, &CacheConfig::default());
        let blog = BlogService::new(Arc::new(source), cache);
        PostService::new(blog, render_service())
    }

    #[tokio::test]
    async fn loads_and_compiles_post() {
        let service = service(FixtureSource::default().with_post(
            "2024-03-01-daybreak",
            "---\ntitle: Operation Daybreak\n---\n\n## Briefing\n\nAgents <Redacted>moved</Redacted> at dawn.\n",
        ));

        let view = service
            .load("2024-03-01-daybreak")
            .await
            .expect("post loads");
        assert_eq!(view.metadata.title, "Operation Daybreak");
        assert!(view.html.contains("Briefing"));
        assert!(view.html.contains("moved"));
        assert!(!view.html.contains("title: Operation Daybreak"));
        assert!(!view.contains_mermaid);
    }

    #[tokio::test]
    async fn empty_slug_is_rejected() {
        let err = service(FixtureSource::default())
            .load("  ")
            .await
            .expect_err("empty slug");
        assert!(matches!(err, PostError::MissingSlug));
        assert_eq!(err.user_message(), "No slug provided");
    }

    #[tokio::test]
    async fn missing_metadata_is_not_found() {
        let err = service(FixtureSource::default())
            .load("ghost")
            .await
            .expect_err("no such post");
        assert!(matches!(err, PostError::NotFound));
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "Post not found");
    }

    #[tokio::test]
    async fn traversal_slugs_never_reach_the_source() {
        let err = service(FixtureSource::default())
            .load("../secrets")
            .await
            .expect_err("forbidden slug");
        assert!(matches!(err, PostError::InvalidSlug(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unknown_components_surface_the_component_tip() {
        let service = service(
            FixtureSource::default().with_post("broken", "Intro\n\n<Dossier>text</Dossier>\n"),
        );

        let err = service.load("broken").await.expect_err("compile fails");
        assert!(matches!(err, PostError::Render(_)));
        assert!(!err.is_not_found());
        assert!(err.user_message().contains("Component Error"));
    }
}
