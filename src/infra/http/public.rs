use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        chrome::ChromeService,
        content::BlogService,
        error::ErrorReport,
        listing::{ListingPage, ListingService, PostFilter},
        posts::{PostError, PostService, PostView},
        resume::ResumeService,
    },
    domain::slug::post_href,
    presentation::views::{
        BlogCardView, BlogListTemplate, BlogListView, ErrorPageView, FilterFormView, HomeTemplate,
        HomeView, LayoutContext, PaginationView, PostDetailView, PostTemplate,
        classification_class, render_error_page, render_not_found_response,
        render_template_response,
    },
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub chrome: Arc<ChromeService>,
    pub resume: Arc<ResumeService>,
    pub listing: Arc<ListingService>,
    pub posts: Arc<PostService>,
    pub blog: BlogService,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/resume", get(home))
        .route("/blog", get(blog_list))
        .route("/blog/", get(blog_list))
        .route("/blog/{slug}", get(post_detail))
        .route("/_health", get(health))
        .route(
            "/static/public/{*path}",
            get(crate::infra::assets::serve_public),
        )
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArchiveQuery {
    page: Option<String>,
    q: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

impl ArchiveQuery {
    /// Unparsable page numbers read as the first page.
    fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(1)
    }

    fn filter(&self) -> PostFilter {
        PostFilter::from_query(self.q.as_deref(), self.start.as_deref(), self.end.as_deref())
    }
}

async fn home(State(state): State<HttpState>) -> Response {
    let chrome = state.chrome.load();
    let dossier = state.resume.view();
    let content = HomeView {
        intro_name: dossier.owner.clone(),
        tagline: dossier.tagline.clone(),
        dossier,
    };
    let view = LayoutContext::new(chrome.with_canonical("/".to_string()), content);
    render_template_response(HomeTemplate { view }, StatusCode::OK)
}

async fn blog_list(State(state): State<HttpState>, Query(query): Query<ArchiveQuery>) -> Response {
    const SOURCE: &str = "infra::http::public::blog_list";

    let chrome = state.chrome.load();
    match state.listing.page(query.page(), query.filter()).await {
        Ok(listing) => {
            let content = blog_list_view(&state.blog, &query, listing, chrome.footer.year);
            let chrome = chrome
                .with_title("Classified Briefings")
                .with_canonical("/blog".to_string());
            let view = LayoutContext::new(chrome, content);
            render_template_response(BlogListTemplate { view }, StatusCode::OK)
        }
        Err(err) => render_error_page(
            chrome,
            ErrorPageView::archive_unavailable(err.to_string()),
            ErrorReport::from_error(SOURCE, StatusCode::BAD_GATEWAY, &err),
        ),
    }
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::post_detail";

    let chrome = state.chrome.load();
    match state.posts.load(&slug).await {
        Ok(post) => {
            let chrome = chrome
                .with_title(post.metadata.title.clone())
                .with_canonical(post_href(&post.metadata.slug));
            let view = LayoutContext::new(chrome, post_detail_view(post));
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Err(err) => {
            let status = post_error_status(&err);
            if status != StatusCode::NOT_FOUND {
                warn!(target: SOURCE, slug = %slug, error = %err, "Post failed to load");
            }
            let mut report = ErrorReport::from_error(SOURCE, status, &err);
            report.messages.push(err.user_message());
            render_error_page(chrome, ErrorPageView::not_found(), report)
        }
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome.load()).into_response()
}

fn post_error_status(err: &PostError) -> StatusCode {
    if err.is_not_found() {
        return StatusCode::NOT_FOUND;
    }
    match err {
        PostError::Content(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn blog_list_view(
    blog: &BlogService,
    query: &ArchiveQuery,
    listing: ListingPage,
    year: i32,
) -> BlogListView {
    let results_banner = listing.is_filtered().then(|| {
        format!(
            "SHOWING {} OF {} RESULTS",
            listing.posts.len(),
            listing.page_post_count
        )
    });

    let pagination = listing.pagination.as_ref().map(|pagination| PaginationView {
        current: pagination.current,
        total: pagination.total,
        previous_href: pagination.previous().map(archive_href),
        next_href: pagination.next().map(archive_href),
    });

    let cards = listing
        .posts
        .into_iter()
        .map(|post| BlogCardView {
            href: post_href(&post.slug),
            thumbnail_url: blog.asset_url(post.thumbnail_path()),
            classification_class: classification_class(&post.classification),
            title: post.title,
            summary: post.summary,
            classification: post.classification,
            publish_date: post.publish_date,
            version: post.version,
        })
        .collect();

    BlogListView {
        archive_number: format!("ARCHIVE-{year}"),
        total_posts: listing.total_posts,
        filter: FilterFormView {
            query: query.q.clone().unwrap_or_default(),
            start: query.start.clone().unwrap_or_default(),
            end: query.end.clone().unwrap_or_default(),
        },
        results_banner,
        cards,
        pagination,
    }
}

fn archive_href(page: usize) -> String {
    format!("/blog?page={page}")
}

fn post_detail_view(post: PostView) -> PostDetailView {
    let metadata = post.metadata;
    PostDetailView {
        document_number: format!("DOC-{}", metadata.slug),
        classification_class: classification_class(&metadata.classification),
        title: metadata.title,
        classification: metadata.classification,
        publish_date: metadata.publish_date,
        version: metadata.version,
        summary: metadata.summary,
        body_html: post.html,
        contains_code: post.contains_code,
        contains_mermaid: post.contains_mermaid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::content::{ContentError, ContentResource};

    #[test]
    fn archive_query_page_is_lenient() {
        let query = ArchiveQuery {
            page: Some("abc".to_string()),
            ..ArchiveQuery::default()
        };
        assert_eq!(query.page(), 1);

        let query = ArchiveQuery {
            page: Some(" 3 ".to_string()),
            ..ArchiveQuery::default()
        };
        assert_eq!(query.page(), 3);
    }

    #[test]
    fn post_errors_map_to_statuses() {
        assert_eq!(
            post_error_status(&PostError::NotFound),
            StatusCode::NOT_FOUND
        );
        let transport = PostError::Content(ContentError::Transport {
            resource: ContentResource::Post("x".to_string()),
            message: "timeout".to_string(),
        });
        assert_eq!(post_error_status(&transport), StatusCode::BAD_GATEWAY);
        assert_eq!(
            post_error_status(&PostError::Task("panicked".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
