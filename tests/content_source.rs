use std::{sync::Arc, time::Duration};

use dossier::{
    application::content::{BlogService, ContentError, ContentSource},
    cache::{CacheConfig, ContentCache, MemoryBackend},
    config::ContentSettings,
    infra::content::HttpContentSource,
};
use serde_json::json;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

fn source_for(server: &MockServer) -> HttpContentSource {
    let settings = ContentSettings {
        base_url: Url::parse(&format!("{}/blog", server.uri())).expect("mock url"),
        request_timeout: Duration::from_secs(5),
    };
    HttpContentSource::new(&settings).expect("http client")
}

fn index_body() -> serde_json::Value {
    json!({
        "version": "2024-03-02T10:00:00Z",
        "totalPosts": 1,
        "totalPages": 1,
        "postsPerPage": 50,
        "latestPosts": [metadata_body()],
        "pages": { "1": "manifests/page-1.json" }
    })
}

fn metadata_body() -> serde_json::Value {
    json!({
        "slug": "2024-03-01-first-light",
        "title": "First Light",
        "classification": "SECRET",
        "abstract": "Opening remarks",
        "publishDate": "2024-03-01",
        "version": "1.0"
    })
}

#[tokio::test]
async fn fetches_index_with_no_cache_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/manifests/index.json"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(index_body()))
        .expect(1)
        .mount(&server)
        .await;

    let index = source_for(&server)
        .fetch_index()
        .await
        .expect("index decodes");

    assert_eq!(index.total_posts, 1);
    assert_eq!(index.latest_posts[0].summary, "Opening remarks");
    assert_eq!(
        index.pages.get("1").map(String::as_str),
        Some("manifests/page-1.json")
    );
}

#[tokio::test]
async fn missing_page_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/manifests/page-7.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = source_for(&server)
        .fetch_page(7)
        .await
        .expect_err("page is missing");

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Failed to fetch page 7: Not Found");
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/manifests/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = source_for(&server)
        .fetch_index()
        .await
        .expect_err("body is not json");

    assert!(matches!(err, ContentError::Decode { .. }));
}

#[tokio::test]
async fn metadata_failures_read_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/manifests/metadata/ghost.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(source_for(&server).fetch_metadata("ghost").await.is_none());
}

#[tokio::test]
async fn post_source_is_returned_verbatim() {
    let server = MockServer::start().await;
    let body = "---\ntitle: First Light\n---\n\n# Hello\n";
    Mock::given(method("GET"))
        .and(path("/blog/posts/2024-03-01-first-light.mdx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let source = source_for(&server)
        .fetch_post_source("2024-03-01-first-light")
        .await
        .expect("source fetched");

    assert_eq!(source, body);
}

#[tokio::test]
async fn slugs_are_percent_encoded_in_request_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/posts/2024-01-01-caf%C3%A9%20notes.mdx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Bonjour\n"))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server)
        .fetch_post_source("2024-01-01-café notes")
        .await
        .expect("encoded path matches");

    assert_eq!(source, "Bonjour\n");
}

#[tokio::test]
async fn blog_service_serves_repeat_reads_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/manifests/metadata/2024-03-01-first-light.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = CacheConfig::default();
    let backend = Arc::new(MemoryBackend::new(config.memory_limit_non_zero()));
    let blog = BlogService::new(
        Arc::new(source_for(&server)),
        ContentCache::new(backend, &config),
    );

    for _ in 0..3 {
        let metadata = blog
            .metadata("2024-03-01-first-light")
            .await
            .expect("metadata present");
        assert_eq!(metadata.title, "First Light");
    }

    let stats = blog.cache_stats().await.expect("stats");
    assert_eq!(stats.total_entries, 1);
}
