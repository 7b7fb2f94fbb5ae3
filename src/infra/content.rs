//! HTTP access to the content branch.

use async_trait::async_trait;
use dossier_manifest_types::{BlogIndex, BlogMetadata, PageManifest};
use reqwest::{Client, Response, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::{
    application::content::{ContentError, ContentResource, ContentSource},
    config::ContentSettings,
};

use super::error::InfraError;

const TARGET: &str = "dossier::infra::content";

/// Fetches manifests and post sources from a static host.
///
/// Every request carries `Cache-Control: no-cache`; freshness is handled by
/// the content cache, not by intermediaries.
#[derive(Clone)]
pub struct HttpContentSource {
    client: Client,
    base_url: Url,
}

impl HttpContentSource {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("dossier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            base_url: directory_url(settings.base_url.clone()),
        })
    }

    fn resolve(&self, path: &str) -> String {
        match self.base_url.join(path.trim_start_matches('/')) {
            Ok(url) => url.into(),
            Err(_) => format!("{}{}", self.base_url, path.trim_start_matches('/')),
        }
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn segments_url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    async fn get(&self, resource: &ContentResource, url: String) -> Result<Response, ContentError> {
        debug!(target: TARGET, %url, "Fetching content");

        let response = self
            .client
            .get(&url)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|err| ContentError::Transport {
                resource: resource.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Status {
                resource: resource.clone(),
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or_else(|| status.as_str())
                    .to_string(),
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: ContentResource,
        url: String,
    ) -> Result<T, ContentError> {
        let response = self.get(&resource, url).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ContentError::Decode {
                resource,
                message: err.to_string(),
            })
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_index(&self) -> Result<BlogIndex, ContentError> {
        let url = self.segments_url(&["manifests", "index.json"]);
        self.get_json(ContentResource::Index, url).await
    }

    async fn fetch_page(&self, page: usize) -> Result<PageManifest, ContentError> {
        let url = self.segments_url(&["manifests", &format!("page-{page}.json")]);
        self.get_json(ContentResource::Page(page), url).await
    }

    async fn fetch_metadata(&self, slug: &str) -> Option<BlogMetadata> {
        let resource = ContentResource::Metadata(slug.to_string());
        let url = self.segments_url(&["manifests", "metadata", &format!("{slug}.json")]);
        match self.get_json(resource, url).await {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(target: TARGET, slug, error = %err, "Post metadata unavailable");
                None
            }
        }
    }

    async fn fetch_post_source(&self, slug: &str) -> Result<String, ContentError> {
        let resource = ContentResource::Post(slug.to_string());
        let url = self.segments_url(&["posts", &format!("{slug}.mdx")]);
        let response = self.get(&resource, url).await?;
        response.text().await.map_err(|err| ContentError::Decode {
            resource,
            message: err.to_string(),
        })
    }

    fn asset_url(&self, path: &str) -> String {
        self.resolve(path)
    }
}

/// Ensure the URL path ends with `/` so relative joins append to it.
fn directory_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
