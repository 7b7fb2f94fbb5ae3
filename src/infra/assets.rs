//! Embedded static asset serving.

use std::borrow::Cow;

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::{Mime, MimeGuess};

use crate::application::error::ErrorReport;

static STATIC_PUBLIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static/public");

const SOURCE: &str = "infra::assets::serve_public";

/// Serve embedded public assets under `/static/public/`.
pub async fn serve_public(path: Option<Path<String>>) -> Response {
    let captured = path.map(|Path(value)| value);
    match resolve_asset(&STATIC_PUBLIC_ASSETS, captured) {
        Some(asset) => asset.into_response(),
        None => not_found_response(),
    }
}

fn not_found_response() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

struct Asset<'a> {
    contents: Cow<'a, [u8]>,
    mime: MimeGuess,
}

fn resolve_asset(bundle: &'static Dir<'static>, path: Option<String>) -> Option<Asset<'static>> {
    let candidate = path.unwrap_or_default();
    let candidate = candidate.trim_start_matches('/');

    // No traversal, no directory listings.
    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        return None;
    }

    let file = bundle.get_file(candidate)?;
    Some(Asset {
        contents: Cow::Borrowed(file.contents()),
        mime: mime_guess::from_path(candidate),
    })
}

impl IntoResponse for Asset<'static> {
    fn into_response(self) -> Response {
        let mime = self.mime.first_or_octet_stream();
        match self.contents {
            Cow::Borrowed(slice) => build_response(Bytes::from_static(slice), mime),
            Cow::Owned(bytes) => build_response(Bytes::from(bytes), mime),
        }
    }
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_stylesheet_resolves() {
        let asset = resolve_asset(&STATIC_PUBLIC_ASSETS, Some("app.css".to_string()))
            .expect("app.css is embedded");
        assert_eq!(asset.mime.first_or_octet_stream().essence_str(), "text/css");
    }

    #[test]
    fn traversal_and_directories_are_rejected() {
        assert!(resolve_asset(&STATIC_PUBLIC_ASSETS, Some("../Cargo.toml".into())).is_none());
        assert!(resolve_asset(&STATIC_PUBLIC_ASSETS, Some("js/".into())).is_none());
        assert!(resolve_asset(&STATIC_PUBLIC_ASSETS, None).is_none());
    }
}
