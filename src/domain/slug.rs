//! Slug helpers for post identifiers and in-document anchors.
//!
//! Post slugs arrive from request paths and are spliced into content-branch
//! URLs, so they are validated before any fetch. Anchors are derived with the
//! `slug` crate and de-duplicated per document.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use slug::slugify;
use thiserror::Error;
use url::Url;

const MAX_POST_SLUG_LEN: usize = 200;

static SEGMENT_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("http://localhost/").expect("segment base URL must parse"));

/// Errors that can occur while validating or deriving a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("post slug `{slug}` contains forbidden characters")]
    Forbidden { slug: String },
    #[error("post slug exceeds {max} characters")]
    TooLong { max: usize },
}

/// Check that a post slug is safe to use as one content path segment.
///
/// Slugs are file stems on the content branch, so any character a file name
/// may carry is accepted, non-ASCII included. Path separators, `..`, a lone
/// `.` and control characters are rejected.
pub fn validate_post_slug(slug: &str) -> Result<&str, SlugError> {
    if slug.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.chars().count() > MAX_POST_SLUG_LEN {
        return Err(SlugError::TooLong {
            max: MAX_POST_SLUG_LEN,
        });
    }

    let forbidden_char = slug
        .chars()
        .any(|ch| matches!(ch, '/' | '\\') || ch.is_control());
    if forbidden_char || slug == "." || slug.contains("..") {
        return Err(SlugError::Forbidden {
            slug: slug.to_string(),
        });
    }

    Ok(slug)
}

/// Percent-encode a slug as a single URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    let mut url = SEGMENT_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}

/// Site-relative link to a post page.
pub fn post_href(slug: &str) -> String {
    format!("/blog/{}", encode_path_segment(slug))
}

/// Derive an anchor slug from human-readable text.
pub fn derive_anchor(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Stateful helper that keeps anchors unique within one document.
#[derive(Debug, Default)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an anchor for the provided text, suffixing repeats with
    /// `-2`, `-3`, ...
    pub fn anchor_for(&mut self, text: &str) -> Result<String, SlugError> {
        let base = derive_anchor(text)?;
        let count = self.occurrences.entry(base.clone()).or_insert(0);
        *count += 1;

        if *count == 1 {
            Ok(base)
        } else {
            Ok(format!("{base}-{}", *count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dated_post_slugs() {
        assert_eq!(
            validate_post_slug("2024-03-01-first-light"),
            Ok("2024-03-01-first-light")
        );
        assert_eq!(validate_post_slug("notes_v1.2"), Ok("notes_v1.2"));
    }

    #[test]
    fn accepts_any_file_stem_characters() {
        assert_eq!(
            validate_post_slug("2024-01-01-café-notes"),
            Ok("2024-01-01-café-notes")
        );
        assert_eq!(
            validate_post_slug("2024-01-01 field report"),
            Ok("2024-01-01 field report")
        );
        assert_eq!(validate_post_slug("q&a #3?"), Ok("q&a #3?"));
    }

    #[test]
    fn rejects_traversal_and_separators() {
        assert!(matches!(
            validate_post_slug("../secrets"),
            Err(SlugError::Forbidden { .. })
        ));
        assert!(matches!(
            validate_post_slug("posts/first"),
            Err(SlugError::Forbidden { .. })
        ));
        assert!(matches!(
            validate_post_slug("posts\\first"),
            Err(SlugError::Forbidden { .. })
        ));
        assert!(matches!(
            validate_post_slug("first\nline"),
            Err(SlugError::Forbidden { .. })
        ));
        assert!(matches!(
            validate_post_slug("."),
            Err(SlugError::Forbidden { .. })
        ));
        assert_eq!(validate_post_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(
            encode_path_segment("2024-01-01-café-notes"),
            "2024-01-01-caf%C3%A9-notes"
        );
        assert_eq!(encode_path_segment("field report"), "field%20report");
        assert_eq!(encode_path_segment("q&a #3?"), "q&a%20%233%3F");
        assert_eq!(post_href("2024-03-01-first-light"), "/blog/2024-03-01-first-light");
    }

    #[test]
    fn rejects_overlong_slugs() {
        let slug = "a".repeat(MAX_POST_SLUG_LEN + 1);
        assert_eq!(
            validate_post_slug(&slug),
            Err(SlugError::TooLong {
                max: MAX_POST_SLUG_LEN
            })
        );
    }

    #[test]
    fn anchor_slugger_deduplicates() {
        let mut slugger = AnchorSlugger::new();

        let first = slugger.anchor_for("Mission Overview").expect("slug");
        let second = slugger.anchor_for("Mission Overview").expect("slug");

        assert_eq!(first, "mission-overview");
        assert_eq!(second, "mission-overview-2");
    }

    #[test]
    fn anchor_rejects_symbol_only_text() {
        assert!(matches!(
            derive_anchor("!!! ???"),
            Err(SlugError::Unrepresentable { .. })
        ));
    }
}
