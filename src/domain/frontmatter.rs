//! Front matter handling for post sources.
//!
//! Posts start with a `---` delimited block of `key: value` lines:
//!
//! ```text
//! ---
//! title: "Operation Daybreak"
//! classification: TOP SECRET
//! ---
//!
//! Body text.
//! ```
//!
//! Values are flat strings; nested YAML is not interpreted.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^---\n.*?\n---\n").expect("front matter pattern must compile"));

static LEADING_FIELDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^---\n(.*?)\n---").expect("front matter pattern must compile"));

/// Remove a leading front matter block, returning the body.
///
/// Only a block at the very start of the source is removed; sources without
/// one are returned unchanged.
pub fn strip_frontmatter(source: &str) -> &str {
    match LEADING_BLOCK.find(source) {
        Some(found) => &source[found.end()..],
        None => source,
    }
}

/// Parsed `key: value` pairs from a leading front matter block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    fields: BTreeMap<String, String>,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Like [`Self::get`] but treats empty values as missing.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Extract the flat front matter fields of a post source.
pub fn extract_frontmatter(source: &str) -> FrontMatter {
    let Some(captures) = LEADING_FIELDS.captures(source) else {
        return FrontMatter::default();
    };
    let Some(block) = captures.get(1) else {
        return FrontMatter::default();
    };

    let mut fields = BTreeMap::new();
    for line in block.as_str().split('\n') {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches(|ch| ch == '"' || ch == '\'');
        fields.insert(key.trim().to_string(), value.to_string());
    }

    FrontMatter { fields }
}
