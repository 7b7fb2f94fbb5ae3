mod components;
mod config;
mod highlight;
mod jsx;
mod rewrite;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::Lazy;
use syntect::{html::ClassStyle, parsing::SyntaxSet};

use crate::application::render::types::{CompiledPost, RenderError, RenderService};
use crate::domain::frontmatter::strip_frontmatter;

use components::{Fragment, expand_components};
use config::{build_post_sanitizer, default_options};
use rewrite::rewrite_ast;

/// MDX compiler: component expansion, Comrak markdown, Syntect highlighting
/// and Ammonia sanitisation.
pub struct MdxRenderService {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
}

impl MdxRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: build_post_sanitizer(),
        }
    }
}

static RENDER_SERVICE: Lazy<Arc<MdxRenderService>> =
    Lazy::new(|| Arc::new(MdxRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<MdxRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for MdxRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for MdxRenderService {
    fn compile(&self, source: &str) -> Result<CompiledPost, RenderError> {
        let body = strip_frontmatter(source);
        let expansion = expand_components(body, &self.options)?;

        let arena = Arena::new();
        let root = parse_document(&arena, &expansion.markdown, &self.options);
        let rewrite = rewrite_ast(root, &self.syntax_set, &self.class_style)?;

        let rendered_html = render_html_stage(root, &self.options)?;
        let sanitized_html = self.sanitizer.clean(&rendered_html).to_string();
        let html = restore_stage(sanitized_html, &expansion.fragments, &self.sanitizer);

        Ok(CompiledPost {
            html,
            contains_code: rewrite.contains_code,
            contains_mermaid: rewrite.contains_mermaid || expansion.contains_mermaid,
        })
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

/// Swap placeholders for their sanitised fragments. Outer fragments are
/// registered after the fragments nested in them, so walking in reverse
/// inserts containers before their contents.
fn restore_stage(
    html: String,
    fragments: &[Fragment],
    sanitizer: &ammonia::Builder<'static>,
) -> String {
    fragments.iter().rev().fold(html, |acc, fragment| {
        let clean = sanitizer.clean(&fragment.html).to_string();
        let block = format!("<p>{}</p>", fragment.placeholder);
        if acc.contains(&block) {
            acc.replace(&block, &clean)
        } else {
            acc.replace(&fragment.placeholder, &clean)
        }
    })
}
