//! Expansion of the post component vocabulary into markdown-compatible HTML.
//!
//! Inline components (`Redacted`, `Highlight`) and `CallOut` become raw HTML
//! around markdown children, so the markdown inside them is still rendered by
//! the main pass. Components whose markup would be mangled by markdown
//! (`SectionMarker`, `ImageWithCaption`, `Table`, `Mermaid`) are rendered here
//! and left behind as placeholder paragraphs, restored after sanitisation.

use std::ops::Range;

use comrak::{Options, markdown_to_html};

use crate::{application::render::types::RenderError, domain::slug::AnchorSlugger};

use super::jsx::{self, AttrValue, Element, JsValue};

pub(crate) struct Expansion {
    pub(crate) markdown: String,
    pub(crate) fragments: Vec<Fragment>,
    pub(crate) contains_mermaid: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub(crate) placeholder: String,
    pub(crate) html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalloutKind {
    Info,
    Warning,
    Error,
    Success,
}

impl CalloutKind {
    fn parse(value: &str) -> Self {
        match value.trim() {
            "warning" => CalloutKind::Warning,
            "error" => CalloutKind::Error,
            "success" => CalloutKind::Success,
            _ => CalloutKind::Info,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            CalloutKind::Info => "info",
            CalloutKind::Warning => "warning",
            CalloutKind::Error => "error",
            CalloutKind::Success => "success",
        }
    }
}

pub(crate) fn expand_components(
    source: &str,
    options: &Options<'static>,
) -> Result<Expansion, RenderError> {
    let mut expander = Expander {
        options,
        fragments: Vec::new(),
        slugger: AnchorSlugger::new(),
        contains_mermaid: false,
    };
    let markdown = expander.expand(source, 0..source.len())?;
    Ok(Expansion {
        markdown,
        fragments: expander.fragments,
        contains_mermaid: expander.contains_mermaid,
    })
}

struct Expander<'o> {
    options: &'o Options<'static>,
    fragments: Vec<Fragment>,
    slugger: AnchorSlugger,
    contains_mermaid: bool,
}

impl Expander<'_> {
    fn expand(&mut self, src: &str, range: Range<usize>) -> Result<String, RenderError> {
        let mut out = String::with_capacity(range.len());
        let mut copied = range.start;
        let mut pos = range.start;

        while pos < range.end {
            if let Some(next) = jsx::skip_code(src, pos) {
                pos = next.min(range.end);
                continue;
            }

            let rest = &src[pos..range.end];
            if rest.starts_with("{/*")
                && let Some(close) = rest.find("*/}")
            {
                out.push_str(&src[copied..pos]);
                pos += close + 3;
                copied = pos;
                continue;
            }

            if jsx::starts_closing_component(src, pos) {
                let name = jsx::closing_tag_at(src, pos).map_or("?", |(name, _)| name);
                return Err(RenderError::syntax(
                    name,
                    jsx::line_col(src, pos),
                    format!("unexpected closing tag `</{name}>`"),
                ));
            }

            if jsx::starts_component(src, pos) {
                out.push_str(&src[copied..pos]);
                let element = jsx::parse_element(src, pos)?;
                let rendered = self.render(src, &element)?;
                out.push_str(&rendered);
                pos = element.end;
                copied = pos;
                continue;
            }

            pos += rest.chars().next().map_or(1, char::len_utf8);
        }

        out.push_str(&src[copied..range.end]);
        Ok(out)
    }

    fn render(&mut self, src: &str, element: &Element<'_>) -> Result<String, RenderError> {
        match element.name {
            "Redacted" => self.wrap(src, element, "<span class=\"redacted\">", "</span>"),
            "Highlight" => self.wrap(src, element, "<mark class=\"blog-highlight\">", "</mark>"),
            "CallOut" => self.callout(src, element),
            "SectionMarker" => self.section_marker(src, element),
            "ImageWithCaption" => self.image_with_caption(src, element),
            "Table" => self.table(src, element),
            "Mermaid" => self.mermaid(src, element),
            other => Err(RenderError::UnknownComponent {
                name: other.to_string(),
            }),
        }
    }

    fn children(&mut self, src: &str, element: &Element<'_>) -> Result<String, RenderError> {
        match &element.children {
            Some(range) => self.expand(src, range.clone()),
            None => Ok(String::new()),
        }
    }

    /// Wrap children in an inline element. When the opening tag ends its
    /// line the children form their own blocks, so the tags are fenced by
    /// blank lines and the markdown between them is still parsed.
    fn wrap(
        &mut self,
        src: &str,
        element: &Element<'_>,
        open: &str,
        close: &str,
    ) -> Result<String, RenderError> {
        let children = self.children(src, element)?;
        if opens_block(src, element) {
            Ok(format!(
                "\n\n{open}\n\n{}\n\n{close}\n\n",
                dedent(&children).trim()
            ))
        } else {
            Ok(format!("{open}{children}{close}"))
        }
    }

    fn callout(&mut self, src: &str, element: &Element<'_>) -> Result<String, RenderError> {
        let kind = element
            .text_attr("type")
            .map_or(CalloutKind::Info, |value| CalloutKind::parse(&value));
        let body = dedent(&self.children(src, element)?);
        Ok(format!(
            "\n\n<div class=\"blog-callout blog-callout-{}\">\n\n{}\n\n</div>\n\n",
            kind.as_str(),
            body.trim()
        ))
    }

    fn section_marker(&mut self, src: &str, element: &Element<'_>) -> Result<String, RenderError> {
        let number = element.text_attr("number").unwrap_or_default();
        let title = self.children(src, element)?;
        let title_html = self.render_inline(&title);

        let id_attr = self
            .slugger
            .anchor_for(&format!("section {number} {}", title.trim()))
            .map(|anchor| format!(" id=\"{}\"", escape_html(&anchor)))
            .unwrap_or_default();

        Ok(self.fragment(format!(
            "<h2 class=\"section-title\"{id_attr}><span class=\"section-marker\">§ {}</span>{title_html}</h2>",
            escape_html(&number)
        )))
    }

    fn image_with_caption(
        &mut self,
        src: &str,
        element: &Element<'_>,
    ) -> Result<String, RenderError> {
        let image_src = element.text_attr("src").ok_or_else(|| {
            RenderError::syntax(
                element.name,
                jsx::line_col(src, element.start),
                "missing required prop `src`",
            )
        })?;
        let caption = element.text_attr("caption").unwrap_or_default();
        let alt = element
            .text_attr("alt")
            .filter(|alt| !alt.is_empty())
            .unwrap_or_else(|| caption.clone());

        Ok(self.fragment(format!(
            "<figure class=\"blog-figure\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\"><figcaption class=\"blog-caption\">{}</figcaption></figure>",
            escape_html(&image_src),
            escape_html(&alt),
            escape_html(&caption)
        )))
    }

    fn table(&mut self, src: &str, element: &Element<'_>) -> Result<String, RenderError> {
        let headers = array_prop(src, element, "headers")?;
        let rows = array_prop(src, element, "rows")?;

        let mut html = String::from("<table class=\"blog-table\"><thead><tr>");
        for header in &headers {
            html.push_str("<th>");
            html.push_str(&self.cell_html(header)?);
            html.push_str("</th>");
        }
        html.push_str("</tr></thead><tbody>");

        for row in &rows {
            html.push_str("<tr>");
            let cells = match row {
                JsValue::Array(cells) => cells.as_slice(),
                single => std::slice::from_ref(single),
            };
            for cell in cells {
                html.push_str("<td>");
                html.push_str(&self.cell_html(cell)?);
                html.push_str("</td>");
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table>");

        Ok(self.fragment(html))
    }

    fn cell_html(&mut self, value: &JsValue) -> Result<String, RenderError> {
        match value {
            JsValue::Str(text) | JsValue::Other(text) => Ok(escape_html(text)),
            JsValue::Element(raw) => {
                let markdown = self.expand(raw, 0..raw.len())?;
                Ok(self.render_inline(&markdown))
            }
            JsValue::Array(items) => {
                let parts = items
                    .iter()
                    .map(|item| self.cell_html(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(" "))
            }
        }
    }

    fn mermaid(&mut self, src: &str, element: &Element<'_>) -> Result<String, RenderError> {
        let raw = element
            .children
            .clone()
            .map(|range| src[range].trim().to_string())
            .unwrap_or_default();

        let definition = match raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(expr) => match jsx::parse_js_value(expr) {
                Ok(JsValue::Str(text)) | Ok(JsValue::Other(text)) => text,
                Ok(_) => String::new(),
                Err(reason) => {
                    return Err(RenderError::syntax(
                        element.name,
                        jsx::line_col(src, element.start),
                        reason,
                    ));
                }
            },
            None => raw,
        };
        let definition = definition.trim();

        if definition.is_empty() {
            return Ok(self.fragment(
                "<div class=\"blog-mermaid-error\"><div class=\"blog-callout blog-callout-error\"><strong>Diagram Rendering Error:</strong><pre>Diagram definition is empty</pre></div></div>"
                    .to_string(),
            ));
        }

        self.contains_mermaid = true;
        let caption = element
            .text_attr("caption")
            .filter(|caption| !caption.is_empty())
            .map(|caption| {
                format!(
                    "<figcaption class=\"blog-caption\">{}</figcaption>",
                    escape_html(&caption)
                )
            })
            .unwrap_or_default();

        Ok(self.fragment(format!(
            "<figure class=\"blog-mermaid\"><div class=\"blog-mermaid-diagram\"><pre class=\"mermaid\">{}</pre></div>{caption}</figure>",
            escape_html(definition)
        )))
    }

    /// Register pre-rendered HTML, returning the placeholder paragraph that
    /// stands in for it during the markdown pass.
    fn fragment(&mut self, html: String) -> String {
        let placeholder = format!("DOSSIERFRAGMENT{}X", self.fragments.len());
        let paragraph = format!("\n\n{placeholder}\n\n");
        self.fragments.push(Fragment { placeholder, html });
        paragraph
    }

    fn render_inline(&self, markdown: &str) -> String {
        let html = markdown_to_html(markdown.trim(), self.options);
        let trimmed = html.trim();
        match trimmed
            .strip_prefix("<p>")
            .and_then(|rest| rest.strip_suffix("</p>"))
        {
            Some(inner) if !inner.contains("<p>") => inner.to_string(),
            _ => trimmed.to_string(),
        }
    }
}

fn array_prop(src: &str, element: &Element<'_>, name: &str) -> Result<Vec<JsValue>, RenderError> {
    let invalid = |reason: String| {
        RenderError::syntax(element.name, jsx::line_col(src, element.start), reason)
    };

    match element.attr(name) {
        None => Ok(Vec::new()),
        Some(AttrValue::Expression(expr)) => match jsx::parse_js_value(expr) {
            Ok(JsValue::Array(items)) => Ok(items),
            Ok(_) => Err(invalid(format!("prop `{name}` must be an array"))),
            Err(reason) => Err(invalid(format!("prop `{name}`: {reason}"))),
        },
        Some(_) => Err(invalid(format!("prop `{name}` must be an array"))),
    }
}

fn opens_block(src: &str, element: &Element<'_>) -> bool {
    element.children.as_ref().is_some_and(|range| {
        let rest = src[range.clone()].trim_start_matches([' ', '\t']);
        rest.starts_with('\n') || rest.starts_with("\r\n")
    })
}

/// Remove the indentation shared by all non-blank lines.
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::service::config::default_options;

    fn expand(source: &str) -> Expansion {
        expand_components(source, &default_options()).expect("expansion")
    }

    #[test]
    fn inline_components_wrap_markdown() {
        let out = expand("Agent <Redacted>**J.**</Redacted> saw <Highlight>it</Highlight>.");
        assert_eq!(
            out.markdown,
            "Agent <span class=\"redacted\">**J.**</span> saw <mark class=\"blog-highlight\">it</mark>."
        );
        assert!(out.fragments.is_empty());
    }

    #[test]
    fn block_inline_components_fence_their_children() {
        let out = expand("<Redacted>\n**secret** agent\n</Redacted>");
        assert_eq!(
            out.markdown,
            "\n\n<span class=\"redacted\">\n\n**secret** agent\n\n</span>\n\n"
        );
    }

    #[test]
    fn callout_defaults_to_info_and_dedents_children() {
        let out = expand("<CallOut>\n    - one\n    - two\n</CallOut>");
        assert!(out.markdown.contains("<div class=\"blog-callout blog-callout-info\">"));
        assert!(out.markdown.contains("\n- one\n- two\n"));

        let warning = expand("<CallOut type=\"warning\">Careful</CallOut>");
        assert!(warning.markdown.contains("blog-callout-warning"));
    }

    #[test]
    fn section_marker_becomes_fragment_with_anchor() {
        let out = expand("<SectionMarker number=\"1.0\">Mission Overview</SectionMarker>");
        assert_eq!(out.fragments.len(), 1);
        assert_eq!(out.markdown.trim(), "DOSSIERFRAGMENT0X");
        assert_eq!(
            out.fragments[0].html,
            "<h2 class=\"section-title\" id=\"section-1-0-mission-overview\"><span class=\"section-marker\">§ 1.0</span>Mission Overview</h2>"
        );
    }

    #[test]
    fn image_alt_falls_back_to_caption() {
        let out = expand("<ImageWithCaption src=\"/img.jpg\" caption=\"Fig 1\" />");
        assert!(out.fragments[0].html.contains("alt=\"Fig 1\""));
        assert!(out.fragments[0].html.contains("<figcaption class=\"blog-caption\">Fig 1</figcaption>"));
    }

    #[test]
    fn table_renders_headers_and_jsx_cells() {
        let out = expand(
            "<Table\n  headers={['Metric', 'Value']}\n  rows={[\n    ['Cache Hit Rate', <Highlight>87%</Highlight>],\n  ]}\n/>",
        );
        let html = &out.fragments[0].html;
        assert!(html.starts_with("<table class=\"blog-table\"><thead><tr><th>Metric</th><th>Value</th></tr></thead>"));
        assert!(html.contains("<td>Cache Hit Rate</td><td><mark class=\"blog-highlight\">87%</mark></td>"));
    }

    #[test]
    fn mermaid_reads_template_literal_children() {
        let out = expand("<Mermaid caption=\"Fig 2\">\n{`\ngraph TD\n  A --> B\n`}\n</Mermaid>");
        assert!(out.contains_mermaid);
        let html = &out.fragments[0].html;
        assert!(html.contains("<pre class=\"mermaid\">graph TD\n  A --&gt; B</pre>"));
        assert!(html.contains("<figcaption class=\"blog-caption\">Fig 2</figcaption>"));
    }

    #[test]
    fn empty_mermaid_renders_error_callout() {
        let out = expand("<Mermaid>{``}</Mermaid>");
        assert!(!out.contains_mermaid);
        assert!(out.fragments[0].html.contains("Diagram Rendering Error:"));
    }

    #[test]
    fn components_inside_code_are_left_alone() {
        let source = "```jsx\n<Unknown />\n```\n\nUse `<Redacted>` inline.";
        assert_eq!(expand(source).markdown, source);
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(expand("a {/* note */}b").markdown, "a b");
    }

    #[test]
    fn unknown_component_is_rejected() {
        let err = expand_components("<Classified>x</Classified>", &default_options())
            .err()
            .expect("unknown component");
        assert!(err.to_string().starts_with("Expected component `Classified` to be defined"));
    }

    #[test]
    fn stray_closing_tag_is_rejected() {
        let err = expand_components("text </CallOut>", &default_options())
            .err()
            .expect("stray tag");
        assert!(err.to_string().contains("unexpected closing tag `</CallOut>`"));
    }
}
