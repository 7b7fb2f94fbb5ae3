use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::{html::ClassStyle, parsing::SyntaxSet};

use crate::application::render::types::RenderError;

use super::{components::escape_html, highlight};

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) contains_code: bool,
    pub(crate) contains_mermaid: bool,
}

/// Replace fenced code blocks with highlighted HTML. ```` ```mermaid ````
/// fences become client-rendered diagrams, same as the `Mermaid` component.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<RewriteOutcome, RenderError> {
    let mut outcome = RewriteOutcome::default();
    visit(root, syntax_set, class_style, &mut outcome)?;
    Ok(outcome)
}

fn visit<'a>(
    node: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    outcome: &mut RewriteOutcome,
) -> Result<(), RenderError> {
    if let Some((info, literal)) = extract_code_block(node) {
        let language = info.split_whitespace().next();
        let html = if language.is_some_and(|lang| lang.eq_ignore_ascii_case("mermaid")) {
            outcome.contains_mermaid = true;
            format!(
                "<figure class=\"blog-mermaid\"><div class=\"blog-mermaid-diagram\"><pre class=\"mermaid\">{}</pre></div></figure>",
                escape_html(literal.trim())
            )
        } else {
            outcome.contains_code = true;
            highlight::highlight_code(language, &literal, syntax_set, class_style)?
        };

        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: html,
        });
    }

    let mut child = node.first_child();
    while let Some(next) = child {
        visit(next, syntax_set, class_style, outcome)?;
        child = next.next_sibling();
    }

    Ok(())
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use comrak::{Arena, format_html, parse_document};

    use super::*;
    use crate::application::render::service::config::default_options;

    fn rewrite(markdown: &str) -> (String, RewriteOutcome) {
        let options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        let outcome = rewrite_ast(
            root,
            &SyntaxSet::load_defaults_newlines(),
            &ClassStyle::SpacedPrefixed { prefix: "syntax-" },
        )
        .expect("rewrite");
        let mut html = String::new();
        format_html(root, &options, &mut html).expect("format");
        (html, outcome)
    }

    #[test]
    fn fenced_code_is_highlighted() {
        let (html, outcome) = rewrite("```python\nprint('x')\n```\n");
        assert!(outcome.contains_code);
        assert!(!outcome.contains_mermaid);
        assert!(html.contains("syntax-lang-python"));
    }

    #[test]
    fn mermaid_fences_become_diagrams() {
        let (html, outcome) = rewrite("```mermaid\ngraph TD\n  A --> B\n```\n");
        assert!(outcome.contains_mermaid);
        assert!(!outcome.contains_code);
        assert!(html.contains("<pre class=\"mermaid\">graph TD\n  A --&gt; B</pre>"));
    }
}
