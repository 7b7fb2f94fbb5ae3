use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

use super::components::escape_html;

/// Highlight a fenced code block into `syntax-` classed spans.
pub(crate) fn highlight_code(
    language: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let lang_token = language.unwrap_or("text").to_ascii_lowercase();
    let syntax =
        find_syntax(syntax_set, &lang_token).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut source = code.to_string();
    if !source.ends_with('\n') {
        source.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);
    for line in LinesWithEndings::from(source.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: lang_token.clone(),
                message: err.to_string(),
            })?;
    }

    let lang = escape_html(&lang_token);
    Ok(format!(
        "<pre class=\"syntax-highlight syntax-lang-{lang}\" data-language=\"{lang}\"><code class=\"language-{lang} syntax-code\">{}</code></pre>",
        generator.finalize()
    ))
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    syntax_set
        .find_syntax_by_token(token)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlight(language: Option<&str>, code: &str) -> String {
        highlight_code(
            language,
            code,
            &SyntaxSet::load_defaults_newlines(),
            &ClassStyle::SpacedPrefixed { prefix: "syntax-" },
        )
        .expect("highlight")
    }

    #[test]
    fn known_language_gets_classed_spans() {
        let html = highlight(Some("Rust"), "fn main() {}");
        assert!(html.starts_with("<pre class=\"syntax-highlight syntax-lang-rust\""));
        assert!(html.contains("class=\"syntax-"));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let html = highlight(Some("klingon"), "<b>qapla'</b>");
        assert!(html.contains("data-language=\"klingon\""));
        assert!(html.contains("&lt;b&gt;"));
    }
}
