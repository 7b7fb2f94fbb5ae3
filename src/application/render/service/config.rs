use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::{ListStyleType, Options};

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Allowlist for post bodies: markdown output, highlighted code, and the
/// markup produced by post components.
pub(crate) fn build_post_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "del",
        "details",
        "div",
        "dd",
        "dl",
        "dt",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "ins",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "summary",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "aria-hidden",
        "aria-label",
        "role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
        "data-footnote-backref-idx",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes(
        "img",
        &["title", "width", "height", "alt", "loading", "decoding"],
    );
    builder.add_tag_attributes("code", &["data-meta", "data-language", "class"]);
    builder.add_tag_attributes("pre", &["class", "data-language"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled", "class"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.multiline_block_quotes = true;
    ext.alerts = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.full_info_string = true;
    render.tasklist_classes = true;
    render.list_style = ListStyleType::Dash;
    // Component expansion emits raw HTML; the sanitizer runs afterwards.
    render.r#unsafe = true;
    render.sourcepos = false;
    render.gfm_quirks = true;
}
