//! Tokenizer for the JSX subset allowed in post bodies.
//!
//! Covers component tags with string, expression and flag attributes,
//! matched closing tags, and the literal JavaScript values (strings, arrays,
//! nested elements) that table props are written in. Offsets are byte
//! offsets into the source being scanned.

use std::ops::Range;

use crate::application::render::types::RenderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrValue {
    /// `name="text"` or `name='text'`
    Literal(String),
    /// `name={expression}`, braces removed.
    Expression(String),
    /// `name` without a value.
    Flag,
}

impl AttrValue {
    /// Plain text of the attribute. String, template and bare expressions are
    /// unwrapped; arrays and flags have no text.
    pub(crate) fn as_text(&self) -> Option<String> {
        match self {
            AttrValue::Literal(value) => Some(value.clone()),
            AttrValue::Expression(expr) => match parse_js_value(expr) {
                Ok(JsValue::Str(value)) | Ok(JsValue::Other(value)) => Some(value),
                _ => None,
            },
            AttrValue::Flag => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Element<'a> {
    pub(crate) name: &'a str,
    pub(crate) attributes: Vec<(String, AttrValue)>,
    /// Inner source range; `None` for self-closing tags.
    pub(crate) children: Option<Range<usize>>,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Element<'_> {
    pub(crate) fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub(crate) fn text_attr(&self, name: &str) -> Option<String> {
        self.attr(name).and_then(AttrValue::as_text)
    }
}

struct OpenTag<'a> {
    name: &'a str,
    attributes: Vec<(String, AttrValue)>,
    self_closing: bool,
    end: usize,
}

/// 1-based line and column of `pos`.
pub(crate) fn line_col(src: &str, pos: usize) -> (usize, usize) {
    let before = &src[..pos.min(src.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map_or(0, |tail| tail.chars().count())
        + 1;
    (line, column)
}

/// `true` when `pos` opens a capitalised component tag.
pub(crate) fn starts_component(src: &str, pos: usize) -> bool {
    let bytes = src.as_bytes();
    bytes.get(pos) == Some(&b'<') && bytes.get(pos + 1).is_some_and(u8::is_ascii_uppercase)
}

/// `true` when `pos` starts a capitalised closing tag.
pub(crate) fn starts_closing_component(src: &str, pos: usize) -> bool {
    let bytes = src.as_bytes();
    bytes.get(pos) == Some(&b'<')
        && bytes.get(pos + 1) == Some(&b'/')
        && bytes.get(pos + 2).is_some_and(u8::is_ascii_uppercase)
}

/// Parse `</Name>` at `pos`, returning the name and the offset after `>`.
pub(crate) fn closing_tag_at(src: &str, pos: usize) -> Option<(&str, usize)> {
    if !src[pos..].starts_with("</") {
        return None;
    }
    let name_start = pos + 2;
    let name_end = scan_while(src, name_start, is_name_char);
    if name_end == name_start {
        return None;
    }
    let after = skip_whitespace(src, name_end);
    (char_at(src, after) == Some('>')).then(|| (&src[name_start..name_end], after + 1))
}

/// Parse the element whose opening `<` is at `start`.
pub(crate) fn parse_element(src: &str, start: usize) -> Result<Element<'_>, RenderError> {
    let open = parse_open_tag(src, start)?;
    if open.self_closing {
        return Ok(Element {
            name: open.name,
            attributes: open.attributes,
            children: None,
            start,
            end: open.end,
        });
    }

    let mut depth = 1usize;
    let mut pos = open.end;
    while pos < src.len() {
        if let Some(next) = skip_code(src, pos) {
            pos = next;
            continue;
        }
        if src.as_bytes()[pos] == b'{'
            && let Some(end) = read_expression(src, pos)
        {
            pos = end;
            continue;
        }
        if let Some((name, close_end)) = closing_tag_at(src, pos) {
            if name == open.name {
                depth -= 1;
                if depth == 0 {
                    return Ok(Element {
                        name: open.name,
                        attributes: open.attributes,
                        children: Some(open.end..pos),
                        start,
                        end: close_end,
                    });
                }
            }
            pos = close_end;
            continue;
        }
        if starts_component(src, pos) {
            let nested = parse_open_tag(src, pos)?;
            if nested.name == open.name && !nested.self_closing {
                depth += 1;
            }
            pos = nested.end;
            continue;
        }
        pos += char_at(src, pos).map_or(1, char::len_utf8);
    }

    Err(RenderError::syntax(
        open.name,
        line_col(src, start),
        format!("expected a closing tag for `<{}>`", open.name),
    ))
}

fn parse_open_tag(src: &str, start: usize) -> Result<OpenTag<'_>, RenderError> {
    let name_end = scan_while(src, start + 1, is_name_char);
    let name = &src[start + 1..name_end];
    let mut attributes = Vec::new();
    let mut pos = name_end;

    loop {
        pos = skip_whitespace(src, pos);
        let Some(current) = char_at(src, pos) else {
            return Err(RenderError::syntax(
                name,
                line_col(src, start),
                "unexpected end of file in tag",
            ));
        };

        match current {
            '>' => {
                return Ok(OpenTag {
                    name,
                    attributes,
                    self_closing: false,
                    end: pos + 1,
                });
            }
            '/' => match char_at(src, pos + 1) {
                Some('>') => {
                    return Ok(OpenTag {
                        name,
                        attributes,
                        self_closing: true,
                        end: pos + 2,
                    });
                }
                Some(found) => {
                    return Err(RenderError::unexpected(
                        name,
                        found,
                        line_col(src, pos + 1),
                    ));
                }
                None => {
                    return Err(RenderError::syntax(
                        name,
                        line_col(src, start),
                        "unexpected end of file in tag",
                    ));
                }
            },
            // Spread attributes carry nothing we can evaluate.
            '{' => {
                pos = read_expression(src, pos).ok_or_else(|| {
                    RenderError::syntax(name, line_col(src, pos), "unclosed `{` in tag")
                })?;
            }
            c if c.is_alphabetic() || c == '_' => {
                let attr_end = scan_while(src, pos, |c| {
                    c.is_alphanumeric() || matches!(c, '_' | '-' | ':')
                });
                let attr_name = src[pos..attr_end].to_string();
                let after = skip_whitespace(src, attr_end);
                if char_at(src, after) == Some('=') {
                    let value_start = skip_whitespace(src, after + 1);
                    let (value, next) = parse_attr_value(src, value_start, name)?;
                    attributes.push((attr_name, value));
                    pos = next;
                } else {
                    attributes.push((attr_name, AttrValue::Flag));
                    pos = attr_end;
                }
            }
            other => return Err(RenderError::unexpected(name, other, line_col(src, pos))),
        }
    }
}

fn parse_attr_value(
    src: &str,
    pos: usize,
    component: &str,
) -> Result<(AttrValue, usize), RenderError> {
    match char_at(src, pos) {
        Some(quote @ ('"' | '\'')) => {
            let body_start = pos + 1;
            let offset = src[body_start..].find(quote).ok_or_else(|| {
                RenderError::syntax(component, line_col(src, pos), "unclosed attribute string")
            })?;
            let value = src[body_start..body_start + offset].to_string();
            Ok((AttrValue::Literal(value), body_start + offset + 1))
        }
        Some('{') => {
            let end = read_expression(src, pos).ok_or_else(|| {
                RenderError::syntax(
                    component,
                    line_col(src, pos),
                    "unclosed attribute expression",
                )
            })?;
            let expr = src[pos + 1..end - 1].trim().to_string();
            Ok((AttrValue::Expression(expr), end))
        }
        Some(other) => Err(RenderError::unexpected(
            component,
            other,
            line_col(src, pos),
        )),
        None => Err(RenderError::syntax(
            component,
            line_col(src, pos),
            "unexpected end of file in tag",
        )),
    }
}

/// Offset just past the `}` matching the `{` at `open`, skipping string
/// literals and comments. `None` when unbalanced.
pub(crate) fn read_expression(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut pos = open;

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(pos + 1);
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                pos = skip_js_string(bytes, pos, quote)?;
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                let close = src[pos + 2..].find("*/")?;
                pos = pos + 2 + close + 2;
                continue;
            }
            _ => {}
        }
        pos += 1;
    }

    None
}

fn skip_js_string(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut pos = open + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            byte if byte == quote => return Some(pos + 1),
            _ => pos += 1,
        }
    }
    None
}

/// When `pos` starts a fenced code block or an inline code span, the offset
/// just past it.
pub(crate) fn skip_code(src: &str, pos: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    if (pos == 0 || bytes.get(pos - 1) == Some(&b'\n'))
        && let Some(end) = skip_fence(src, pos)
    {
        return Some(end);
    }
    (bytes.get(pos) == Some(&b'`')).then(|| skip_code_span(bytes, pos))
}

fn skip_fence(src: &str, pos: usize) -> Option<usize> {
    let line_end = line_end(src, pos);
    let line = &src[pos..line_end];
    let rest = line.trim_start_matches(' ');
    if line.len() - rest.len() > 3 {
        return None;
    }

    let marker = rest.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let run = rest.len() - rest.trim_start_matches(marker).len();
    if run < 3 {
        return None;
    }

    let mut cursor = line_end;
    while cursor < src.len() {
        let start = cursor + 1;
        let end = line_end_from(src, start);
        let candidate = src[start..end].trim();
        let closing = candidate.len() - candidate.trim_start_matches(marker).len();
        if closing >= run && candidate.trim_start_matches(marker).is_empty() {
            return Some(end);
        }
        cursor = end;
    }

    Some(src.len())
}

fn skip_code_span(bytes: &[u8], pos: usize) -> usize {
    let run = count_run(bytes, pos, b'`');
    let mut search = pos + run;
    while search < bytes.len() {
        if bytes[search] == b'`' {
            let closing = count_run(bytes, search, b'`');
            if closing == run {
                return search + closing;
            }
            search += closing;
        } else {
            search += 1;
        }
    }
    // Unmatched: the backticks are literal text.
    pos + run
}

fn count_run(bytes: &[u8], pos: usize, byte: u8) -> usize {
    bytes[pos..].iter().take_while(|b| **b == byte).count()
}

fn line_end(src: &str, pos: usize) -> usize {
    line_end_from(src, pos)
}

fn line_end_from(src: &str, pos: usize) -> usize {
    if pos >= src.len() {
        return src.len();
    }
    src[pos..].find('\n').map_or(src.len(), |offset| pos + offset)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn char_at(src: &str, pos: usize) -> Option<char> {
    src.get(pos..).and_then(|rest| rest.chars().next())
}

fn scan_while(src: &str, pos: usize, pred: impl Fn(char) -> bool) -> usize {
    let rest = &src[pos..];
    rest.char_indices()
        .find(|(_, c)| !pred(*c))
        .map_or(src.len(), |(offset, _)| pos + offset)
}

fn skip_whitespace(src: &str, pos: usize) -> usize {
    scan_while(src, pos, char::is_whitespace)
}

/// Literal JavaScript values accepted in component props.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JsValue {
    Str(String),
    Array(Vec<JsValue>),
    /// Raw source of a JSX element.
    Element(String),
    /// Numbers, identifiers and anything else, kept verbatim.
    Other(String),
}

pub(crate) fn parse_js_value(expr: &str) -> Result<JsValue, String> {
    let mut parser = JsParser { src: expr, pos: 0 };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < expr.len() {
        return Err(format!(
            "unexpected trailing input `{}`",
            &expr[parser.pos..]
        ));
    }
    Ok(value)
}

struct JsParser<'a> {
    src: &'a str,
    pos: usize,
}

impl JsParser<'_> {
    fn peek(&self) -> Option<char> {
        char_at(self.src, self.pos)
    }

    fn skip_ws(&mut self) {
        self.pos = skip_whitespace(self.src, self.pos);
    }

    fn value(&mut self) -> Result<JsValue, String> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.array(),
            Some(quote @ ('"' | '\'' | '`')) => self.string(quote).map(JsValue::Str),
            Some('<') => self.element(),
            Some(_) => Ok(self.bare()),
            None => Err("expected a value".to_string()),
        }
    }

    fn array(&mut self) -> Result<JsValue, String> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(JsValue::Array(items));
                }
                None => return Err("unclosed array literal".to_string()),
                Some(_) => {}
            }

            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                Some(other) => return Err(format!("expected `,` or `]`, found `{other}`")),
                None => return Err("unclosed array literal".to_string()),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        let body_start = self.pos + 1;
        let mut out = String::new();
        let mut chars = self.src[body_start..].char_indices();
        while let Some((offset, c)) = chars.next() {
            if c == quote {
                self.pos = body_start + offset + 1;
                return Ok(out);
            }
            if c == '\\' {
                match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, other)) => out.push(other),
                    None => break,
                }
            } else {
                out.push(c);
            }
        }
        Err("unclosed string literal".to_string())
    }

    fn element(&mut self) -> Result<JsValue, String> {
        let element = parse_element(self.src, self.pos).map_err(|err| err.to_string())?;
        let raw = self.src[self.pos..element.end].to_string();
        self.pos = element.end;
        Ok(JsValue::Element(raw))
    }

    fn bare(&mut self) -> JsValue {
        let start = self.pos;
        let mut depth = 0i32;
        for (offset, c) in self.src[start..].char_indices() {
            match c {
                '(' | '{' | '[' => depth += 1,
                ')' | '}' => depth -= 1,
                ']' if depth > 0 => depth -= 1,
                ',' | ']' if depth == 0 => {
                    self.pos = start + offset;
                    return JsValue::Other(self.src[start..self.pos].trim().to_string());
                }
                _ => {}
            }
        }
        self.pos = self.src.len();
        JsValue::Other(self.src[start..].trim().to_string())
    }
}
