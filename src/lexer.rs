//! Tag lexer
//!
//! Splits markup text (schema or document) into an ordered list of tag tokens.
//! Line breaks and tabs are stripped between tags, whitespace between tags is dropped, and
//! processing instructions and comments are skipped. Text content is folded
//! into its enclosing tag, so `<a>text</a>` is a single token.

use crate::error::{Error, Result};
use quick_xml::escape::unescape;
use std::borrow::Cow;

/// Split markup text into tag tokens
pub fn tokenize(text: &str) -> Result<Vec<String>> {
    // Line breaks and tabs vanish between tags but separate words inside one.
    let mut cleaned = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '\r' | '\n' | '\t' if in_tag => cleaned.push(' '),
            '\r' | '\n' | '\t' => {}
            '<' => {
                in_tag = true;
                cleaned.push(c);
            }
            '>' => {
                in_tag = false;
                cleaned.push(c);
            }
            _ => cleaned.push(c),
        }
    }
    let src = cleaned.as_str();

    let mut tokens: Vec<String> = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let rest = &src[pos..];

        if rest.starts_with(' ') {
            pos += 1;
            continue;
        }

        if rest.starts_with("<?") {
            pos += skip_past(rest, "?>", "processing instruction")?;
        } else if rest.starts_with("<!--") {
            pos += skip_past(rest, "-->", "comment")?;
        } else if rest.starts_with("<!") {
            return Err(Error::Xml(format!(
                "unsupported markup declaration: {}",
                snippet(rest)
            )));
        } else if rest.starts_with('<') {
            let len = tag_len(rest)?;
            tokens.push(rest[..len].to_string());
            pos += len;
        } else {
            let text_len = rest.find('<').unwrap_or(rest.len());
            let content = &rest[..text_len];
            pos += text_len;

            if content.trim().is_empty() {
                continue;
            }

            let open = match tokens.last() {
                Some(last) if is_open_tag(last) => last,
                _ => {
                    return Err(Error::Xml(format!(
                        "text outside of an element: {}",
                        snippet(content)
                    )))
                }
            };

            let rest = &src[pos..];
            if !rest.starts_with("</") {
                return Err(Error::Xml(format!(
                    "mixed content is not supported after {}",
                    open
                )));
            }
            let close_len = tag_len(rest)?;
            let merged = format!("{}{}{}", open, content, &rest[..close_len]);
            pos += close_len;

            if let Some(last) = tokens.last_mut() {
                *last = merged;
            }
        }
    }

    Ok(tokens)
}

/// Length of the tag starting at the beginning of `text`, including `>`
///
/// A `<` outside of quotes before the closing `>` is a tag inside a tag.
fn tag_len(text: &str) -> Result<usize> {
    let mut quote: Option<char> = None;

    for (idx, c) in text.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '<') => {
                return Err(Error::Xml(format!("tag inside tag: {}", snippet(text))));
            }
            (None, '>') => return Ok(idx + 1),
            _ => {}
        }
    }

    Err(Error::Xml(format!("unterminated tag: {}", snippet(text))))
}

fn skip_past(text: &str, terminator: &str, what: &str) -> Result<usize> {
    text.find(terminator)
        .map(|idx| idx + terminator.len())
        .ok_or_else(|| Error::Xml(format!("unterminated {}: {}", what, snippet(text))))
}

fn is_open_tag(token: &str) -> bool {
    token.starts_with('<') && !token.starts_with("</") && !token.ends_with("/>")
        && !token.contains("</")
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(40) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Split the inside of a tag (without `<`, `</`, `/>` or `>`) into its name
/// and the remaining attribute text
pub fn split_name(inner: &str) -> (&str, &str) {
    let inner = inner.trim();
    match inner.find(' ') {
        Some(idx) => (&inner[..idx], inner[idx..].trim()),
        None => (inner, ""),
    }
}

/// Local part of a possibly prefixed name
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Parse `name="value"` pairs, unescaping values
pub fn parse_attributes(text: &str) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| Error::Xml(format!("attribute without value: {}", snippet(rest))))?;
        let name = rest[..eq].trim();
        if name.is_empty() || name.contains(' ') {
            return Err(Error::Xml(format!("malformed attribute: {}", snippet(rest))));
        }

        let after = rest[eq + 1..].trim_start();
        let quote = after
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| Error::Xml(format!("unquoted attribute '{}'", name)))?;
        let end = after[1..]
            .find(quote)
            .ok_or_else(|| Error::Xml(format!("unterminated attribute '{}'", name)))?;

        let value = unescape_text(&after[1..end + 1])?;
        if attributes.iter().any(|(n, _): &(String, String)| n == name) {
            return Err(Error::Xml(format!("duplicate attribute '{}'", name)));
        }
        attributes.push((name.to_string(), value.into_owned()));

        rest = after[end + 2..].trim_start();
    }

    Ok(attributes)
}

/// Resolve entity and character references
pub fn unescape_text(text: &str) -> Result<Cow<'_, str>> {
    unescape(text).map_err(|e| Error::Xml(format!("bad reference in '{}': {}", snippet(text), e)))
}

/// Escape text for element content or attribute values
///
/// Tabs and line breaks become character references because the lexer strips
/// the raw characters. Leading and trailing spaces are written as `&#32;` for
/// the same reason.
pub fn escape_text(text: &str) -> String {
    let escaped = quick_xml::escape::escape(text);
    let escaped = if escaped.contains(['\t', '\n', '\r']) {
        escaped
            .replace('\t', "&#9;")
            .replace('\n', "&#10;")
            .replace('\r', "&#13;")
    } else {
        escaped.into_owned()
    };

    let body = escaped.trim_matches(' ');
    if body.len() == escaped.len() {
        return escaped;
    }
    let leading = escaped.len() - escaped.trim_start_matches(' ').len();
    let trailing = escaped.len() - leading - body.len();
    format!("{}{}{}", "&#32;".repeat(leading), body, "&#32;".repeat(trailing))
}

/// Find the close tag matching the open tag at `open`
///
/// Only re-occurrences of the same kind (as decided by `same_kind`) move the
/// nesting counter. The scan never goes past `max` (inclusive).
pub fn match_close<T>(
    tags: &[T],
    open: usize,
    max: usize,
    same_kind: impl Fn(&T) -> bool,
    is_open: impl Fn(&T) -> bool,
    is_close: impl Fn(&T) -> bool,
) -> Option<usize> {
    let mut nesting = 0usize;
    let last = max.min(tags.len().saturating_sub(1));

    for idx in open + 1..=last {
        let tag = &tags[idx];
        if !same_kind(tag) {
            continue;
        }
        if is_open(tag) {
            nesting += 1;
        } else if is_close(tag) {
            if nesting == 0 {
                return Some(idx);
            }
            nesting -= 1;
        }
    }

    None
}
