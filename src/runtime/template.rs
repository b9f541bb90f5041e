//! Expression templates.
//!
//! Expressions are embedded in configuration values with the `#[ ... ]`
//! marker. Markers may nest brackets (`#[vars['a']]`) and brackets inside
//! quoted strings are ignored. An unterminated marker is plain text.

/// Opening marker of an embedded expression.
pub const MARKER_START: &str = "#[";
/// Closing marker of an embedded expression.
pub const MARKER_END: char = ']';

/// A piece of a template: literal text or the body of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePart<'a> {
    Literal(&'a str),
    Expression(&'a str),
}

/// Whether `text` contains at least one complete expression marker.
pub fn contains_template(text: &str) -> bool {
    next_expression(text, 0).is_some()
}

/// The body of `text` when the whole (trimmed) string is a single expression.
///
/// `#[payload]` yields `Some("payload")`, `id: #[payload]` yields `None`.
pub fn single_expression(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    match next_expression(trimmed, 0) {
        Some((0, body_start, end)) if end == trimmed.len() => {
            Some(trimmed[body_start..end - 1].trim())
        }
        _ => None,
    }
}

pub fn is_single_expression(text: &str) -> bool {
    single_expression(text).is_some()
}

/// Split `text` into literal and expression parts, in order.
pub fn split_template(text: &str) -> Vec<TemplatePart<'_>> {
    let mut parts = Vec::new();
    let mut cursor = 0;

    while let Some((start, body_start, end)) = next_expression(text, cursor) {
        if start > cursor {
            parts.push(TemplatePart::Literal(&text[cursor..start]));
        }
        parts.push(TemplatePart::Expression(text[body_start..end - 1].trim()));
        cursor = end;
    }

    if cursor < text.len() {
        parts.push(TemplatePart::Literal(&text[cursor..]));
    }
    parts
}

/// Find the next complete marker at or after `from`.
///
/// Returns (marker start, body start, index just past the closing bracket).
fn next_expression(text: &str, from: usize) -> Option<(usize, usize, usize)> {
    let mut search = from;
    while let Some(offset) = text[search..].find(MARKER_START) {
        let start = search + offset;
        let body_start = start + MARKER_START.len();
        if let Some(end) = closing_bracket(text, body_start) {
            return Some((start, body_start, end + 1));
        }
        search = body_start;
    }
    None
}

fn closing_bracket(text: &str, body_start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;

    for (offset, c) in text[body_start..].char_indices() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(body_start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
