//! HTML escaping helpers.

use std::borrow::Cow;

/// Escape text content (`&`, `<`, `>`).
///
/// # Example
///
/// ```
/// assert_eq!(wiki_engine::escape_text("a < b & c"), "a &lt; b &amp; c");
/// ```
#[must_use]
pub fn escape_text(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

/// Escape a value placed inside a double-quoted attribute.
#[must_use]
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}

/// Decode HTML entities in text that has already been emitted.
pub(crate) fn decode_entities(s: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(s)
}
