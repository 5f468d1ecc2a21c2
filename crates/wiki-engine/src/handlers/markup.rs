//! Inline style spans: `~strike~`, `*strong*`, `_underline_`, `/emphasis/`,
//! `!mark!`.

use crate::HandlerResult;

/// Wrap an already compiled body in the element for `delimiter`.
///
/// Delimiters without an element are declined with
/// [`Skip`](crate::Instruction::Skip) so the span stays as written.
pub(crate) fn handle(delimiter: char, body: &str) -> HandlerResult {
    let tag = match delimiter {
        '~' => "strike",
        '*' => "strong",
        '_' => "u",
        '/' => "em",
        '!' => "mark",
        _ => return HandlerResult::skip(),
    };
    HandlerResult::html(format!("<{tag}>{body}</{tag}>"))
}
