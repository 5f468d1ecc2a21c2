//! `==Title` headings.

use crate::html::escape_attr;
use crate::{HandlerResult, clean_navigation};

/// Emit `<hN id="slug">body</hN>`; the slug is derived from the raw title.
pub(crate) fn handle(level: usize, title: &str, body: &str) -> HandlerResult {
    let slug = clean_navigation(title);
    HandlerResult::html(format!(
        r#"<h{level} id="{}">{body}</h{level}>"#,
        escape_attr(&slug)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_slug_from_raw_title() {
        let result = handle(2, "Getting *Started*", "Getting <strong>Started</strong>");
        assert_eq!(
            result.text,
            r#"<h2 id="getting_started">Getting <strong>Started</strong></h2>"#
        );
    }
}
