//! Page navigation paths.
//!
//! A navigation is the URL-safe form of a page name: `Help :: Getting Started`
//! becomes `help/getting_started`.

/// Clean a page name or link target into a navigation path.
///
/// Namespace segments are separated by `::`. Each segment is trimmed and
/// lowercased, whitespace runs become `_`, characters other than
/// alphanumerics, `-`, `_` and `.` are dropped and repeated `_` collapse.
/// Empty segments are removed.
///
/// # Example
///
/// ```
/// use wiki_engine::clean_navigation;
///
/// assert_eq!(clean_navigation("Help :: Getting  Started!"), "help/getting_started");
/// ```
#[must_use]
pub fn clean_navigation(target: &str) -> String {
    target
        .split("::")
        .map(clean_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn clean_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.trim().chars().flat_map(char::to_lowercase) {
        let c = if c.is_whitespace() { '_' } else { c };
        if !(c.is_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            continue;
        }
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_owned()
}
