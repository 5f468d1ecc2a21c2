//! `[[target|label]]` links.

use crate::html::{escape_attr, escape_text};
use crate::{CompileError, EngineState, HandlerResult, clean_navigation};

const EXTERNAL_SCHEMES: [&str; 3] = ["http://", "https://", "mailto:"];

/// Whether `target` points outside the wiki.
fn is_external(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    EXTERNAL_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Emit an anchor for a page or external link.
///
/// Page links are recorded as outgoing links. The label defaults to the
/// target as written.
pub(crate) fn handle(
    state: &mut EngineState<'_>,
    target: &str,
    label: Option<&str>,
) -> Result<HandlerResult, CompileError> {
    if target.is_empty() {
        return Err(CompileError::malformed("link", "empty link target"));
    }
    let label = escape_text(label.unwrap_or(target));

    if is_external(target) {
        return Ok(HandlerResult::html(format!(
            r#"<a href="{}" target="_blank" rel="noopener">{label}</a>"#,
            escape_attr(target)
        )));
    }

    let navigation = clean_navigation(target);
    if navigation.is_empty() {
        return Err(CompileError::malformed(
            "link",
            format!("`{target}` is not a valid page name"),
        ));
    }

    let href = format!("{}/{navigation}", state.config.base_path);
    state.add_outgoing_link(navigation);
    Ok(HandlerResult::html(format!(
        r#"<a href="{}">{label}</a>"#,
        escape_attr(&href)
    )))
}
