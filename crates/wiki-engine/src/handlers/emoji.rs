//! Emoji references: `%key%`, `%key,scale%` and `##Emoji(key, scale)`.

use std::fmt::Write;

use crate::html::{escape_attr, escape_text};
use crate::{CompileError, EngineConfiguration, EngineState, HandlerResult, Instruction};

/// Scale applied when none (or an out-of-range one) is given.
pub(crate) const DEFAULT_SCALE: i64 = 100;

/// Largest accepted scale, in percent.
pub(crate) const MAX_SCALE: i64 = 500;

/// Clamp a requested scale: values outside `1..=500` fall back to 100.
pub(crate) fn effective_scale(scale: Option<i64>) -> i64 {
    match scale {
        Some(scale) if (1..=MAX_SCALE).contains(&scale) => scale,
        _ => DEFAULT_SCALE,
    }
}

/// Render the `<img>` for a known emoji, or `None` if `key` is unknown.
///
/// Lookup ignores case; the URL keeps the key as written.
pub(crate) fn render(config: &EngineConfiguration, key: &str, scale: Option<i64>) -> Option<String> {
    let emoji = config.find_emoji(key)?;

    let key = key.trim().trim_matches('%').trim();
    let mut src = format!("{}/file/Emoji/{key}", config.base_path);
    let scale = effective_scale(scale);
    if scale != DEFAULT_SCALE {
        let _ = write!(src, "?Scale={scale}");
    }

    Some(format!(
        r#"<img src="{}" alt="{}" />"#,
        escape_attr(&src),
        escape_attr(emoji.name.as_deref().unwrap_or_default())
    ))
}

/// Handle a `%key%` reference.
///
/// Unknown keys keep their literal `source` text, are never expanded again
/// and are reported as unresolved.
pub(crate) fn handle(
    state: &mut EngineState<'_>,
    source: &str,
    key: &str,
    scale: Option<&str>,
) -> HandlerResult {
    let scale = scale.and_then(|s| s.parse::<i64>().ok());
    if let Some(html) = render(state.config, key, scale) {
        return HandlerResult::html(html);
    }

    state.report(CompileError::unresolved("emoji", key));
    HandlerResult::html(escape_text(source))
        .with_instruction(Instruction::DisallowNestedProcessing)
}
