//! Built-in scoped functions (`{{Name(args) body }}`).

use std::fmt::Write;

use super::ScopedFunction;
use crate::html::{escape_attr, escape_text};
use crate::{
    CompileError, EngineState, FunctionArgs, FunctionRegistry, HandlerResult, Instruction,
    PrototypeError,
};

const RAW_BODY: &[Instruction] = &[Instruction::DisallowNestedProcessing];

pub(crate) fn register_builtins(registry: &mut FunctionRegistry) -> Result<(), PrototypeError> {
    registry.register_scoped(Bullets)?;
    registry.register_scoped(Code)?;
    registry.register_scoped(Alert)?;
    registry.register_scoped(Collapse)?;
    registry.register_scoped(DefineSnippet)?;
    Ok(())
}

/// `{{Bullets(type) ... }}`: one list item per non-blank body line.
struct Bullets;

impl ScopedFunction for Bullets {
    fn prototype(&self) -> &str {
        "{{Bullets: <string:unordered,ordered>[type=unordered]"
    }

    fn call(
        &self,
        _state: &mut EngineState<'_>,
        args: &FunctionArgs,
        body: &str,
    ) -> Result<HandlerResult, CompileError> {
        let tag = match args.text("type") {
            Some(t) if t.trim().eq_ignore_ascii_case("ordered") => "ol",
            _ => "ul",
        };

        let mut html = format!("<{tag}>");
        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let _ = write!(html, "<li>{line}</li>");
        }
        let _ = write!(html, "</{tag}>");
        Ok(HandlerResult::html(html))
    }
}

/// `{{Code(language) ... }}`: preformatted body, never compiled.
struct Code;

impl ScopedFunction for Code {
    fn prototype(&self) -> &str {
        "{{Code: <string>[language]"
    }

    fn body_instructions(&self) -> &[Instruction] {
        RAW_BODY
    }

    fn call(
        &self,
        _state: &mut EngineState<'_>,
        args: &FunctionArgs,
        body: &str,
    ) -> Result<HandlerResult, CompileError> {
        let html = match args.text("language").map(str::trim) {
            Some(language) if !language.is_empty() => format!(
                r#"<pre><code class="language-{}">{body}</code></pre>"#,
                escape_attr(&language.to_ascii_lowercase())
            ),
            _ => format!("<pre><code>{body}</code></pre>"),
        };
        Ok(HandlerResult::html(html))
    }
}

/// `{{Alert(kind, title) ... }}`: callout box.
struct Alert;

impl ScopedFunction for Alert {
    fn prototype(&self) -> &str {
        "{{Alert: <string:info,warning,danger,success>[kind=info] | <string>[title]"
    }

    fn call(
        &self,
        _state: &mut EngineState<'_>,
        args: &FunctionArgs,
        body: &str,
    ) -> Result<HandlerResult, CompileError> {
        let kind = args.text("kind").unwrap_or("info").trim().to_ascii_lowercase();

        let mut html = format!(r#"<div class="alert alert-{kind}">"#);
        if let Some(title) = args.text("title") {
            let _ = write!(html, r#"<div class="alert-title">{}</div>"#, escape_text(title));
        }
        let _ = write!(html, r#"<div class="alert-content">{body}</div></div>"#);
        Ok(HandlerResult::html(html))
    }
}

/// `{{Collapse(title) ... }}`: body hidden behind a summary line.
struct Collapse;

impl ScopedFunction for Collapse {
    fn prototype(&self) -> &str {
        "{{Collapse: <string>[title=Show]"
    }

    fn call(
        &self,
        _state: &mut EngineState<'_>,
        args: &FunctionArgs,
        body: &str,
    ) -> Result<HandlerResult, CompileError> {
        let title = args.text("title").unwrap_or("Show");
        Ok(HandlerResult::html(format!(
            "<details><summary>{}</summary>{body}</details>",
            escape_text(title)
        )))
    }
}

/// `{{DefineSnippet(name) ... }}`: stores the raw body for `##Snippet`.
struct DefineSnippet;

impl ScopedFunction for DefineSnippet {
    fn prototype(&self) -> &str {
        "{{DefineSnippet: <string>{name}"
    }

    fn body_instructions(&self) -> &[Instruction] {
        RAW_BODY
    }

    fn call(
        &self,
        state: &mut EngineState<'_>,
        args: &FunctionArgs,
        body: &str,
    ) -> Result<HandlerResult, CompileError> {
        let name = args.text("name").unwrap_or_default().trim();
        if name.is_empty() {
            return Err(CompileError::syntax("DefineSnippet", "snippet name is empty"));
        }
        state.define_snippet(name, body);
        Ok(HandlerResult::empty().with_instruction(Instruction::TruncateTrailingLine))
    }
}
