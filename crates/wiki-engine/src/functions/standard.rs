//! Built-in standard functions (`##Name(args)`).

use std::fmt::Write;

use super::StandardFunction;
use crate::handlers::emoji;
use crate::html::{escape_attr, escape_text};
use crate::{
    CompileError, EngineState, FunctionArgs, FunctionRegistry, HandlerResult, PrototypeError,
    clean_navigation,
};

/// Upper bound for `##BR(count)`.
const MAX_LINE_BREAKS: i64 = 100;

pub(crate) fn register_builtins(registry: &mut FunctionRegistry) -> Result<(), PrototypeError> {
    registry.register_standard(EmojiFunction)?;
    registry.register_standard(Image)?;
    registry.register_standard(Anchor)?;
    registry.register_standard(LineBreak)?;
    registry.register_standard(HorizontalRule)?;
    registry.register_standard(Color)?;
    registry.register_standard(SiteName)?;
    registry.register_standard(PageName)?;
    registry.register_standard(Revision)?;
    registry.register_standard(Profile)?;
    registry.register_standard(Snippet)?;
    Ok(())
}

fn required<'a>(args: &'a FunctionArgs, name: &str) -> &'a str {
    args.text(name).unwrap_or_default()
}

/// `##Emoji(name, scale)`: same output as `%name,scale%`.
struct EmojiFunction;

impl StandardFunction for EmojiFunction {
    fn prototype(&self) -> &str {
        "##Emoji: <string>{name} | <integer>[scale=100]"
    }

    fn call(
        &self,
        state: &mut EngineState<'_>,
        args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        let name = required(args, "name");
        emoji::render(state.config, name, args.integer("scale"))
            .map(HandlerResult::html)
            .ok_or_else(|| CompileError::unresolved("emoji", name))
    }
}

/// `##Image(name, scale, alt)`: image attached to the current page.
struct Image;

impl StandardFunction for Image {
    fn prototype(&self) -> &str {
        "##Image: <string>{name} | <integer>[scale=100] | <string>[alt]"
    }

    fn call(
        &self,
        state: &mut EngineState<'_>,
        args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        let name = required(args, "name");
        let alt = args.text("alt").unwrap_or(name);

        let mut src = format!(
            "{}/file/Image/{}/{}",
            state.config.base_path, state.page.navigation, name
        );
        let scale = emoji::effective_scale(args.integer("scale"));
        if scale != emoji::DEFAULT_SCALE {
            let _ = write!(src, "?Scale={scale}");
        }

        Ok(HandlerResult::html(format!(
            r#"<img src="{}" alt="{}" />"#,
            escape_attr(&src),
            escape_attr(alt)
        )))
    }
}

/// `##Anchor(name)`: link target inside the page.
struct Anchor;

impl StandardFunction for Anchor {
    fn prototype(&self) -> &str {
        "##Anchor: <string>{name}"
    }

    fn call(
        &self,
        _state: &mut EngineState<'_>,
        args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        Ok(HandlerResult::html(format!(
            r#"<a id="{}"></a>"#,
            escape_attr(required(args, "name"))
        )))
    }
}

/// `##BR(count)`: one or more line breaks.
struct LineBreak;

impl StandardFunction for LineBreak {
    fn prototype(&self) -> &str {
        "##BR: <integer>[count=1]"
    }

    fn call(
        &self,
        _state: &mut EngineState<'_>,
        args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        let count = args.integer("count").unwrap_or(1).clamp(1, MAX_LINE_BREAKS);
        let count = usize::try_from(count).unwrap_or(1);
        Ok(HandlerResult::html("<br />".repeat(count)))
    }
}

/// `##HR`: horizontal rule.
struct HorizontalRule;

impl StandardFunction for HorizontalRule {
    fn prototype(&self) -> &str {
        "##HR"
    }

    fn call(
        &self,
        _state: &mut EngineState<'_>,
        _args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        Ok(HandlerResult::html("<hr />"))
    }
}

/// `##Color(color, text)`: colored text; the text may contain markup.
struct Color;

impl StandardFunction for Color {
    fn prototype(&self) -> &str {
        "##Color: <string>{color} | <infinitestring>{text}"
    }

    fn call(
        &self,
        _state: &mut EngineState<'_>,
        args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        let color = required(args, "color");
        if color.is_empty() || !color.chars().all(|c| c == '#' || c.is_ascii_alphanumeric()) {
            return Err(CompileError::syntax(
                "Color",
                format!("`{color}` is not a valid color"),
            ));
        }
        Ok(HandlerResult::html(format!(
            r#"<span style="color: {color}">{}</span>"#,
            escape_text(required(args, "text"))
        )))
    }
}

/// `##SiteName`.
struct SiteName;

impl StandardFunction for SiteName {
    fn prototype(&self) -> &str {
        "##SiteName"
    }

    fn call(
        &self,
        state: &mut EngineState<'_>,
        _args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        Ok(HandlerResult::html(escape_text(&state.config.site_name)))
    }
}

/// `##Name`: display name of the current page.
struct PageName;

impl StandardFunction for PageName {
    fn prototype(&self) -> &str {
        "##Name"
    }

    fn call(
        &self,
        state: &mut EngineState<'_>,
        _args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        Ok(HandlerResult::html(escape_text(&state.page.name)))
    }
}

/// `##Revision`: revision number of the current page.
struct Revision;

impl StandardFunction for Revision {
    fn prototype(&self) -> &str {
        "##Revision"
    }

    fn call(
        &self,
        state: &mut EngineState<'_>,
        _args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        Ok(HandlerResult::html(state.page.revision.to_string()))
    }
}

/// `##Profile(account, label)`: link to a public profile when enabled,
/// plain text otherwise.
struct Profile;

impl StandardFunction for Profile {
    fn prototype(&self) -> &str {
        "##Profile: <string>{account} | <string>[label]"
    }

    fn call(
        &self,
        state: &mut EngineState<'_>,
        args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        let account = required(args, "account");
        let label = escape_text(args.text("label").unwrap_or(account));

        if !state.config.enable_public_profiles {
            return Ok(HandlerResult::html(label));
        }

        let href = format!(
            "{}/profile/{}/public",
            state.config.base_path,
            clean_navigation(account)
        );
        Ok(HandlerResult::html(format!(
            r#"<a href="{}">{label}</a>"#,
            escape_attr(&href)
        )))
    }
}

/// `##Snippet(name)`: body of a snippet defined earlier with
/// `{{DefineSnippet}}`.
struct Snippet;

impl StandardFunction for Snippet {
    fn prototype(&self) -> &str {
        "##Snippet: <string>{name}"
    }

    fn call(
        &self,
        state: &mut EngineState<'_>,
        args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError> {
        let name = required(args, "name");
        state
            .snippet(name)
            .map(HandlerResult::html)
            .ok_or_else(|| CompileError::unresolved("snippet", name))
    }
}
