//! Compilation driver.
//!
//! Scans a page body for constructs, dispatches each one to its handler with
//! the live [`EngineState`], applies the returned instructions and finally
//! runs the completion handler.
//!
//! # Processing model
//!
//! - Author markup is compiled in *source mode*: plain text is HTML-escaped.
//! - Scoped constructs (styles, headings, scoped functions) compile their body
//!   first, then pass the compiled body to their handler. Their output is
//!   final.
//! - Output of unscoped constructs (standard functions, links, emoji) is
//!   compiled again in *emitted mode*, where plain text is trusted HTML and
//!   tags are opaque, unless it carries
//!   [`Instruction::DisallowNestedProcessing`].
//! - A construct that fails is recorded as a diagnostic and its source is
//!   emitted as escaped literal text. The compile never aborts.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::handlers::{comment, completion, emoji, heading, link, markup};
use crate::html::{decode_entities, escape_text};
use crate::prototype::bind;
use crate::scanner::{Construct, Found, Mode, Scanner};
use crate::{
    CompileError, EngineConfiguration, EngineState, FunctionKind, FunctionRegistry,
    HandlerResult, Instruction, MetricsSink, NullMetricsSink, PageFlag, PageRef, PrototypeError,
};

/// Output of one compile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CompileResult {
    /// Generated HTML.
    pub html: String,
    /// Constructs handled successfully.
    pub match_count: usize,
    /// Constructs that fell back to literal text.
    pub error_count: usize,
    /// Constructs identified, excluding declined ones. Always
    /// `match_count + error_count`.
    pub constructs_identified: usize,
    /// Navigations of linked pages.
    pub outgoing_links: BTreeSet<String>,
    /// Tags set by `@@Tags`.
    pub tags: BTreeSet<String>,
    /// Flags set by instruction functions.
    pub flags: BTreeSet<PageFlag>,
    /// Messages of all recovered errors, in source order.
    pub diagnostics: Vec<String>,
    /// Wall-clock compile time.
    pub processing_time: Duration,
}

impl CompileResult {
    fn from_state(state: EngineState<'_>) -> Self {
        Self {
            html: state.html_result,
            match_count: state.match_count,
            error_count: state.error_count,
            constructs_identified: state.constructs_identified,
            outgoing_links: state.outgoing_links,
            tags: state.tags,
            flags: state.flags,
            diagnostics: state.diagnostics.iter().map(ToString::to_string).collect(),
            processing_time: state.processing_time.unwrap_or_default(),
        }
    }

    /// Whether the compile recovered from no error at all.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Wiki markup compiler.
///
/// Holds the shared function registry and metrics sink; each
/// [`compile`](Self::compile) call owns its own [`EngineState`], so one
/// engine can serve concurrent compiles.
///
/// # Example
///
/// ```
/// use wiki_engine::{Engine, EngineConfiguration, PageRef};
///
/// let engine = Engine::with_builtins().unwrap();
/// let config = EngineConfiguration::new().with_base_path("/wiki");
/// let page = PageRef::new("*bold* and [[Home]]");
///
/// let result = engine.compile(&config, &page);
/// assert_eq!(result.html, r#"<strong>bold</strong> and <a href="/wiki/home">Home</a>"#);
/// assert_eq!(result.match_count, 2);
/// ```
pub struct Engine {
    registry: Arc<FunctionRegistry>,
    metrics: Arc<dyn MetricsSink>,
}

impl Engine {
    /// Create an engine over `registry` that discards statistics.
    #[must_use]
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            metrics: Arc::new(NullMetricsSink),
        }
    }

    /// Create an engine with the built-in function library.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in prototype is invalid.
    pub fn with_builtins() -> Result<Self, PrototypeError> {
        Ok(Self::new(Arc::new(FunctionRegistry::with_builtins()?)))
    }

    /// Set the sink that receives compilation statistics.
    #[must_use]
    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    /// The function registry used by this engine.
    #[must_use]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Compile a page body to HTML.
    #[must_use]
    pub fn compile(&self, config: &EngineConfiguration, page: &PageRef) -> CompileResult {
        let started = Instant::now();
        let mut state = EngineState::new(config, page, &self.registry);

        compile_fragment(&mut state, &page.body, Mode::Source, true, 0, Output::Page);
        state.processing_time = Some(started.elapsed());

        completion::complete(&state, self.metrics.as_ref());

        tracing::debug!(
            page_id = page.id,
            matches = state.match_count,
            errors = state.error_count,
            elapsed_ms = started.elapsed().as_millis(),
            "Compiled page"
        );
        CompileResult::from_state(state)
    }
}

/// What happened to one construct.
enum Outcome {
    /// The handler produced a result. `mark` is the diagnostics length before
    /// the handler ran.
    Handled {
        result: HandlerResult,
        unscoped: bool,
        mark: usize,
    },
    /// The handler declined with `Skip`; `literal` replaces the construct.
    Declined { literal: String, mark: usize },
    /// The construct failed; `fallback` replaces it.
    Failed {
        error: CompileError,
        fallback: String,
    },
}

fn settle(
    result: HandlerResult,
    unscoped: bool,
    mark: usize,
    literal: impl FnOnce() -> String,
) -> Outcome {
    if result.has(Instruction::Skip) {
        Outcome::Declined {
            literal: literal(),
            mark,
        }
    } else {
        Outcome::Handled {
            result,
            unscoped,
            mark,
        }
    }
}

/// Text as it must appear in the output for `mode`.
fn literal(text: &str, mode: Mode) -> Cow<'_, str> {
    match mode {
        Mode::Source => escape_text(text),
        Mode::Emitted => Cow::Borrowed(text),
    }
}

/// Text handed to handlers: entities of emitted text are decoded first.
fn handler_text(text: &str, mode: Mode) -> Cow<'_, str> {
    match mode {
        Mode::Source => Cow::Borrowed(text),
        Mode::Emitted => decode_entities(text),
    }
}

/// Position after a single line terminator at `end`, if there is one.
fn skip_line_break(input: &str, end: usize) -> usize {
    let rest = &input[end..];
    if rest.starts_with("\r\n") {
        end + 2
    } else if rest.starts_with('\n') {
        end + 1
    } else {
        end
    }
}

/// Where a fragment's output goes.
enum Output<'o> {
    /// The page's `html_result`, so handlers see it grow.
    Page,
    /// A nested body or emitted text.
    Buffer(&'o mut String),
}

impl Output<'_> {
    fn push(&mut self, state: &mut EngineState<'_>, text: &str) {
        match self {
            Self::Page => state.html_result.push_str(text),
            Self::Buffer(out) => out.push_str(text),
        }
    }
}

fn compile_fragment(
    state: &mut EngineState<'_>,
    input: &str,
    mode: Mode,
    line_start: bool,
    depth: usize,
    mut output: Output<'_>,
) {
    let scanner = Scanner::new(input, mode, line_start);
    let mut pos = 0;
    let mut emitted = String::new();

    while let Some(found) = scanner.next(pos) {
        output.push(state, &literal(&input[pos..found.start], mode));
        emitted.clear();
        pos = dispatch(state, input, found, mode, depth, &mut emitted);
        output.push(state, &emitted);
    }

    output.push(state, &literal(&input[pos..], mode));
}

/// Compile a body or emitted text one level deeper.
fn compile_nested(
    state: &mut EngineState<'_>,
    input: &str,
    mode: Mode,
    line_start: bool,
    depth: usize,
) -> Result<String, CompileError> {
    let limit = state.config.max_nesting_depth;
    if depth >= limit {
        return Err(CompileError::RecursionLimit { depth: limit });
    }
    let mut out = String::with_capacity(input.len());
    compile_fragment(
        state,
        input,
        mode,
        line_start,
        depth + 1,
        Output::Buffer(&mut out),
    );
    Ok(out)
}

/// Handle one construct and return the position where scanning resumes.
fn dispatch(
    state: &mut EngineState<'_>,
    input: &str,
    found: Found<'_>,
    mode: Mode,
    depth: usize,
    out: &mut String,
) -> usize {
    let Found {
        start,
        end,
        construct,
    } = found;
    let source = &input[start..end];
    let name = construct.name();
    state.constructs_identified += 1;

    let outcome = match construct {
        Construct::Comment => Outcome::Handled {
            result: comment::handle(),
            unscoped: false,
            mark: state.diagnostics.len(),
        },

        Construct::Heading { level, body } => {
            let title = &input[body.clone()];
            match compile_nested(state, title, mode, false, depth) {
                Ok(compiled) => {
                    let mark = state.diagnostics.len();
                    let result = heading::handle(level, &handler_text(title, mode), &compiled);
                    settle(result, false, mark, || {
                        format!("{}{compiled}", literal(&input[start..body.start], mode))
                    })
                }
                Err(error) => Outcome::Failed {
                    error,
                    fallback: literal(source, mode).into_owned(),
                },
            }
        }

        Construct::Style { delimiter, body } => {
            match compile_nested(state, &input[body], mode, false, depth) {
                Ok(compiled) => {
                    let mark = state.diagnostics.len();
                    let result = markup::handle(delimiter, &compiled);
                    settle(result, false, mark, || {
                        format!("{delimiter}{compiled}{delimiter}")
                    })
                }
                Err(error) => Outcome::Failed {
                    error,
                    fallback: literal(source, mode).into_owned(),
                },
            }
        }

        Construct::Scoped {
            name,
            args,
            opener,
            body,
            closer,
        } => scoped(
            state,
            ScopedCall {
                name,
                args,
                source,
                opener: &input[opener],
                body: &input[body.clone()],
                body_line_start: input[..body.start].ends_with('\n'),
                closer: &input[closer],
            },
            mode,
            depth,
        ),

        Construct::Function {
            kind: FunctionKind::Instruction,
            name,
            args,
        } => instruction(state, name, args, source, mode),

        Construct::Function { name, args, .. } => standard(state, name, args, source, mode),

        Construct::Link { target, label } => {
            let target = handler_text(target, mode);
            let label = label.map(|label| handler_text(label, mode));
            let mark = state.diagnostics.len();
            match link::handle(state, &target, label.as_deref()) {
                Ok(result) => settle(result, true, mark, || literal(source, mode).into_owned()),
                Err(error) => Outcome::Failed {
                    error,
                    fallback: literal(source, mode).into_owned(),
                },
            }
        }

        Construct::Emoji { key, scale } => {
            let mark = state.diagnostics.len();
            let result = emoji::handle(state, source, key, scale);
            settle(result, true, mark, || literal(source, mode).into_owned())
        }

        Construct::Malformed { construct, message } => Outcome::Failed {
            error: CompileError::malformed(construct, message),
            fallback: literal(source, mode).into_owned(),
        },
    };

    match outcome {
        Outcome::Failed { error, fallback } => {
            tracing::debug!(construct = name, error = %error, "Construct fell back to literal text");
            state.error_count += 1;
            state.diagnostics.push(error);
            out.push_str(&fallback);
            end
        }
        Outcome::Declined { literal, mark } => {
            state.constructs_identified -= 1;
            state.diagnostics.truncate(mark);
            out.push_str(&literal);
            end
        }
        Outcome::Handled {
            result,
            unscoped,
            mark,
        } => {
            let mut failed = state.diagnostics.len() > mark;

            if unscoped && !result.has(Instruction::DisallowNestedProcessing) {
                match compile_nested(state, &result.text, Mode::Emitted, false, depth) {
                    Ok(html) => out.push_str(&html),
                    Err(error) => {
                        tracing::debug!(construct = name, error = %error, "Output emitted without expansion");
                        state.diagnostics.push(error);
                        failed = true;
                        out.push_str(&result.text);
                    }
                }
            } else {
                out.push_str(&result.text);
            }

            if failed {
                state.error_count += 1;
            } else {
                state.match_count += 1;
            }

            if result.has(Instruction::TruncateTrailingLine) {
                skip_line_break(input, end)
            } else {
                end
            }
        }
    }
}

fn standard(
    state: &mut EngineState<'_>,
    name: &str,
    args: &str,
    source: &str,
    mode: Mode,
) -> Outcome {
    let fallback = || literal(source, mode).into_owned();
    let registry = state.registry;

    let Some((prototype, handler)) = registry.standard(name) else {
        return Outcome::Failed {
            error: CompileError::PrototypeNotDefined {
                kind: FunctionKind::Standard,
                name: name.to_owned(),
            },
            fallback: fallback(),
        };
    };
    let args = match bind(prototype, &handler_text(args, mode)) {
        Ok(args) => args,
        Err(error) => {
            return Outcome::Failed {
                error,
                fallback: fallback(),
            };
        }
    };

    let mark = state.diagnostics.len();
    match handler.call(state, &args) {
        Ok(result) => settle(result, true, mark, fallback),
        Err(error) => Outcome::Failed {
            error,
            fallback: fallback(),
        },
    }
}

fn instruction(
    state: &mut EngineState<'_>,
    name: &str,
    args: &str,
    source: &str,
    mode: Mode,
) -> Outcome {
    let fallback = || literal(source, mode).into_owned();
    let registry = state.registry;

    let Some((prototype, handler)) = registry.instruction(name) else {
        return Outcome::Failed {
            error: CompileError::PrototypeNotDefined {
                kind: FunctionKind::Instruction,
                name: name.to_owned(),
            },
            fallback: fallback(),
        };
    };
    let args = match bind(prototype, &handler_text(args, mode)) {
        Ok(args) => args,
        Err(error) => {
            return Outcome::Failed {
                error,
                fallback: fallback(),
            };
        }
    };

    let mark = state.diagnostics.len();
    match handler.call(state, &args) {
        Ok(()) => Outcome::Handled {
            result: HandlerResult::empty().with_instruction(Instruction::TruncateTrailingLine),
            unscoped: false,
            mark,
        },
        Err(error) => Outcome::Failed {
            error,
            fallback: fallback(),
        },
    }
}

/// Pieces of a scoped call, as slices of the fragment being compiled.
struct ScopedCall<'s> {
    name: &'s str,
    args: &'s str,
    source: &'s str,
    opener: &'s str,
    body: &'s str,
    body_line_start: bool,
    closer: &'s str,
}

fn scoped(
    state: &mut EngineState<'_>,
    call: ScopedCall<'_>,
    mode: Mode,
    depth: usize,
) -> Outcome {
    let registry = state.registry;

    let Some((prototype, handler)) = registry.scoped(call.name) else {
        return Outcome::Failed {
            error: CompileError::PrototypeNotDefined {
                kind: FunctionKind::Scoped,
                name: call.name.to_owned(),
            },
            fallback: literal(call.source, mode).into_owned(),
        };
    };
    let args = match bind(prototype, &handler_text(call.args, mode)) {
        Ok(args) => args,
        Err(error) => {
            return Outcome::Failed {
                error,
                fallback: literal(call.source, mode).into_owned(),
            };
        }
    };

    let pending = state.processing_instructions.len();
    state
        .processing_instructions
        .extend_from_slice(handler.body_instructions());
    let raw_body = state
        .processing_instructions
        .contains(&Instruction::DisallowNestedProcessing);
    let prepared = if raw_body {
        Ok(literal(call.body, mode).into_owned())
    } else {
        compile_nested(state, call.body, mode, call.body_line_start, depth)
    };
    state.processing_instructions.truncate(pending);

    let body = match prepared {
        Ok(body) => body,
        Err(error) => {
            return Outcome::Failed {
                error,
                fallback: literal(call.source, mode).into_owned(),
            };
        }
    };
    let wrapped = || {
        format!(
            "{}{body}{}",
            literal(call.opener, mode),
            literal(call.closer, mode)
        )
    };

    let mark = state.diagnostics.len();
    match handler.call(state, &args, &body) {
        Ok(result) => settle(result, false, mark, wrapped),
        Err(error) => Outcome::Failed {
            error,
            fallback: wrapped(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        CompilationStatistics, Emoji, FunctionArgs, MetricsError, ScopedFunction,
        StandardFunction,
    };
    use pretty_assertions::assert_eq;

    fn config() -> EngineConfiguration {
        EngineConfiguration::new()
            .with_base_path("/wiki")
            .with_site_name("Docs")
            .with_emoji(Emoji::new("smile", "Smile"))
    }

    fn compile(body: &str) -> CompileResult {
        compile_with(&config(), body)
    }

    fn compile_with(config: &EngineConfiguration, body: &str) -> CompileResult {
        let engine = Engine::with_builtins().unwrap();
        let result = engine.compile(config, &PageRef::new(body));
        assert_eq!(
            result.match_count + result.error_count,
            result.constructs_identified,
            "counting invariant for {body:?}"
        );
        result
    }

    #[test]
    fn test_plain_text_is_escaped() {
        let result = compile("a < b & \"c\"\n");
        assert_eq!(result.html, "a &lt; b &amp; \"c\"\n");
        assert_eq!(result.constructs_identified, 0);
    }

    #[test]
    fn test_bold() {
        let result = compile("*bold*");
        assert_eq!(result.html, "<strong>bold</strong>");
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn test_nested_styles_inside_out() {
        let result = compile("*~bold strike~*");
        assert_eq!(result.html, "<strong><strike>bold strike</strike></strong>");
        assert_eq!(result.match_count, 2);
    }

    #[test]
    fn test_all_styles() {
        let result = compile("~s~ *b* _u_ /e/ !m!");
        assert_eq!(
            result.html,
            "<strike>s</strike> <strong>b</strong> <u>u</u> <em>e</em> <mark>m</mark>"
        );
    }

    #[test]
    fn test_unsupported_delimiter_left_unmodified() {
        let result = compile("x ^sup^ y");
        assert_eq!(result.html, "x ^sup^ y");
        assert_eq!(result.constructs_identified, 0);
        assert_eq!(result.match_count, 0);
        assert_eq!(result.error_count, 0);
    }

    #[test]
    fn test_skipped_span_body_still_compiled() {
        let result = compile("^a *b* c^");
        assert_eq!(result.html, "^a <strong>b</strong> c^");
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn test_urls_are_plain_text() {
        let body = "Visit https://example.com/docs/ today";
        let result = compile(body);
        assert_eq!(result.html, body);
        assert_eq!(result.constructs_identified, 0);
        assert_eq!(
            compile("see /docs/ and file:///a/b/").html,
            "see <em>docs</em> and file:///a/b/"
        );
    }

    #[test]
    fn test_unclosed_openers_scale_linearly() {
        let started = Instant::now();
        let styles = compile(&"*a ".repeat(20_000));
        let scopes = compile(&"{{Code ".repeat(20_000));
        let links = compile(&"[[a ".repeat(20_000));
        let elapsed = started.elapsed();

        assert!(styles.is_clean());
        assert_eq!(scopes.error_count, 20_000);
        assert_eq!(links.error_count, 20_000);
        assert!(elapsed.as_secs() < 5, "took {elapsed:?}");
    }

    #[test]
    fn test_unclosed_style_is_plain_text() {
        let result = compile("*not closed");
        assert_eq!(result.html, "*not closed");
        assert!(result.is_clean());
    }

    #[test]
    fn test_full_line_comment_leaves_no_blank_line() {
        let result = compile("first\n;; hidden note\nsecond\n");
        assert_eq!(result.html, "first\nsecond\n");
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn test_comment_with_crlf() {
        let result = compile("a\r\n;; note\r\nb");
        assert_eq!(result.html, "a\r\nb");
    }

    #[test]
    fn test_comment_on_last_line() {
        assert_eq!(compile("a\n;; end").html, "a\n");
    }

    #[test]
    fn test_heading() {
        let result = compile("== Getting *Started* ==\ntext");
        assert_eq!(
            result.html,
            "<h2 id=\"getting_started\">Getting <strong>Started</strong></h2>\ntext"
        );
        assert_eq!(result.match_count, 2);
    }

    #[test]
    fn test_known_emoji() {
        let result = compile("hi %smile%");
        assert_eq!(
            result.html,
            r#"hi <img src="/wiki/file/Emoji/smile" alt="Smile" />"#
        );
    }

    #[test]
    fn test_emoji_scale() {
        assert_eq!(
            compile("%smile,50%").html,
            r#"<img src="/wiki/file/Emoji/smile?Scale=50" alt="Smile" />"#
        );
        for scale in ["0", "-3", "501"] {
            assert_eq!(
                compile(&format!("%smile,{scale}%")).html,
                r#"<img src="/wiki/file/Emoji/smile" alt="Smile" />"#
            );
        }
    }

    #[test]
    fn test_emoji_url_uses_key_as_written() {
        let result = compile("%Smile%");
        assert_eq!(
            result.html,
            r#"<img src="/wiki/file/Emoji/Smile" alt="Smile" />"#
        );
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn test_percent_ranges_are_plain_text() {
        let result = compile("ratio 10%-20% ok, 5%+1% too");
        assert_eq!(result.html, "ratio 10%-20% ok, 5%+1% too");
        assert_eq!(result.constructs_identified, 0);
        assert!(result.is_clean());
    }

    #[test]
    fn test_unknown_emoji_is_literal_and_counted_once() {
        let result = compile("%unknown%");
        assert_eq!(result.html, "%unknown%");
        assert_eq!(result.error_count, 1);
        assert_eq!(result.match_count, 0);
        assert_eq!(result.diagnostics, vec!["Unresolved emoji reference: unknown"]);
    }

    #[test]
    fn test_unknown_emoji_next_to_style_not_reexpanded() {
        let result = compile("%x_y%_z_");
        assert_eq!(result.html, "%x_y%<u>z</u>");
    }

    #[test]
    fn test_page_link() {
        let result = compile("See [[Help :: FAQ|the FAQ]].");
        assert_eq!(
            result.html,
            r#"See <a href="/wiki/help/faq">the FAQ</a>."#
        );
        assert_eq!(
            result.outgoing_links.into_iter().collect::<Vec<_>>(),
            vec!["help/faq".to_owned()]
        );
    }

    #[test]
    fn test_link_label_markup_compiled_once() {
        let result = compile("[[Home|*Start* <here>]]");
        assert_eq!(
            result.html,
            r#"<a href="/wiki/home"><strong>Start</strong> &lt;here&gt;</a>"#
        );
        assert_eq!(result.match_count, 2);
    }

    #[test]
    fn test_empty_link_target() {
        let result = compile("[[ | label]]");
        assert_eq!(result.html, "[[ | label]]");
        assert_eq!(result.error_count, 1);
    }

    #[test]
    fn test_unterminated_link() {
        let result = compile("[[Home\n]]");
        assert_eq!(result.html, "[[Home\n]]");
        assert_eq!(result.error_count, 1);
        assert!(result.diagnostics[0].contains("]]"));
    }

    #[test]
    fn test_standard_function_output_recompiled() {
        let result = compile("##Color(red, *hot* & <cold>)");
        assert_eq!(
            result.html,
            r#"<span style="color: red"><strong>hot</strong> &amp; &lt;cold&gt;</span>"#
        );
        assert_eq!(result.match_count, 2);
    }

    #[test]
    fn test_function_names_case_insensitive() {
        assert_eq!(compile("##sitename").html, "Docs");
        assert_eq!(compile("##SITENAME()").html, "Docs");
    }

    #[test]
    fn test_unknown_function() {
        let result = compile("##Nope(1) <x>");
        assert_eq!(result.html, "##Nope(1) &lt;x&gt;");
        assert_eq!(result.error_count, 1);
        assert_eq!(result.diagnostics, vec!["Function ##Nope is not defined"]);
    }

    #[test]
    fn test_function_syntax_error() {
        let result = compile("##BR(many)");
        assert_eq!(result.html, "##BR(many)");
        assert_eq!(result.error_count, 1);
        assert!(result.diagnostics[0].starts_with("Syntax error in call to BR"));
    }

    #[test]
    fn test_unclosed_function_call() {
        let result = compile("##Image(logo.png");
        assert_eq!(result.html, "##Image(logo.png");
        assert_eq!(result.error_count, 1);
    }

    #[test]
    fn test_instruction_functions() {
        let result = compile("@@Tags(Rust, Wiki)\n@@Draft\nBody");
        assert_eq!(result.html, "Body");
        assert_eq!(
            result.tags.into_iter().collect::<Vec<_>>(),
            vec!["rust".to_owned(), "wiki".to_owned()]
        );
        assert!(result.flags.contains(&PageFlag::Draft));
        assert_eq!(result.match_count, 2);
    }

    #[test]
    fn test_unknown_instruction() {
        let result = compile("@@Frobnicate\n");
        assert_eq!(result.html, "@@Frobnicate\n");
        assert_eq!(result.diagnostics, vec!["Function @@Frobnicate is not defined"]);
    }

    #[test]
    fn test_scoped_body_compiled_first() {
        let result = compile("{{Collapse(More)\n*hidden*\n}}");
        assert_eq!(
            result.html,
            "<details><summary>More</summary><strong>hidden</strong></details>"
        );
        assert_eq!(result.match_count, 2);
    }

    #[test]
    fn test_code_body_not_compiled() {
        let result = compile("{{Code(rust)\nlet x = *y* < 2;\n}}");
        assert_eq!(
            result.html,
            "<pre><code class=\"language-rust\">let x = *y* &lt; 2;</code></pre>"
        );
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn test_scoped_output_not_recompiled() {
        let result = compile("{{Code\n%smile%\n}}");
        assert_eq!(result.html, "<pre><code>%smile%</code></pre>");
    }

    #[test]
    fn test_nested_scoped() {
        let result = compile("{{Alert(warning)\n{{Bullets\none\n*two*\n}}\n}}");
        assert_eq!(
            result.html,
            r#"<div class="alert alert-warning"><div class="alert-content"><ul><li>one</li><li><strong>two</strong></li></ul></div></div>"#
        );
        assert_eq!(result.match_count, 3);
    }

    #[test]
    fn test_unknown_scoped_function() {
        let result = compile("{{Nope *x* }}");
        assert_eq!(result.html, "{{Nope *x* }}");
        assert_eq!(result.error_count, 1);
        assert_eq!(result.match_count, 0);
    }

    #[test]
    fn test_unclosed_scoped_function() {
        let result = compile("{{Collapse *x*");
        assert_eq!(result.html, "{{Collapse <strong>x</strong>");
        assert_eq!(result.error_count, 1);
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn test_snippets() {
        let body = "{{DefineSnippet(sig)\n*Regards*\n}}\nBye\n##Snippet(sig)";
        let result = compile(body);
        assert_eq!(result.html, "Bye\n<strong>Regards</strong>");
        assert_eq!(result.match_count, 3);
    }

    #[test]
    fn test_snippet_escaping_survives_recompile() {
        let result = compile("{{DefineSnippet(x) a<b }}##Snippet(x)");
        assert_eq!(result.html, "a&lt;b");
    }

    #[test]
    fn test_unknown_snippet() {
        let result = compile("##Snippet(missing)");
        assert_eq!(result.html, "##Snippet(missing)");
        assert_eq!(result.diagnostics, vec!["Unresolved snippet reference: missing"]);
    }

    #[test]
    fn test_recursion_limit() {
        let config = config().with_max_nesting_depth(1);
        let result = compile_with(&config, "*_x_*");
        assert_eq!(result.html, "<strong>_x_</strong>");
        assert_eq!(result.match_count, 1);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.diagnostics, vec!["Maximum nesting depth (1) exceeded"]);
    }

    struct Recursive;

    impl StandardFunction for Recursive {
        fn prototype(&self) -> &str {
            "##Again"
        }

        fn call(
            &self,
            _state: &mut EngineState<'_>,
            _args: &FunctionArgs,
        ) -> Result<HandlerResult, CompileError> {
            Ok(HandlerResult::html("x##Again"))
        }
    }

    #[test]
    fn test_self_expanding_function_hits_limit() {
        let mut registry = FunctionRegistry::new();
        registry.register_standard(Recursive).unwrap();
        let engine = Engine::new(Arc::new(registry));
        let config = EngineConfiguration::new().with_max_nesting_depth(3);

        let result = engine.compile(&config, &PageRef::new("##Again"));

        assert_eq!(result.html, "xxxx##Again");
        assert_eq!(result.match_count, 3);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.constructs_identified, 4);
    }

    struct OutputSoFar;

    impl StandardFunction for OutputSoFar {
        fn prototype(&self) -> &str {
            "##OutputSoFar"
        }

        fn call(
            &self,
            state: &mut EngineState<'_>,
            _args: &FunctionArgs,
        ) -> Result<HandlerResult, CompileError> {
            Ok(HandlerResult::html(format!("[{}]", state.html_result())))
        }
    }

    #[test]
    fn test_handlers_see_output_so_far() {
        let mut registry = FunctionRegistry::new();
        registry.register_standard(OutputSoFar).unwrap();
        let engine = Engine::new(Arc::new(registry));

        let result = engine.compile(&config(), &PageRef::new("a < b ##OutputSoFar"));

        assert_eq!(result.html, "a &lt; b [a &lt; b ]");
    }

    struct SkipEverything;

    impl StandardFunction for SkipEverything {
        fn prototype(&self) -> &str {
            "##Decline"
        }

        fn call(
            &self,
            state: &mut EngineState<'_>,
            _args: &FunctionArgs,
        ) -> Result<HandlerResult, CompileError> {
            state.report(CompileError::unresolved("thing", "x"));
            Ok(HandlerResult::html("<b>ignored</b>")
                .with_instruction(Instruction::TruncateTrailingLine)
                .with_instruction(Instruction::Skip))
        }
    }

    #[test]
    fn test_skip_dominates_other_instructions() {
        let mut registry = FunctionRegistry::new();
        registry.register_standard(SkipEverything).unwrap();
        let engine = Engine::new(Arc::new(registry));

        let result = engine.compile(&EngineConfiguration::new(), &PageRef::new("##Decline\nnext"));

        assert_eq!(result.html, "##Decline\nnext");
        assert_eq!(result.constructs_identified, 0);
        assert!(result.is_clean());
    }

    struct Shout;

    impl ScopedFunction for Shout {
        fn prototype(&self) -> &str {
            "{{Shout"
        }

        fn call(
            &self,
            _state: &mut EngineState<'_>,
            _args: &FunctionArgs,
            body: &str,
        ) -> Result<HandlerResult, CompileError> {
            if body.is_empty() {
                return Ok(HandlerResult::skip());
            }
            Err(CompileError::malformed("shout", "too quiet"))
        }
    }

    #[test]
    fn test_scoped_skip_and_failure_keep_compiled_body() {
        let mut registry = FunctionRegistry::new();
        registry.register_scoped(Shout).unwrap();
        let engine = Engine::new(Arc::new(registry));
        let config = EngineConfiguration::new();

        let declined = engine.compile(&config, &PageRef::new("{{Shout}}"));
        assert_eq!(declined.html, "{{Shout}}");
        assert_eq!(declined.constructs_identified, 0);

        let failed = engine.compile(&config, &PageRef::new("{{Shout *a* }}"));
        assert_eq!(failed.html, "{{Shout <strong>a</strong> }}");
        assert_eq!(failed.match_count, 1);
        assert_eq!(failed.error_count, 1);
    }

    #[derive(Default)]
    struct CountingSink(Mutex<Vec<CompilationStatistics>>);

    impl MetricsSink for CountingSink {
        fn record_compilation_statistics(
            &self,
            statistics: &CompilationStatistics,
        ) -> Result<(), MetricsError> {
            self.0.lock().unwrap().push(statistics.clone());
            Ok(())
        }
    }

    #[test]
    fn test_metrics_sink_not_called_when_disabled() {
        let sink = Arc::new(CountingSink::default());
        let engine = Engine::with_builtins()
            .unwrap()
            .with_metrics_sink(Arc::<CountingSink>::clone(&sink));

        let _ = engine.compile(&config(), &PageRef::new("*x*"));

        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_metrics_sink_called_once_when_enabled() {
        let sink = Arc::new(CountingSink::default());
        let engine = Engine::with_builtins()
            .unwrap()
            .with_metrics_sink(Arc::<CountingSink>::clone(&sink));
        let config = config().with_compilation_metrics(true);
        let page = PageRef {
            id: 42,
            ..PageRef::new("*x* [[Home]] %nope% @@Tags(a)")
        };

        let result = engine.compile(&config, &page);

        let recorded = sink.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        let statistics = &recorded[0];
        assert_eq!(statistics.page_id, 42);
        assert_eq!(statistics.match_count, result.match_count);
        assert_eq!(statistics.error_count, 1);
        assert_eq!(statistics.outgoing_link_count, 1);
        assert_eq!(statistics.tag_count, 1);
        assert_eq!(statistics.html_length, result.html.len());
        assert_eq!(statistics.body_length, page.body.len());
    }

    #[test]
    fn test_profile_and_image_use_config() {
        let config = config().with_public_profiles(true);
        let engine = Engine::with_builtins().unwrap();
        let page = PageRef {
            navigation: "about".to_owned(),
            ..PageRef::new("##Profile(Ann) ##Image(a.png)")
        };

        let result = engine.compile(&config, &page);

        assert_eq!(
            result.html,
            r#"<a href="/wiki/profile/ann/public">Ann</a> <img src="/wiki/file/Image/about/a.png" alt="a.png" />"#
        );
    }

    #[test]
    fn test_engine_shared_across_threads() {
        let engine = Arc::new(Engine::with_builtins().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let body = format!("@@Tags(t{i}) *{i}*");
                    engine.compile(&EngineConfiguration::new(), &PageRef::new(body))
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.join().unwrap();
            assert_eq!(result.html, format!(" <strong>{i}</strong>"));
            assert!(result.tags.contains(&format!("t{i}")));
        }
    }
}
