//! Wiki markup transformation engine.
//!
//! Compiles author-supplied wiki markup into HTML in a single stateful pass,
//! tracking outgoing links, tags, page flags and compile statistics.
//!
//! # Architecture
//!
//! - [`Engine`]: the driver. Scans constructs, dispatches them to handlers,
//!   applies [`Instruction`]s and reports statistics through a
//!   [`MetricsSink`].
//! - [`FunctionRegistry`]: prototypes and handlers of the callable wiki
//!   functions ([`StandardFunction`], [`ScopedFunction`],
//!   [`InstructionFunction`]).
//! - [`EngineState`]: the mutable context of one compile.
//!
//! # Markup
//!
//! | construct | syntax |
//! |---|---|
//! | comment | `;; text` at line start |
//! | heading | `== Title` (2 to 6 `=`) |
//! | style | `~strike~` `*strong*` `_underline_` `/emphasis/` `!mark!` |
//! | link | `[[Page]]`, `[[Namespace :: Page\|label]]`, `[[https://…\|label]]` |
//! | emoji | `%smile%`, `%smile,150%` |
//! | standard function | `##Name(args)` |
//! | scoped function | `{{Name(args) body }}` |
//! | instruction function | `@@Name(args)` |
//!
//! # Example
//!
//! ```
//! use wiki_engine::{Emoji, Engine, EngineConfiguration, PageRef};
//!
//! let engine = Engine::with_builtins().unwrap();
//! let config = EngineConfiguration::new()
//!     .with_base_path("/wiki")
//!     .with_emoji(Emoji::new("smile", "Smile"));
//!
//! let page = PageRef::new("@@Tags(intro)\n== Welcome ==\n*Hello* %smile%");
//! let result = engine.compile(&config, &page);
//!
//! assert_eq!(
//!     result.html,
//!     "<h2 id=\"welcome\">Welcome</h2>\n<strong>Hello</strong> <img src=\"/wiki/file/Emoji/smile\" alt=\"Smile\" />"
//! );
//! assert!(result.tags.contains("intro"));
//! ```

mod config;
mod driver;
mod error;
mod functions;
mod handlers;
mod html;
mod instruction;
mod metrics;
mod navigation;
mod prototype;
mod scanner;
mod state;

pub use config::{DEFAULT_MAX_NESTING_DEPTH, Emoji, EngineConfiguration, PageRef};
pub use driver::{CompileResult, Engine};
pub use error::{CompileError, MetricsError, PrototypeError};
pub use functions::{InstructionFunction, ScopedFunction, StandardFunction};
pub use html::{escape_attr, escape_text};
pub use instruction::{HandlerResult, Instruction};
pub use metrics::{CompilationStatistics, MetricsSink, NullMetricsSink};
pub use navigation::clean_navigation;
pub use prototype::{
    ArgValue, FunctionArgs, FunctionKind, FunctionPrototype, FunctionRegistry, ParamType,
    PrototypeParameter,
};
pub use state::{EngineState, PageFlag};

/// Run `f` with a fresh state for a fixed test page.
#[cfg(test)]
pub(crate) fn with_state<R>(
    config: &EngineConfiguration,
    f: impl FnOnce(&mut EngineState<'_>) -> R,
) -> R {
    let page = PageRef {
        id: 1,
        name: "Test Page".to_owned(),
        navigation: "test_page".to_owned(),
        body: String::new(),
        revision: 3,
    };
    let registry = FunctionRegistry::new();
    let mut state = EngineState::new(config, &page, &registry);
    f(&mut state)
}
