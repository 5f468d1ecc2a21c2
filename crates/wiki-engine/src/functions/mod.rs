//! Wiki function handler traits and the built-in function library.
//!
//! Functions come in three kinds, selected by the call sigil:
//!
//! - **Standard** ([`StandardFunction`]): `##Name(args)` - emits HTML
//! - **Scoped** ([`ScopedFunction`]): `{{Name(args) body }}` - wraps a compiled body
//! - **Instruction** ([`InstructionFunction`]): `@@Name(args)` - no output, updates
//!   page state (tags, flags)
//!
//! Each handler declares its prototype as a definition string (see
//! [`FunctionPrototype`](crate::FunctionPrototype)). Handlers are registered
//! once in a [`FunctionRegistry`](crate::FunctionRegistry) and shared by all
//! compiles, so they take `&self` and must be `Send + Sync`; per-page data
//! lives in [`EngineState`].
//!
//! # Example
//!
//! ```
//! use wiki_engine::{
//!     CompileError, EngineState, FunctionArgs, FunctionRegistry, HandlerResult, StandardFunction,
//! };
//!
//! struct Kbd;
//!
//! impl StandardFunction for Kbd {
//!     fn prototype(&self) -> &str {
//!         "##Kbd: <infinitestring>{keys}"
//!     }
//!
//!     fn call(&self, _state: &mut EngineState<'_>, args: &FunctionArgs) -> Result<HandlerResult, CompileError> {
//!         let keys = args.text("keys").unwrap_or_default();
//!         Ok(HandlerResult::html(format!("<kbd>{}</kbd>", wiki_engine::escape_text(keys))))
//!     }
//! }
//!
//! let mut registry = FunctionRegistry::new();
//! registry.register_standard(Kbd).unwrap();
//! ```

mod instruction;
mod scoped;
mod standard;

use crate::{CompileError, EngineState, FunctionArgs, HandlerResult, Instruction};

pub(crate) use instruction::register_builtins as register_instruction_builtins;
pub(crate) use scoped::register_builtins as register_scoped_builtins;
pub(crate) use standard::register_builtins as register_standard_builtins;

/// Handler for standard functions: `##Name(args)`.
pub trait StandardFunction: Send + Sync {
    /// Prototype definition, e.g. `"##Anchor: <string>{name}"`.
    fn prototype(&self) -> &str;

    /// Execute the function.
    ///
    /// The returned text is compiled again (emitted mode) unless the result
    /// carries [`Instruction::DisallowNestedProcessing`].
    fn call(
        &self,
        state: &mut EngineState<'_>,
        args: &FunctionArgs,
    ) -> Result<HandlerResult, CompileError>;
}

/// Handler for scoped functions: `{{Name(args) body }}`.
pub trait ScopedFunction: Send + Sync {
    /// Prototype definition, e.g. `"{{Collapse: <string>[title=Show]"`.
    fn prototype(&self) -> &str;

    /// Instructions pending while the body is prepared.
    ///
    /// Returning [`Instruction::DisallowNestedProcessing`] hands the body to
    /// [`call`](Self::call) escaped but uncompiled.
    fn body_instructions(&self) -> &[Instruction] {
        &[]
    }

    /// Execute the function with its prepared body.
    fn call(
        &self,
        state: &mut EngineState<'_>,
        args: &FunctionArgs,
        body: &str,
    ) -> Result<HandlerResult, CompileError>;
}

/// Handler for instruction functions: `@@Name(args)`.
///
/// Instruction functions emit no text; the driver removes the line they
/// occupy.
pub trait InstructionFunction: Send + Sync {
    /// Prototype definition, e.g. `"@@Tags: <infinitestring>{tags}"`.
    fn prototype(&self) -> &str;

    /// Apply the instruction to the page state.
    fn call(&self, state: &mut EngineState<'_>, args: &FunctionArgs) -> Result<(), CompileError>;
}
