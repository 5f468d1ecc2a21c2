//! Handler result and instruction types.
//!
//! Every handler returns a [`HandlerResult`]: the text it emits plus a list of
//! [`Instruction`]s telling the driver how to treat that text and its
//! surroundings.

/// Signal from a handler to the driver.
///
/// When several instructions are returned together the driver applies them in
/// a fixed order: [`Skip`](Self::Skip) first (and nothing else if present),
/// then [`DisallowNestedProcessing`](Self::DisallowNestedProcessing), then
/// [`TruncateTrailingLine`](Self::TruncateTrailingLine).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Instruction {
    /// Consume a single line terminator directly after the construct.
    TruncateTrailingLine,
    /// Do not compile the emitted text (or, when pending on a scope, its body).
    DisallowNestedProcessing,
    /// Decline the construct: the source text stays as written.
    Skip,
}

/// Output of a single handler invocation.
///
/// # Example
///
/// ```
/// use wiki_engine::{HandlerResult, Instruction};
///
/// let result = HandlerResult::html("<br />");
/// assert_eq!(result.text, "<br />");
///
/// let result = HandlerResult::empty().with_instruction(Instruction::TruncateTrailingLine);
/// assert!(result.has(Instruction::TruncateTrailingLine));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandlerResult {
    /// Emitted HTML (possibly empty).
    pub text: String,
    /// Instructions for the driver, in the order they were attached.
    pub instructions: Vec<Instruction>,
}

impl HandlerResult {
    /// Create a result that emits `text`.
    #[must_use]
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            instructions: Vec::new(),
        }
    }

    /// Create a result that emits nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a result that declines the construct.
    #[must_use]
    pub fn skip() -> Self {
        Self::empty().with_instruction(Instruction::Skip)
    }

    /// Attach an instruction.
    #[must_use]
    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        if !self.instructions.contains(&instruction) {
            self.instructions.push(instruction);
        }
        self
    }

    /// Whether the result carries `instruction`.
    #[must_use]
    pub fn has(&self, instruction: Instruction) -> bool {
        self.instructions.contains(&instruction)
    }
}
