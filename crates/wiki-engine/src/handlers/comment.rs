//! `;;` comment lines.

use crate::{HandlerResult, Instruction};

/// Drop the comment and the line break that ends it.
pub(crate) fn handle() -> HandlerResult {
    HandlerResult::empty().with_instruction(Instruction::TruncateTrailingLine)
}
