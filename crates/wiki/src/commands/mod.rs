//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod compile;
pub(crate) mod functions;
mod page;

pub(crate) use check::CheckArgs;
pub(crate) use compile::CompileArgs;
pub(crate) use functions::FunctionsArgs;
