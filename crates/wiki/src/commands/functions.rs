//! `wiki functions` command implementation.

use clap::Args;
use wiki_engine::{FunctionKind, FunctionRegistry};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the functions command.
#[derive(Args)]
pub(crate) struct FunctionsArgs {
    /// Only list functions of this kind.
    #[arg(long, value_parser = ["standard", "scoped", "instruction"])]
    kind: Option<String>,
}

impl FunctionsArgs {
    /// Execute the functions command.
    ///
    /// # Errors
    ///
    /// Returns an error if the builtin registry cannot be built or stdout is
    /// closed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let registry = FunctionRegistry::with_builtins()?;
        for line in signatures(&registry, self.kind.as_deref()) {
            output.document(&line)?;
        }
        Ok(())
    }
}

fn signatures(registry: &FunctionRegistry, kind: Option<&str>) -> Vec<String> {
    registry
        .prototypes()
        .into_iter()
        .filter(|prototype| kind.is_none_or(|kind| kind_name(prototype.kind) == kind))
        .map(wiki_engine::FunctionPrototype::signature)
        .collect()
}

fn kind_name(kind: FunctionKind) -> &'static str {
    match kind {
        FunctionKind::Standard => "standard",
        FunctionKind::Scoped => "scoped",
        FunctionKind::Instruction => "instruction",
    }
}
