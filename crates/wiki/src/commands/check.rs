//! `wiki check` command implementation.

use clap::Args;

use super::page::{self, PageArgs};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    pub page: PageArgs,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the page has recovered errors.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.page.config()?;
        let (engine, engine_config) = page::engine(&config)?;
        let page = self.page.page()?;

        let result = engine.compile(&engine_config, &page);
        let file = self.page.file.display();

        output.detail(&format!(
            "{} construct(s), {} link(s), {} tag(s)",
            result.constructs_identified,
            result.outgoing_links.len(),
            result.tags.len()
        ));

        if result.diagnostics.is_empty() {
            output.success(&format!("{file}: ok"));
            return Ok(());
        }

        for diagnostic in &result.diagnostics {
            output.warning(&format!("{file}: {diagnostic}"));
        }
        Err(CliError::Validation(format!(
            "{file}: {} construct(s) could not be compiled",
            result.error_count
        )))
    }
}
