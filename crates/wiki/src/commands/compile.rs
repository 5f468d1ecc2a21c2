//! `wiki compile` command implementation.

use std::path::PathBuf;

use clap::Args;

use super::page::{self, PageArgs};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the compile command.
#[derive(Args)]
pub(crate) struct CompileArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Write the result to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the full compile report as JSON instead of bare HTML.
    #[arg(long)]
    json: bool,
}

impl CompileArgs {
    /// Execute the compile command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or page cannot be loaded, or the
    /// result cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.page.config()?;
        let (engine, engine_config) = page::engine(&config)?;
        let page = self.page.page()?;

        let result = engine.compile(&engine_config, &page);
        tracing::info!(
            file = %self.page.file.display(),
            matches = result.match_count,
            errors = result.error_count,
            elapsed_ms = result.processing_time.as_millis(),
            "Compiled page"
        );

        let rendered = if self.json {
            serde_json::to_string_pretty(&result)?
        } else {
            result.html.clone()
        };

        match &self.output {
            Some(path) => {
                std::fs::write(path, &rendered)?;
                output.success(&format!("Wrote {}", path.display()));
            }
            None => output.document(&rendered)?,
        }

        for diagnostic in &result.diagnostics {
            output.warning(&format!("warning: {diagnostic}"));
        }

        Ok(())
    }
}
