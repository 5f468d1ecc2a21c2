//! Arguments and setup shared by the page commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use wiki_config::{CliSettings, Config};
use wiki_engine::{Engine, EngineConfiguration, MetricsSink, PageRef, clean_navigation};
use wiki_metrics::{JsonLinesSink, LogSink};

use crate::error::CliError;

/// Page source and identity.
#[derive(Args)]
pub(crate) struct PageArgs {
    /// Path to the wiki markup file.
    pub file: PathBuf,

    /// Path to configuration file (default: auto-discover wiki.toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Page id reported in statistics.
    #[arg(long, default_value_t = 0)]
    pub page_id: i64,

    /// Page name (default: file stem).
    #[arg(long)]
    pub name: Option<String>,

    /// Page navigation path (default: derived from the name).
    #[arg(long)]
    pub navigation: Option<String>,

    /// Page revision.
    #[arg(long, default_value_t = 1)]
    pub revision: i32,

    /// URL prefix of generated links (overrides config).
    #[arg(long)]
    pub base_path: Option<String>,

    /// Record compilation statistics (overrides config).
    #[arg(long)]
    pub record_metrics: bool,

    /// Enable verbose output (statistics and construct errors in the log).
    #[arg(short, long)]
    pub verbose: bool,
}

impl PageArgs {
    /// Load the configuration with command-line overrides.
    pub(crate) fn config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            base_path: self.base_path.clone(),
            record_compilation_metrics: self.record_metrics.then_some(true),
            ..Default::default()
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }

    /// Read the page file.
    pub(crate) fn page(&self) -> Result<PageRef, CliError> {
        let body = std::fs::read_to_string(&self.file)?;
        Ok(self.page_with_body(body))
    }

    fn page_with_body(&self, body: String) -> PageRef {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| file_stem(&self.file));
        let navigation = self
            .navigation
            .clone()
            .unwrap_or_else(|| clean_navigation(&name));
        PageRef {
            id: self.page_id,
            name,
            navigation,
            body,
            revision: self.revision,
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Engine with builtins and the configured statistics sink.
pub(crate) fn engine(config: &Config) -> Result<(Engine, EngineConfiguration), CliError> {
    let sink: Arc<dyn MetricsSink> = match &config.metrics_resolved.log_path {
        Some(path) => Arc::new(JsonLinesSink::open(path.as_path())?),
        None => Arc::new(LogSink),
    };
    let engine = Engine::with_builtins()?.with_metrics_sink(sink);
    Ok((engine, config.engine_configuration()))
}
