//! CLI error types.

use wiki_config::ConfigError;
use wiki_engine::{MetricsError, PrototypeError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Prototype(#[from] PrototypeError),

    #[error("{0}")]
    Metrics(#[from] MetricsError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}
