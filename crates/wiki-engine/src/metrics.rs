//! Compilation statistics reporting.
//!
//! The engine reports per-compile statistics through the [`MetricsSink`]
//! trait, which decouples the engine from where statistics end up.
//!
//! # Implementations
//!
//! - [`NullMetricsSink`]: discards everything
//! - `wiki-metrics` provides JSON-lines, tracing and in-memory sinks
//!
//! # Example
//!
//! ```
//! use wiki_engine::{CompilationStatistics, MetricsSink, NullMetricsSink};
//!
//! let sink = NullMetricsSink;
//! sink.record_compilation_statistics(&CompilationStatistics::default()).unwrap();
//! ```

use crate::MetricsError;

/// Statistics of one compile, reported once by the completion handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CompilationStatistics {
    /// Id of the compiled page.
    pub page_id: i64,
    /// Wall-clock compile time in milliseconds.
    pub elapsed_ms: u64,
    /// Constructs handled successfully.
    pub match_count: usize,
    /// Constructs that failed and fell back to literal text.
    pub error_count: usize,
    /// Distinct pages linked from the body.
    pub outgoing_link_count: usize,
    /// Distinct tags set by `@@Tags`.
    pub tag_count: usize,
    /// Length of the generated HTML in bytes.
    pub html_length: usize,
    /// Length of the page body in bytes.
    pub body_length: usize,
}

/// Destination for compilation statistics.
///
/// Called synchronously, at most once per compile. Errors are logged by the
/// engine and never affect the compiled output.
pub trait MetricsSink: Send + Sync {
    /// Record the statistics of one compile.
    ///
    /// # Errors
    ///
    /// Returns an error if the statistics could not be stored.
    fn record_compilation_statistics(
        &self,
        statistics: &CompilationStatistics,
    ) -> Result<(), MetricsError>;
}

/// No-op [`MetricsSink`].
///
/// Use when no statistics destination is configured.
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record_compilation_statistics(
        &self,
        _statistics: &CompilationStatistics,
    ) -> Result<(), MetricsError> {
        Ok(())
    }
}
