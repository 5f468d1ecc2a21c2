//! In-memory sink for testing.
//!
//! Provides [`MemorySink`] for asserting on reported statistics without a
//! file or subscriber.

use std::sync::{Mutex, PoisonError};

use crate::{CompilationStatistics, MetricsError, MetricsSink};

/// [`MetricsSink`] collecting records in memory.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use wiki_metrics::MemorySink;
///
/// let sink = Arc::new(MemorySink::new());
/// let engine = Engine::with_builtins()?.with_metrics_sink(sink.clone());
/// engine.compile(&config, &page);
/// assert_eq!(sink.records().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<CompilationStatistics>>,
    fail_with: Option<String>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that rejects every record with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    /// Records received so far, in order.
    #[must_use]
    pub fn records(&self) -> Vec<CompilationStatistics> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records received so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no record was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricsSink for MemorySink {
    fn record_compilation_statistics(
        &self,
        statistics: &CompilationStatistics,
    ) -> Result<(), MetricsError> {
        if let Some(message) = &self.fail_with {
            return Err(MetricsError::Other(message.clone()));
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(statistics.clone());
        Ok(())
    }
}
