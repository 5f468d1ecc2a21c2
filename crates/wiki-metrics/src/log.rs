//! Tracing sink.

use crate::{CompilationStatistics, MetricsError, MetricsSink};

/// [`MetricsSink`] emitting each record as an `info` event on the
/// `wiki_metrics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn record_compilation_statistics(
        &self,
        statistics: &CompilationStatistics,
    ) -> Result<(), MetricsError> {
        tracing::info!(
            target: "wiki_metrics",
            page_id = statistics.page_id,
            elapsed_ms = statistics.elapsed_ms,
            match_count = statistics.match_count,
            error_count = statistics.error_count,
            outgoing_link_count = statistics.outgoing_link_count,
            tag_count = statistics.tag_count,
            html_length = statistics.html_length,
            body_length = statistics.body_length,
            "Page compiled"
        );
        Ok(())
    }
}
