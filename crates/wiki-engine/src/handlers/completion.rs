//! Completion: reports compilation statistics once the body is compiled.

use crate::{CompilationStatistics, EngineState, MetricsSink};

/// Build the statistics snapshot of a finished compile.
pub(crate) fn statistics(state: &EngineState<'_>) -> CompilationStatistics {
    let elapsed_ms = state
        .processing_time
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));

    CompilationStatistics {
        page_id: state.page.id,
        elapsed_ms,
        match_count: state.match_count,
        error_count: state.error_count,
        outgoing_link_count: state.outgoing_links.len(),
        tag_count: state.tags.len(),
        html_length: state.html_result.len(),
        body_length: state.page.body.len(),
    }
}

/// Report statistics to `sink` if the configuration asks for it.
///
/// Sink failures are logged and otherwise ignored; the HTML is never touched.
pub(crate) fn complete(state: &EngineState<'_>, sink: &dyn MetricsSink) {
    if !state.config.record_compilation_metrics {
        return;
    }

    let statistics = statistics(state);
    if let Err(e) = sink.record_compilation_statistics(&statistics) {
        tracing::warn!(page_id = state.page.id, error = %e, "Failed to record compilation statistics");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::{EngineConfiguration, MetricsError, with_state};

    #[derive(Default)]
    struct Recording(Mutex<Vec<CompilationStatistics>>);

    impl MetricsSink for Recording {
        fn record_compilation_statistics(
            &self,
            statistics: &CompilationStatistics,
        ) -> Result<(), MetricsError> {
            self.0.lock().unwrap().push(statistics.clone());
            Ok(())
        }
    }

    struct Failing;

    impl MetricsSink for Failing {
        fn record_compilation_statistics(
            &self,
            _statistics: &CompilationStatistics,
        ) -> Result<(), MetricsError> {
            Err(MetricsError::Other("disk full".to_owned()))
        }
    }

    #[test]
    fn test_disabled_never_calls_sink() {
        let sink = Recording::default();
        with_state(&EngineConfiguration::new(), |state| complete(state, &sink));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_enabled_calls_sink_once() {
        let sink = Recording::default();
        let config = EngineConfiguration::new().with_compilation_metrics(true);
        with_state(&config, |state| {
            state.html_result.push_str("<p>x</p>");
            state.match_count = 2;
            state.processing_time = Some(Duration::from_millis(12));
            complete(state, &sink);
        });

        let recorded = sink.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].match_count, 2);
        assert_eq!(recorded[0].html_length, 8);
        assert_eq!(recorded[0].elapsed_ms, 12);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let config = EngineConfiguration::new().with_compilation_metrics(true);
        let html = with_state(&config, |state| {
            state.html_result.push_str("kept");
            complete(state, &Failing);
            state.html_result().to_owned()
        });
        assert_eq!(html, "kept");
    }
}
