//! JSON-lines file sink.
//!
//! [`JsonLinesSink`] appends each record as a single line:
//!
//! ```text
//! {"page_id":7,"elapsed_ms":2,"match_count":12,"error_count":0,...}
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{CompilationStatistics, MetricsError, MetricsSink};

/// [`MetricsSink`] appending statistics to a JSON-lines file.
///
/// Writes from concurrent compiles are serialized, one line per record.
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it and its parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, MetricsError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), "Opened statistics log");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the statistics file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonLinesSink {
    fn record_compilation_statistics(
        &self,
        statistics: &CompilationStatistics,
    ) -> Result<(), MetricsError> {
        let mut line =
            serde_json::to_vec(statistics).map_err(|e| MetricsError::Other(e.to_string()))?;
        line.push(b'\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| MetricsError::Other("statistics log lock poisoned".to_owned()))?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn statistics(page_id: i64) -> CompilationStatistics {
        CompilationStatistics {
            page_id,
            elapsed_ms: 4,
            match_count: 3,
            error_count: 1,
            outgoing_link_count: 2,
            tag_count: 1,
            html_length: 120,
            body_length: 80,
        }
    }

    #[test]
    fn test_appends_one_line_per_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stats.jsonl");
        let sink = JsonLinesSink::open(&path).unwrap();

        sink.record_compilation_statistics(&statistics(1)).unwrap();
        sink.record_compilation_statistics(&statistics(2)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"page_id":1,"elapsed_ms":4,"match_count":3,"error_count":1,"outgoing_link_count":2,"tag_count":1,"html_length":120,"body_length":80}"#
        );

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["page_id"], 2);
    }

    #[test]
    fn test_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs/wiki/stats.jsonl");

        let sink = JsonLinesSink::open(&path).unwrap();
        sink.record_compilation_statistics(&statistics(1)).unwrap();

        assert!(path.exists());
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn test_reopen_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stats.jsonl");

        JsonLinesSink::open(&path)
            .unwrap()
            .record_compilation_statistics(&statistics(1))
            .unwrap();
        JsonLinesSink::open(&path)
            .unwrap()
            .record_compilation_statistics(&statistics(2))
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_open_fails_on_directory() {
        let tmp = TempDir::new().unwrap();
        let result = JsonLinesSink::open(tmp.path());
        assert!(matches!(result, Err(MetricsError::Io(_))));
    }

    #[test]
    fn test_concurrent_writes_keep_lines_intact() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stats.jsonl");
        let sink = Arc::new(JsonLinesSink::open(&path).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for j in 0..25 {
                        sink.record_compilation_statistics(&statistics(i * 100 + j))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 100);
        for line in content.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["page_id"].is_i64());
        }
    }

    #[test]
    fn test_engine_writes_through_sink() {
        use wiki_engine::{Engine, EngineConfiguration, PageRef};

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stats.jsonl");
        let sink = Arc::new(JsonLinesSink::open(&path).unwrap());
        let engine = Engine::with_builtins()
            .unwrap()
            .with_metrics_sink(Arc::clone(&sink) as Arc<dyn MetricsSink>);
        let config = EngineConfiguration::new().with_compilation_metrics(true);
        let mut page = PageRef::new("*a* [[Other]] @@Tags(x)");
        page.id = 42;

        engine.compile(&config, &page);

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["page_id"], 42);
        assert_eq!(value["match_count"], 3);
        assert_eq!(value["outgoing_link_count"], 1);
        assert_eq!(value["tag_count"], 1);
    }
}
