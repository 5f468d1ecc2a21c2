//! Compilation statistics sinks for the wiki engine.
//!
//! The engine reports one [`CompilationStatistics`] record per compile through
//! the [`MetricsSink`] trait. This crate provides the concrete destinations:
//!
//! - [`JsonLinesSink`]: appends one JSON object per compile to a file
//! - [`LogSink`]: emits statistics as structured `tracing` events
//! - [`MemorySink`]: collects statistics in memory (behind `mock` feature flag)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wiki_engine::{Engine, EngineConfiguration, PageRef};
//! use wiki_metrics::JsonLinesSink;
//!
//! let sink = JsonLinesSink::open("stats.jsonl")?;
//! let engine = Engine::with_builtins()?.with_metrics_sink(Arc::new(sink));
//! let config = EngineConfiguration::new().with_compilation_metrics(true);
//! engine.compile(&config, &PageRef::new("*hello*"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod json;
mod log;
#[cfg(feature = "mock")]
mod memory;

pub use json::JsonLinesSink;
pub use log::LogSink;
#[cfg(feature = "mock")]
pub use memory::MemorySink;

pub use wiki_engine::{CompilationStatistics, MetricsError, MetricsSink};
