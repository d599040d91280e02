// crates/perf-shard-core/src/runtime/events.rs
// ============================================================================
// Module: Pipeline Events
// Description: Structured progress and failure events for result processing.
// Purpose: Emit JSON-line logs without hard dependencies on a logging stack.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The result pipeline reports progress, skipped inputs, and per-benchmark
//! failures as [`PipelineEvent`] records. Sinks decide where records go:
//! stderr, any writer (one JSON object per line), or nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Event Labels
// ============================================================================

/// Step completed with its wall-clock duration.
pub const EVENT_STEP_DURATION: &str = "step_duration";
/// Test results for a shard directory were absent or empty.
pub const EVENT_RESULTS_MISSING: &str = "results_missing";
/// Test results for a shard directory were unreadable or not a JSON object.
pub const EVENT_RESULTS_INVALID: &str = "results_invalid";
/// Benchmark executed no tests and will not be uploaded.
pub const EVENT_BENCHMARK_DISABLED: &str = "benchmark_disabled";
/// Benchmark log file was absent.
pub const EVENT_LOG_MISSING: &str = "log_missing";
/// Log stream could not be published.
pub const EVENT_PUBLISH_FAILED: &str = "publish_failed";
/// Per-benchmark result merge failed.
pub const EVENT_MERGE_FAILED: &str = "merge_failed";
/// Upload is starting for a benchmark.
pub const EVENT_UPLOAD_STARTED: &str = "upload_started";
/// Upload failed for a benchmark.
pub const EVENT_UPLOAD_FAILED: &str = "upload_failed";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Structured pipeline event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineEvent {
    /// Event label.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Benchmark the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<String>,
    /// Pipeline step name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Step duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    /// Filesystem path involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Error or detail message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PipelineEvent {
    /// Creates an event with only the label and timestamp set.
    #[must_use]
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            timestamp_ms: now_ms(),
            benchmark: None,
            step: None,
            duration_ms: None,
            path: None,
            message: None,
        }
    }

    /// Sets the benchmark.
    #[must_use]
    pub fn with_benchmark(mut self, benchmark: impl Into<String>) -> Self {
        self.benchmark = Some(benchmark.into());
        self
    }

    /// Sets the path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Creates a step duration event.
    #[must_use]
    pub fn step_duration(step: impl Into<String>, duration_ms: u128) -> Self {
        let mut event = Self::new(EVENT_STEP_DURATION);
        event.step = Some(step.into());
        event.duration_ms = Some(duration_ms);
        event
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for pipeline events.
pub trait EventSink {
    /// Records an event. Sink failures are swallowed.
    fn record(&self, event: &PipelineEvent);
}

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &PipelineEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink writing JSON lines to an arbitrary writer.
pub struct JsonLineEventSink<W: Write> {
    /// Output writer for event records.
    writer: Mutex<W>,
}

impl<W: Write> JsonLineEventSink<W> {
    /// Creates a sink over a writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the inner writer.
    ///
    /// # Errors
    ///
    /// Returns the poisoned writer when a previous holder panicked.
    pub fn into_inner(self) -> Result<W, std::sync::PoisonError<W>> {
        self.writer.into_inner()
    }
}

impl<W: Write> EventSink for JsonLineEventSink<W> {
    fn record(&self, event: &PipelineEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut writer) = self.writer.lock()
        {
            let _ = writeln!(writer, "{payload}");
            let _ = writer.flush();
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &PipelineEvent) {}
}

// ============================================================================
// SECTION: Step Timing
// ============================================================================

/// Measures one pipeline step and reports it as a duration event.
pub struct StepTimer {
    /// Step name.
    step: String,
    /// Start instant.
    started: Instant,
}

impl StepTimer {
    /// Starts timing a step.
    #[must_use]
    pub fn start(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            started: Instant::now(),
        }
    }

    /// Stops timing and records the duration.
    pub fn finish(self, sink: &dyn EventSink) {
        let elapsed = self.started.elapsed().as_millis();
        sink.record(&PipelineEvent::step_duration(self.step, elapsed));
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current time in milliseconds since epoch, or zero if the clock is unset.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|duration| duration.as_millis()).unwrap_or(0)
}
