// crates/perf-shard-core/src/core/results.rs
// ============================================================================
// Module: Performance Result Shapes
// Description: Chart-JSON and histogram-set result containers.
// Purpose: Classify a result document once, at load time, by its JSON root.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The measurement harness writes `perf_results.json` in one of two shapes: a
//! chart-JSON object whose `charts` member maps chart names to data, or a
//! histogram set, which is a list of independent histogram records.
//! [`PerfResult`] records which shape a document has so that merge logic
//! dispatches on the tag instead of re-inspecting JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Member of a chart-JSON document holding the chart entries.
pub const CHARTS_KEY: &str = "charts";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Root shape of a result document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// JSON object with a `charts` member.
    Chart,
    /// JSON array of histogram records.
    Histograms,
}

impl ResultShape {
    /// Returns a stable label for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chart => "chart_json",
            Self::Histograms => "histogram_set",
        }
    }
}

/// Performance result document tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PerfResult {
    /// Chart-JSON container.
    Chart(Map<String, Value>),
    /// Histogram set.
    Histograms(Vec<Value>),
}

impl PerfResult {
    /// Classifies a JSON value; scalars and null are not result documents.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Chart(map)),
            Value::Array(items) => Some(Self::Histograms(items)),
            _ => None,
        }
    }

    /// Returns the document shape.
    #[must_use]
    pub const fn shape(&self) -> ResultShape {
        match self {
            Self::Chart(_) => ResultShape::Chart,
            Self::Histograms(_) => ResultShape::Histograms,
        }
    }

    /// Returns true for histogram sets.
    #[must_use]
    pub const fn is_histogram(&self) -> bool {
        matches!(self, Self::Histograms(_))
    }

    /// Converts the result back into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Chart(map) => Value::Object(map),
            Self::Histograms(items) => Value::Array(items),
        }
    }
}
