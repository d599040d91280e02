// crates/perf-shard-core/src/runtime/merge.rs
// ============================================================================
// Module: Result Merging
// Description: Merges per-shard performance results and test-status documents.
// Purpose: Recombine benchmarks that the partitioner split across shards.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A benchmark split across shards produces one `perf_results.json` per shard.
//! The first document decides the merge strategy:
//! - chart-JSON: later documents' `charts` entries are copied into the first
//!   document's `charts` object; repeated chart names take the later value.
//! - histogram set: lists are concatenated in input order without dedup.
//!
//! Test-status documents merge by deep structural union: nested objects merge
//! recursively and every other value is replaced by the later document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::BenchmarkName;
use crate::core::CHARTS_KEY;
use crate::core::PerfResult;
use crate::core::ResultShape;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Member of the aggregate test-status document carrying auxiliary links.
pub const LINKS_KEY: &str = "links";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Result merge errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// Nothing to merge.
    #[error("no results to merge for {0}")]
    Empty(String),
    /// Inputs disagree on root shape.
    #[error("result shape mismatch for {benchmark}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Benchmark or document set being merged.
        benchmark: String,
        /// Shape of the first input.
        expected: &'static str,
        /// Shape of the offending input.
        found: &'static str,
    },
    /// Input is not a mergeable document.
    #[error("invalid result document for {benchmark}: {detail}")]
    InvalidShape {
        /// Benchmark or document set being merged.
        benchmark: String,
        /// What was wrong with the document.
        detail: String,
    },
    /// Input file could not be read.
    #[error("failed to read {path}: {error}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error message.
        error: String,
    },
    /// Input file was not valid JSON.
    #[error("failed to parse {path}: {error}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying error message.
        error: String,
    },
}

// ============================================================================
// SECTION: Performance Results
// ============================================================================

/// Merges already-classified results for one benchmark.
///
/// # Errors
///
/// Returns [`MergeError`] when the input is empty, shapes disagree, or a
/// chart-JSON `charts` member is not an object.
pub fn merge_perf_results(
    benchmark: &BenchmarkName,
    results: Vec<PerfResult>,
) -> Result<PerfResult, MergeError> {
    let mut results = results.into_iter();
    let Some(first) = results.next() else {
        return Err(MergeError::Empty(benchmark.to_string()));
    };
    match first {
        PerfResult::Chart(mut merged) => {
            for result in results {
                match result {
                    PerfResult::Chart(document) => merge_charts(benchmark, &mut merged, document)?,
                    other => {
                        return Err(shape_mismatch(benchmark, ResultShape::Chart, other.shape()));
                    }
                }
            }
            Ok(PerfResult::Chart(merged))
        }
        PerfResult::Histograms(mut merged) => {
            for result in results {
                match result {
                    PerfResult::Histograms(items) => merged.extend(items),
                    other => {
                        return Err(shape_mismatch(
                            benchmark,
                            ResultShape::Histograms,
                            other.shape(),
                        ));
                    }
                }
            }
            Ok(PerfResult::Histograms(merged))
        }
    }
}

/// Loads and merges a benchmark's result files in the given order.
///
/// # Errors
///
/// Returns [`MergeError`] when a file cannot be read or parsed, a document is
/// neither an object nor a list, or the documents cannot be merged.
pub fn merge_benchmark_results<P: AsRef<Path>>(
    benchmark: &BenchmarkName,
    result_files: &[P],
) -> Result<PerfResult, MergeError> {
    let mut results = Vec::with_capacity(result_files.len());
    for path in result_files {
        results.push(load_perf_result(benchmark, path.as_ref())?);
    }
    merge_perf_results(benchmark, results)
}

/// Loads one result file and classifies its shape.
///
/// # Errors
///
/// Returns [`MergeError`] when the file cannot be read, parsed, or classified.
pub fn load_perf_result(benchmark: &BenchmarkName, path: &Path) -> Result<PerfResult, MergeError> {
    let value = read_json(path)?;
    PerfResult::from_value(value).ok_or_else(|| MergeError::InvalidShape {
        benchmark: benchmark.to_string(),
        detail: format!("{} is neither a chart-JSON object nor a histogram list", path.display()),
    })
}

// ============================================================================
// SECTION: Test Status
// ============================================================================

/// Merges test-status documents and attaches `links` when any are supplied.
///
/// # Errors
///
/// Returns [`MergeError::InvalidShape`] when a document is not a JSON object.
pub fn merge_test_status(
    test_result_jsons: Vec<Value>,
    extra_links: &BTreeMap<String, String>,
) -> Result<Value, MergeError> {
    let mut merged = Map::new();
    for (position, document) in test_result_jsons.into_iter().enumerate() {
        let Value::Object(document) = document else {
            return Err(MergeError::InvalidShape {
                benchmark: "test results".to_string(),
                detail: format!("document {position} is not a JSON object"),
            });
        };
        deep_merge(&mut merged, document);
    }
    if !extra_links.is_empty() {
        let links =
            extra_links.iter().map(|(label, url)| (label.clone(), Value::String(url.clone())));
        merged.insert(LINKS_KEY.to_string(), Value::Object(links.collect()));
    }
    Ok(Value::Object(merged))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Copies `document.charts` entries into `merged.charts`, later entries winning.
fn merge_charts(
    benchmark: &BenchmarkName,
    merged: &mut Map<String, Value>,
    mut document: Map<String, Value>,
) -> Result<(), MergeError> {
    let Some(charts) = document.remove(CHARTS_KEY) else {
        return Ok(());
    };
    let Value::Object(charts) = charts else {
        return Err(invalid_charts(benchmark));
    };
    let target = merged.entry(CHARTS_KEY).or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(target) = target else {
        return Err(invalid_charts(benchmark));
    };
    for (name, chart) in charts {
        target.insert(name, chart);
    }
    Ok(())
}

/// Recursively unions `source` into `target`; non-object values overwrite.
fn deep_merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        let incoming = match value {
            Value::Object(incoming) => incoming,
            other => {
                target.insert(key, other);
                continue;
            }
        };
        if let Some(Value::Object(existing)) = target.get_mut(&key) {
            deep_merge(existing, incoming);
            continue;
        }
        target.insert(key, Value::Object(incoming));
    }
}

/// Reads and parses a JSON file.
fn read_json(path: &Path) -> Result<Value, MergeError> {
    let text = fs::read_to_string(path).map_err(|err| MergeError::Io {
        path: path.display().to_string(),
        error: err.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|err| MergeError::Parse {
        path: path.display().to_string(),
        error: err.to_string(),
    })
}

/// Builds a shape mismatch error.
fn shape_mismatch(
    benchmark: &BenchmarkName,
    expected: ResultShape,
    found: ResultShape,
) -> MergeError {
    MergeError::ShapeMismatch {
        benchmark: benchmark.to_string(),
        expected: expected.as_str(),
        found: found.as_str(),
    }
}

/// Builds the error for a non-object `charts` member.
fn invalid_charts(benchmark: &BenchmarkName) -> MergeError {
    MergeError::InvalidShape {
        benchmark: benchmark.to_string(),
        detail: format!("{CHARTS_KEY} must be a JSON object"),
    }
}
