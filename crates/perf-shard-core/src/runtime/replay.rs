// crates/perf-shard-core/src/runtime/replay.rs
// ============================================================================
// Module: Sharding Map Replay
// Description: Re-evaluates a persisted sharding map against timing data.
// Purpose: Validate a generated map against fresh timing before committing it.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Replay walks every shard's benchmark ranges over the catalog story lists
//! and sums the durations found in the supplied timing data. Stories absent
//! from the timing data count as zero. Replaying a map against the timing data
//! it was generated from reproduces the generator's per-shard totals.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use thiserror::Error;

use crate::core::BenchmarkName;
use crate::core::ShardingMap;
use crate::core::StoryCatalog;
use crate::core::StoryKey;
use crate::core::TimingData;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key carrying the shard total in the replay report.
pub const FULL_TIME_KEY: &str = "full_time";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Sharding map replay errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    /// Map referenced a benchmark missing from the catalog.
    #[error("shard {shard} references unknown benchmark {benchmark}")]
    UnknownBenchmark {
        /// Shard index.
        shard: usize,
        /// Benchmark name.
        benchmark: BenchmarkName,
    },
    /// Map range falls outside the benchmark's story list.
    #[error(
        "shard {shard} range [{begin}, {end}) is outside {benchmark} ({story_count} stories)"
    )]
    RangeOutOfBounds {
        /// Shard index.
        shard: usize,
        /// Benchmark name.
        benchmark: BenchmarkName,
        /// Range start.
        begin: usize,
        /// Range end.
        end: usize,
        /// Number of stories in the benchmark.
        story_count: usize,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Replayed timing for one shard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayShard {
    /// Stories in the shard with their durations, in map order.
    pub stories: Vec<(StoryKey, f64)>,
    /// Sum of all story durations in the shard.
    pub full_time: f64,
}

/// Replayed timing for every shard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    /// Shards in index order.
    pub shards: Vec<ReplayShard>,
}

impl ReplayReport {
    /// Returns each shard's total in index order.
    #[must_use]
    pub fn full_times(&self) -> Vec<f64> {
        self.shards.iter().map(|shard| shard.full_time).collect()
    }
}

// ============================================================================
// SECTION: Replay
// ============================================================================

/// Replays a sharding map against timing data.
///
/// # Errors
///
/// Returns [`ReplayError`] when the map references benchmarks or ranges the
/// catalog does not contain.
pub fn replay_sharding_map(
    map: &ShardingMap,
    timing: &TimingData,
    all_stories: &StoryCatalog,
) -> Result<ReplayReport, ReplayError> {
    let mut report = ReplayReport::default();
    for (shard_index, shard) in map.shards.iter().enumerate() {
        let mut replayed = ReplayShard::default();
        for entry in &shard.benchmarks {
            let stories = all_stories.stories(&entry.benchmark).ok_or_else(|| {
                ReplayError::UnknownBenchmark {
                    shard: shard_index,
                    benchmark: entry.benchmark.clone(),
                }
            })?;
            let (begin, end) = entry.range.bounds(stories.len());
            let window = stories.get(begin .. end).ok_or_else(|| ReplayError::RangeOutOfBounds {
                shard: shard_index,
                benchmark: entry.benchmark.clone(),
                begin,
                end,
                story_count: stories.len(),
            })?;
            for story in window {
                let key = StoryKey::new(entry.benchmark.clone(), story.clone());
                let duration = timing.get(&key).unwrap_or(0.0);
                replayed.full_time += duration;
                replayed.stories.push((key, duration));
            }
        }
        report.shards.push(replayed);
    }
    Ok(report)
}

/// Formats a duration the way replay reports have always shown it: whole
/// numbers keep one decimal place (`60.0`).
#[must_use]
pub fn format_duration(duration: f64) -> String {
    if duration.is_finite() && duration.fract() == 0.0 && duration.abs() < 1e16 {
        format!("{duration:.1}")
    } else {
        duration.to_string()
    }
}

// ============================================================================
// SECTION: Serialization
// ============================================================================

impl Serialize for ReplayShard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.stories.len() + 1))?;
        for (key, duration) in &self.stories {
            map.serialize_entry(&key.to_string(), &format_duration(*duration))?;
        }
        map.serialize_entry(FULL_TIME_KEY, &self.full_time)?;
        map.end()
    }
}

impl Serialize for ReplayReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.shards.len()))?;
        for (index, shard) in self.shards.iter().enumerate() {
            map.serialize_entry(&index.to_string(), shard)?;
        }
        map.end()
    }
}
