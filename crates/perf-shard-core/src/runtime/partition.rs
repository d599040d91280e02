// crates/perf-shard-core/src/runtime/partition.rs
// ============================================================================
// Module: Shard Partitioner
// Description: Greedy prefix bin-packing of stories into shards.
// Purpose: Produce balanced, order-preserving sharding maps from timing data.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Stories are consumed front to back from canonical-order timing data. Shard
//! `i` keeps taking the next story while doing so does not move the running
//! total further from the ideal cumulative boundary
//! `(total / num_shards) * (i + 1)`. Ties are taken (`<=`), so early shards
//! may be overfilled by one story on an exact tie; historical maps depend on
//! this rule for deterministic replay.
//!
//! ## Invariants
//! - Every story is assigned to exactly one shard, shards fill in index order,
//!   and assignments are never revisited.
//! - Stories left over after the last shard are reported, never dropped.
//! - Predicted min/max shard times are doubled for the reference-build run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use thiserror::Error;

use crate::core::BenchmarkName;
use crate::core::BenchmarkRange;
use crate::core::ExtraInfos;
use crate::core::Shard;
use crate::core::ShardingMap;
use crate::core::StoryCatalog;
use crate::core::StoryKey;
use crate::core::StoryRange;
use crate::core::StoryTiming;
use crate::core::TimingData;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Every measured run is paired with an equal-cost reference-build run.
pub const REFERENCE_RUN_FACTOR: f64 = 2.0;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Sharding map generation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ShardingError {
    /// Shard count was zero.
    #[error("num_shards must be at least 1")]
    InvalidShardCount,
    /// No timing entries were supplied.
    #[error("timing data is empty")]
    EmptyTiming,
    /// Timing referenced a benchmark missing from the catalog.
    #[error("benchmark {0} is not in the story catalog")]
    UnknownBenchmark(BenchmarkName),
    /// Timing referenced a story missing from its benchmark.
    #[error("story {0} is not in the story catalog")]
    UnknownStory(StoryKey),
    /// Stories remained after the last shard was filled.
    #[error("{remaining} stories left unassigned after {num_shards} shards (first: {first})")]
    PartitionResidue {
        /// Number of unassigned stories.
        remaining: usize,
        /// Shard count used.
        num_shards: usize,
        /// First unassigned story.
        first: StoryKey,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-shard assignment detail.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardDebug {
    /// Assigned stories with their durations, in assignment order.
    pub stories: Vec<StoryTiming>,
    /// Shard total, doubled for the reference-build run.
    pub expected_total_time: f64,
}

/// Assignment detail for every shard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingDebugReport {
    /// Shards in index order.
    pub shards: Vec<ShardDebug>,
}

/// Result of sharding map generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardingOutcome {
    /// Generated sharding map.
    pub map: ShardingMap,
    /// Undoubled total time per shard, in index order.
    pub shard_times: Vec<f64>,
    /// Assignment detail when requested.
    pub debug: Option<ShardingDebugReport>,
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Partitions timing data into `num_shards` balanced shards.
///
/// # Errors
///
/// Returns [`ShardingError`] when the shard count is zero, timing is empty,
/// timing references stories outside `all_stories`, or stories remain
/// unassigned after the last shard.
pub fn generate_sharding_map(
    timing: &TimingData,
    all_stories: &StoryCatalog,
    num_shards: usize,
    debug: bool,
) -> Result<ShardingOutcome, ShardingError> {
    if num_shards == 0 {
        return Err(ShardingError::InvalidShardCount);
    }
    if timing.is_empty() {
        return Err(ShardingError::EmptyTiming);
    }
    for entry in timing.entries() {
        story_position(all_stories, &entry.key)?;
    }

    let entries = timing.entries();
    let expected_time_per_shard = timing.total() / num_shards as f64;

    let mut cursor = 0;
    let mut total_time = 0.0;
    let mut shards = Vec::with_capacity(num_shards);
    let mut shard_times = Vec::with_capacity(num_shards);
    let mut debug_shards = Vec::new();
    let mut min_shard_time = f64::INFINITY;
    let mut min_shard_index = None;
    let mut max_shard_time = 0.0;
    let mut max_shard_index = None;

    for index in 0 .. num_shards {
        let expected_total_time = expected_time_per_shard * (index + 1) as f64;
        let mut last_diff = (total_time - expected_total_time).abs();
        let start = cursor;
        let mut shard_time = 0.0;
        while let Some(entry) = entries.get(cursor) {
            let diff = (total_time + entry.duration - expected_total_time).abs();
            if diff > last_diff {
                break;
            }
            total_time += entry.duration;
            shard_time += entry.duration;
            last_diff = diff;
            cursor += 1;
        }

        let assigned = &entries[start .. cursor];
        shards.push(build_shard(assigned, all_stories)?);
        shard_times.push(shard_time);
        if debug {
            debug_shards.push(ShardDebug {
                stories: assigned.to_vec(),
                expected_total_time: shard_time * REFERENCE_RUN_FACTOR,
            });
        }
        if shard_time > max_shard_time {
            max_shard_time = shard_time;
            max_shard_index = Some(index);
        }
        if shard_time < min_shard_time {
            min_shard_time = shard_time;
            min_shard_index = Some(index);
        }
    }

    if let Some(first) = entries.get(cursor) {
        return Err(ShardingError::PartitionResidue {
            remaining: entries.len() - cursor,
            num_shards,
            first: first.key.clone(),
        });
    }

    let extra_infos = ExtraInfos {
        num_stories: entries.len(),
        predicted_min_shard_time: min_shard_time * REFERENCE_RUN_FACTOR,
        predicted_min_shard_index: min_shard_index,
        predicted_max_shard_time: max_shard_time * REFERENCE_RUN_FACTOR,
        predicted_max_shard_index: max_shard_index,
    };
    Ok(ShardingOutcome {
        map: ShardingMap {
            shards,
            extra_infos: Some(extra_infos),
        },
        shard_times,
        debug: debug.then_some(ShardingDebugReport {
            shards: debug_shards,
        }),
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Groups a shard's stories into per-benchmark index ranges.
///
/// Benchmarks keep first-seen order; each range spans the catalog index of the
/// benchmark's first and last story in the shard.
fn build_shard(assigned: &[StoryTiming], all_stories: &StoryCatalog) -> Result<Shard, ShardingError> {
    let mut groups: Vec<(BenchmarkName, usize, usize)> = Vec::new();
    for entry in assigned {
        let position = story_position(all_stories, &entry.key)?;
        match groups.iter_mut().find(|(benchmark, _, _)| benchmark == &entry.key.benchmark) {
            Some(group) => group.2 = position,
            None => groups.push((entry.key.benchmark.clone(), position, position)),
        }
    }

    let mut benchmarks = Vec::with_capacity(groups.len());
    for (benchmark, first, last) in groups {
        let story_count = all_stories
            .stories(&benchmark)
            .map(<[String]>::len)
            .ok_or_else(|| ShardingError::UnknownBenchmark(benchmark.clone()))?;
        benchmarks.push(BenchmarkRange {
            benchmark,
            range: StoryRange::compact(first, last + 1, story_count),
        });
    }
    Ok(Shard {
        benchmarks,
    })
}

/// Looks up a story's catalog position.
fn story_position(all_stories: &StoryCatalog, key: &StoryKey) -> Result<usize, ShardingError> {
    if !all_stories.contains_benchmark(&key.benchmark) {
        return Err(ShardingError::UnknownBenchmark(key.benchmark.clone()));
    }
    all_stories.story_index(key).ok_or_else(|| ShardingError::UnknownStory(key.clone()))
}

// ============================================================================
// SECTION: Debug Report Serialization
// ============================================================================

/// Key carrying the doubled shard total in the debug report.
const EXPECTED_TOTAL_TIME_KEY: &str = "expected_total_time";

impl Serialize for ShardDebug {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.stories.len() + 1))?;
        for entry in &self.stories {
            map.serialize_entry(&entry.key.to_string(), &entry.duration)?;
        }
        map.serialize_entry(EXPECTED_TOTAL_TIME_KEY, &self.expected_total_time)?;
        map.end()
    }
}

impl Serialize for ShardingDebugReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.shards.len()))?;
        for (index, shard) in self.shards.iter().enumerate() {
            map.serialize_entry(&index.to_string(), shard)?;
        }
        map.end()
    }
}
