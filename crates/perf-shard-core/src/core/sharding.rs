// crates/perf-shard-core/src/core/sharding.rs
// ============================================================================
// Module: Sharding Map Model
// Description: Persisted shard-to-benchmark-range assignment.
// Purpose: Define the sharding map artifact and its ordered JSON form.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A sharding map assigns each shard an ordered set of benchmark story ranges
//! and carries `extra_infos` with predicted shard times. On disk it is a JSON
//! object keyed by shard index strings (`"0"`, `"1"`, ...) plus an
//! `extra_infos` entry:
//!
//! ```json
//! {
//!     "0": {"benchmarks": {"benchmarkA": {"end": 12}, "benchmarkB": {}}},
//!     "1": {"benchmarks": {"benchmarkA": {"begin": 12}}},
//!     "extra_infos": {"num_stories": 40, "predicted_min_shard_time": 10.0, ...}
//! }
//! ```
//!
//! Serialization keeps shards in numeric order and benchmarks in assignment
//! order; deserialization preserves document order for benchmarks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::MapAccess;
use serde::de::Visitor;
use serde::ser::SerializeMap;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::core::identifiers::BenchmarkName;
use crate::core::json::to_pretty_string;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key carrying prediction metadata in the persisted map.
pub const EXTRA_INFOS_KEY: &str = "extra_infos";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Sharding map persistence errors.
#[derive(Debug, Error)]
pub enum ShardingMapError {
    /// Map file could not be read or written.
    #[error("sharding map io error at {path}: {error}")]
    Io {
        /// Map path.
        path: String,
        /// Underlying error message.
        error: String,
    },
    /// Map JSON was malformed.
    #[error("failed to parse sharding map: {0}")]
    Parse(String),
    /// Map could not be serialized.
    #[error("failed to serialize sharding map: {0}")]
    Serialize(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Half-open story index range; absent bounds mean start/end of the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRange {
    /// First story index, omitted when zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<usize>,
    /// One past the last story index, omitted when it equals the story count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl StoryRange {
    /// Builds a compact range for `[begin, end)` over `story_count` stories.
    #[must_use]
    pub const fn compact(begin: usize, end: usize, story_count: usize) -> Self {
        Self {
            begin: if begin == 0 { None } else { Some(begin) },
            end: if end == story_count { None } else { Some(end) },
        }
    }

    /// Resolves the range into concrete `(begin, end)` bounds.
    #[must_use]
    pub fn bounds(&self, story_count: usize) -> (usize, usize) {
        (self.begin.unwrap_or(0), self.end.unwrap_or(story_count))
    }
}

/// One benchmark's range within a shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRange {
    /// Benchmark name.
    pub benchmark: BenchmarkName,
    /// Assigned story range.
    pub range: StoryRange,
}

/// Benchmarks assigned to one shard, in assignment order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shard {
    /// Benchmark ranges.
    pub benchmarks: Vec<BenchmarkRange>,
}

impl Shard {
    /// Returns the range assigned to a benchmark, if any.
    #[must_use]
    pub fn range_for(&self, benchmark: &BenchmarkName) -> Option<StoryRange> {
        self.benchmarks.iter().find(|entry| &entry.benchmark == benchmark).map(|entry| entry.range)
    }
}

/// Prediction metadata stored alongside the shards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraInfos {
    /// Number of stories partitioned.
    pub num_stories: usize,
    /// Smallest shard time, doubled for the reference build.
    pub predicted_min_shard_time: f64,
    /// Index of the smallest shard.
    pub predicted_min_shard_index: Option<usize>,
    /// Largest shard time, doubled for the reference build.
    pub predicted_max_shard_time: f64,
    /// Index of the largest shard; null when every shard is empty.
    pub predicted_max_shard_index: Option<usize>,
}

/// Sharding map artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingMap {
    /// Shards in index order.
    pub shards: Vec<Shard>,
    /// Prediction metadata.
    pub extra_infos: Option<ExtraInfos>,
}

impl ShardingMap {
    /// Parses a sharding map from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ShardingMapError::Parse`] when the JSON is malformed.
    pub fn from_json(text: &str) -> Result<Self, ShardingMapError> {
        serde_json::from_str(text).map_err(|err| ShardingMapError::Parse(err.to_string()))
    }

    /// Renders the map as 4-space indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ShardingMapError::Serialize`] when serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, ShardingMapError> {
        to_pretty_string(self).map_err(|err| ShardingMapError::Serialize(err.to_string()))
    }

    /// Loads a sharding map from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ShardingMapError`] when reading or parsing fails.
    pub fn load(path: &Path) -> Result<Self, ShardingMapError> {
        let text = fs::read_to_string(path).map_err(|err| ShardingMapError::Io {
            path: path.display().to_string(),
            error: err.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Writes the sharding map to disk.
    ///
    /// # Errors
    ///
    /// Returns [`ShardingMapError`] when serialization or writing fails.
    pub fn write(&self, path: &Path) -> Result<(), ShardingMapError> {
        let text = self.to_json_pretty()?;
        fs::write(path, text).map_err(|err| ShardingMapError::Io {
            path: path.display().to_string(),
            error: err.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Serialization
// ============================================================================

/// Borrowed benchmark list serialized as an ordered JSON object.
struct BenchmarksRef<'a>(&'a [BenchmarkRange]);

impl Serialize for BenchmarksRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(entry.benchmark.as_str(), &entry.range)?;
        }
        map.end()
    }
}

impl Serialize for Shard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Shard", 1)?;
        state.serialize_field("benchmarks", &BenchmarksRef(&self.benchmarks))?;
        state.end()
    }
}

impl Serialize for ShardingMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.shards.len() + usize::from(self.extra_infos.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (index, shard) in self.shards.iter().enumerate() {
            map.serialize_entry(&index.to_string(), shard)?;
        }
        if let Some(extra_infos) = &self.extra_infos {
            map.serialize_entry(EXTRA_INFOS_KEY, extra_infos)?;
        }
        map.end()
    }
}

// ============================================================================
// SECTION: Deserialization
// ============================================================================

/// Benchmark ranges read from an ordered JSON object.
struct OrderedBenchmarks(Vec<BenchmarkRange>);

impl<'de> Deserialize<'de> for OrderedBenchmarks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        /// Visitor collecting benchmark entries in document order.
        struct BenchmarksVisitor;

        impl<'de> Visitor<'de> for BenchmarksVisitor {
            type Value = OrderedBenchmarks;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of benchmark names to story ranges")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut benchmarks = Vec::new();
                while let Some((name, range)) = access.next_entry::<String, StoryRange>()? {
                    benchmarks.push(BenchmarkRange {
                        benchmark: BenchmarkName::new(name),
                        range,
                    });
                }
                Ok(OrderedBenchmarks(benchmarks))
            }
        }

        deserializer.deserialize_map(BenchmarksVisitor)
    }
}

/// On-disk shard shape.
#[derive(Deserialize)]
struct ShardRepr {
    /// Benchmark ranges.
    #[serde(default)]
    benchmarks: Option<OrderedBenchmarks>,
}

impl<'de> Deserialize<'de> for Shard {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = ShardRepr::deserialize(deserializer)?;
        Ok(Self {
            benchmarks: repr.benchmarks.map(|benchmarks| benchmarks.0).unwrap_or_default(),
        })
    }
}

impl<'de> Deserialize<'de> for ShardingMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        /// Visitor splitting shard entries from `extra_infos`.
        struct ShardingMapVisitor;

        impl<'de> Visitor<'de> for ShardingMapVisitor {
            type Value = ShardingMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a sharding map keyed by shard index")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut shards: Vec<(usize, Shard)> = Vec::new();
                let mut extra_infos = None;
                while let Some(key) = access.next_key::<String>()? {
                    if key == EXTRA_INFOS_KEY {
                        extra_infos = Some(access.next_value::<ExtraInfos>()?);
                        continue;
                    }
                    let index = key.parse::<usize>().map_err(|_| {
                        serde::de::Error::custom(format!("invalid shard index key: {key}"))
                    })?;
                    shards.push((index, access.next_value::<Shard>()?));
                }
                shards.sort_by_key(|(index, _)| *index);
                for (expected, (index, _)) in shards.iter().enumerate() {
                    if *index != expected {
                        return Err(serde::de::Error::custom(format!(
                            "shard indices must be contiguous from 0 (missing {expected})"
                        )));
                    }
                }
                Ok(ShardingMap {
                    shards: shards.into_iter().map(|(_, shard)| shard).collect(),
                    extra_infos,
                })
            }
        }

        deserializer.deserialize_map(ShardingMapVisitor)
    }
}
