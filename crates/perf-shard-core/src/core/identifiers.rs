// crates/perf-shard-core/src/core/identifiers.rs
// ============================================================================
// Module: Perf Shard Identifiers
// Description: Benchmark names and story keys used across sharding and merging.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Benchmarks are identified by name; stories are identified by the pair
//! `(benchmark, story)` whose canonical string form is `"<benchmark>/<story>"`.
//! Parsing splits on the first `/` only, so story names may contain slashes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Benchmark name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkName(String);

impl BenchmarkName {
    /// Creates a new benchmark name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BenchmarkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BenchmarkName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BenchmarkName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Story identifier scoped to its benchmark.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoryKey {
    /// Owning benchmark.
    pub benchmark: BenchmarkName,
    /// Story name within the benchmark.
    pub story: String,
}

impl StoryKey {
    /// Creates a story key from its parts.
    #[must_use]
    pub fn new(benchmark: impl Into<BenchmarkName>, story: impl Into<String>) -> Self {
        Self {
            benchmark: benchmark.into(),
            story: story.into(),
        }
    }

    /// Parses `"<benchmark>/<story>"`, splitting on the first `/`.
    ///
    /// Returns `None` when the value has no separator.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (benchmark, story) = value.split_once('/')?;
        Some(Self::new(benchmark, story))
    }
}

impl fmt::Display for StoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.benchmark, self.story)
    }
}
