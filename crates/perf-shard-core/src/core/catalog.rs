// crates/perf-shard-core/src/core/catalog.rs
// ============================================================================
// Module: Story Catalog
// Description: Canonical benchmark and story ordering.
// Purpose: Provide the declared story order that sharding ranges index into.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The catalog lists every benchmark with its stories in declared order. Story
//! ranges in a sharding map are half-open index intervals into these lists, so
//! the catalog must be identical between map generation and map replay.
//!
//! ## Invariants
//! - Benchmark names are unique.
//! - Story names within a benchmark are unique; repeats keep the first slot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::BenchmarkName;
use crate::core::identifiers::StoryKey;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Story catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("failed to read story catalog {path}: {error}")]
    Io {
        /// Catalog path.
        path: String,
        /// Underlying error message.
        error: String,
    },
    /// Catalog JSON was malformed.
    #[error("failed to parse story catalog: {0}")]
    Parse(String),
    /// Benchmark listed more than once.
    #[error("benchmark {0} is listed more than once")]
    DuplicateBenchmark(BenchmarkName),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Catalog entry as it appears on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkStories {
    /// Benchmark name.
    pub name: BenchmarkName,
    /// Stories in declared order.
    pub stories: Vec<String>,
}

/// Ordered benchmark-to-stories catalog.
#[derive(Debug, Clone, Default)]
pub struct StoryCatalog {
    /// Entries in declared benchmark order.
    entries: Vec<BenchmarkStories>,
    /// Benchmark lookup: entry position and story positions.
    index: HashMap<BenchmarkName, (usize, HashMap<String, usize>)>,
}

impl StoryCatalog {
    /// Builds a catalog from entries, de-duplicating story names.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateBenchmark`] when a benchmark repeats.
    pub fn from_entries(
        entries: impl IntoIterator<Item = BenchmarkStories>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for entry in entries {
            if catalog.index.contains_key(&entry.name) {
                return Err(CatalogError::DuplicateBenchmark(entry.name));
            }
            let mut positions = HashMap::new();
            let mut stories = Vec::with_capacity(entry.stories.len());
            for story in entry.stories {
                if positions.contains_key(&story) {
                    continue;
                }
                positions.insert(story.clone(), stories.len());
                stories.push(story);
            }
            catalog.index.insert(entry.name.clone(), (catalog.entries.len(), positions));
            catalog.entries.push(BenchmarkStories {
                name: entry.name,
                stories,
            });
        }
        Ok(catalog)
    }

    /// Parses a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when parsing fails or benchmarks repeat.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let entries: Vec<BenchmarkStories> =
            serde_json::from_str(text).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::from_entries(entries)
    }

    /// Loads a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when reading or parsing fails.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|err| CatalogError::Io {
            path: path.display().to_string(),
            error: err.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Returns the catalog entries in declared order.
    #[must_use]
    pub fn entries(&self) -> &[BenchmarkStories] {
        &self.entries
    }

    /// Returns the stories for a benchmark.
    #[must_use]
    pub fn stories(&self, benchmark: &BenchmarkName) -> Option<&[String]> {
        self.index.get(benchmark).map(|(position, _)| self.entries[*position].stories.as_slice())
    }

    /// Returns the position of a story within its benchmark.
    #[must_use]
    pub fn story_index(&self, key: &StoryKey) -> Option<usize> {
        self.index.get(&key.benchmark).and_then(|(_, positions)| positions.get(&key.story)).copied()
    }

    /// Returns true when the benchmark is listed.
    #[must_use]
    pub fn contains_benchmark(&self, benchmark: &BenchmarkName) -> bool {
        self.index.contains_key(benchmark)
    }

    /// Iterates every story key in canonical order.
    pub fn story_keys(&self) -> impl Iterator<Item = StoryKey> + '_ {
        self.entries.iter().flat_map(|entry| {
            entry.stories.iter().map(|story| StoryKey::new(entry.name.clone(), story.clone()))
        })
    }

    /// Returns the total number of stories across all benchmarks.
    #[must_use]
    pub fn story_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.stories.len()).sum()
    }
}
