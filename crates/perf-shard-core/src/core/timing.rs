// crates/perf-shard-core/src/core/timing.rs
// ============================================================================
// Module: Story Timing Data
// Description: Ordered per-story accumulated durations.
// Purpose: Feed the partitioner and replay with canonical-order timing data.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Timing data is an ordered sequence of `(story, duration)` pairs. It is
//! seeded from a [`StoryCatalog`] with every story at zero, in canonical
//! order, and then accumulates durations from historical run records. Order is
//! significant: the partitioner consumes stories strictly front to back.
//!
//! Historical records look like
//! `[{"name": "<benchmark>/<story>", "duration": "98.039"}, ...]`. Names not
//! present in the data set are ignored; empty or null durations add nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::catalog::StoryCatalog;
use crate::core::identifiers::StoryKey;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timing data loading errors.
#[derive(Debug, Error)]
pub enum TimingError {
    /// Timing file could not be read.
    #[error("failed to read timing data {path}: {error}")]
    Io {
        /// Timing file path.
        path: String,
        /// Underlying error message.
        error: String,
    },
    /// Timing JSON was malformed.
    #[error("failed to parse timing data: {0}")]
    Parse(String),
    /// A record carried a duration that is not a finite number.
    #[error("invalid duration for {name}: {value}")]
    InvalidDuration {
        /// Record name.
        name: String,
        /// Offending duration value.
        value: String,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Accumulated duration for one story.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryTiming {
    /// Story identifier.
    pub key: StoryKey,
    /// Accumulated duration.
    pub duration: f64,
}

/// Historical run record as stored on disk.
#[derive(Debug, Deserialize)]
struct TimingRecord {
    /// Story name in `"<benchmark>/<story>"` form.
    name: String,
    /// Duration as a number, numeric string, empty string, or null.
    #[serde(default)]
    duration: Value,
}

/// Ordered story timing data.
#[derive(Debug, Clone, Default)]
pub struct TimingData {
    /// Entries in canonical order.
    entries: Vec<StoryTiming>,
    /// Story key to entry position.
    index: HashMap<StoryKey, usize>,
}

impl TimingData {
    /// Seeds timing data with every catalog story at zero, in catalog order.
    #[must_use]
    pub fn for_catalog(catalog: &StoryCatalog) -> Self {
        Self::from_entries(catalog.story_keys().map(|key| (key, 0.0)))
    }

    /// Builds timing data from ordered entries; repeated keys are summed.
    pub fn from_entries(entries: impl IntoIterator<Item = (StoryKey, f64)>) -> Self {
        let mut data = Self::default();
        for (key, duration) in entries {
            data.add(key, duration);
        }
        data
    }

    /// Loads timing data for a catalog from one or more historical files.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError`] when any file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(catalog: &StoryCatalog, paths: &[P]) -> Result<Self, TimingError> {
        let mut data = Self::for_catalog(catalog);
        for path in paths {
            data.accumulate_file(path.as_ref())?;
        }
        Ok(data)
    }

    /// Accumulates durations from a historical timing file.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError`] when the file cannot be read or parsed.
    pub fn accumulate_file(&mut self, path: &Path) -> Result<usize, TimingError> {
        let text = fs::read_to_string(path).map_err(|err| TimingError::Io {
            path: path.display().to_string(),
            error: err.to_string(),
        })?;
        self.accumulate_json(&text)
    }

    /// Accumulates durations from historical timing JSON and returns the
    /// number of matched records.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError`] when the JSON is malformed or a duration is invalid.
    pub fn accumulate_json(&mut self, text: &str) -> Result<usize, TimingError> {
        let records: Vec<TimingRecord> =
            serde_json::from_str(text).map_err(|err| TimingError::Parse(err.to_string()))?;
        let mut matched = 0;
        for record in records {
            let Some(key) = StoryKey::parse(&record.name) else {
                continue;
            };
            let Some(position) = self.index.get(&key).copied() else {
                continue;
            };
            let duration = parse_duration(&record.name, &record.duration)?;
            self.entries[position].duration += duration;
            matched += 1;
        }
        Ok(matched)
    }

    /// Returns the entries in canonical order.
    #[must_use]
    pub fn entries(&self) -> &[StoryTiming] {
        &self.entries
    }

    /// Returns the duration recorded for a story.
    #[must_use]
    pub fn get(&self, key: &StoryKey) -> Option<f64> {
        self.index.get(key).map(|position| self.entries[*position].duration)
    }

    /// Returns the number of stories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no stories are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the sum of all durations.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|entry| entry.duration).sum()
    }

    /// Adds a duration to a story, appending it when new.
    fn add(&mut self, key: StoryKey, duration: f64) {
        if let Some(position) = self.index.get(&key) {
            self.entries[*position].duration += duration;
            return;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(StoryTiming {
            key,
            duration,
        });
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Interprets a record duration; empty and null values contribute zero.
fn parse_duration(name: &str, value: &Value) -> Result<f64, TimingError> {
    let invalid = || TimingError::InvalidDuration {
        name: name.to_string(),
        value: value.to_string(),
    };
    let duration = match value {
        Value::Null => return Ok(0.0),
        Value::Number(number) => number.as_f64().ok_or_else(invalid)?,
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed.parse::<f64>().map_err(|_| invalid())?
        }
        _ => return Err(invalid()),
    };
    if duration.is_finite() { Ok(duration) } else { Err(invalid()) }
}
