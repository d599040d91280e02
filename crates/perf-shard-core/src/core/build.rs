// crates/perf-shard-core/src/core/build.rs
// ============================================================================
// Module: Build Properties
// Description: Builder metadata attached to dashboard uploads.
// Purpose: Parse CI build properties and derive machine group and revision.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Build properties arrive as a JSON object from the CI recipe. Numeric and
//! string values are both accepted for every field because recipes are not
//! consistent about `buildnumber`. The dashboard machine group comes from the
//! explicit `perf_dashboard_machine_group` property or, failing that, from a
//! configured `mastername -> group` table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Build property errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildPropertiesError {
    /// Properties JSON was malformed.
    #[error("failed to parse build properties: {0}")]
    Parse(String),
    /// A required property was absent.
    #[error("build property {0} is required")]
    Missing(&'static str),
    /// Neither an explicit machine group nor a mastername mapping was found.
    #[error("perf_dashboard_machine_group must be set or mastername must map to a machine group")]
    MissingMachineGroup,
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// CI build properties relevant to result publishing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildProperties {
    /// Builder name; default configuration name.
    #[serde(default, deserialize_with = "string_like")]
    pub buildername: Option<String>,
    /// Build number.
    #[serde(default, deserialize_with = "string_like")]
    pub buildnumber: Option<String>,
    /// Chromium commit position ref, e.g. `refs/heads/main@{#12345}`.
    #[serde(default, deserialize_with = "string_like")]
    pub got_revision_cp: Option<String>,
    /// V8 revision.
    #[serde(default, deserialize_with = "string_like")]
    pub got_v8_revision: Option<String>,
    /// WebRTC revision.
    #[serde(default, deserialize_with = "string_like")]
    pub got_webrtc_revision: Option<String>,
    /// Optional git revision.
    #[serde(default, deserialize_with = "string_like")]
    pub git_revision: Option<String>,
    /// Explicit dashboard machine group.
    #[serde(default, deserialize_with = "string_like")]
    pub perf_dashboard_machine_group: Option<String>,
    /// Legacy master name used for machine group lookup.
    #[serde(default, deserialize_with = "string_like")]
    pub mastername: Option<String>,
}

impl BuildProperties {
    /// Parses build properties from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`BuildPropertiesError::Parse`] when the JSON is malformed.
    pub fn from_json(text: &str) -> Result<Self, BuildPropertiesError> {
        serde_json::from_str(text).map_err(|err| BuildPropertiesError::Parse(err.to_string()))
    }

    /// Resolves the dashboard machine group.
    ///
    /// # Errors
    ///
    /// Returns [`BuildPropertiesError::MissingMachineGroup`] when unresolved.
    pub fn machine_group(
        &self,
        mapping: &BTreeMap<String, String>,
    ) -> Result<String, BuildPropertiesError> {
        if let Some(group) = non_empty(self.perf_dashboard_machine_group.as_deref()) {
            return Ok(group.to_string());
        }
        self.mastername
            .as_deref()
            .and_then(|master| mapping.get(master))
            .and_then(|group| non_empty(Some(group.as_str())))
            .map(str::to_string)
            .ok_or(BuildPropertiesError::MissingMachineGroup)
    }

    /// Returns the commit position number embedded in `got_revision_cp`.
    ///
    /// Values without an `@{#N}` marker are returned unchanged.
    #[must_use]
    pub fn commit_position(&self) -> Option<String> {
        let value = self.got_revision_cp.as_deref()?;
        let Some((_, tail)) = value.rsplit_once("@{#") else {
            return Some(value.to_string());
        };
        Some(tail.trim_end_matches('}').to_string())
    }

    /// Returns a required property or a [`BuildPropertiesError::Missing`] error.
    ///
    /// # Errors
    ///
    /// Returns [`BuildPropertiesError::Missing`] when the value is absent.
    pub fn require<'a>(
        value: Option<&'a String>,
        name: &'static str,
    ) -> Result<&'a str, BuildPropertiesError> {
        value.map(String::as_str).ok_or(BuildPropertiesError::Missing(name))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the value when present and not blank.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Accepts strings, numbers, and booleans as string properties.
fn string_like<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => {
            Err(serde::de::Error::custom(format!("expected a scalar build property, got {other}")))
        }
    }
}
