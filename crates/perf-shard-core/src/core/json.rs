// crates/perf-shard-core/src/core/json.rs
// ============================================================================
// Module: JSON Rendering
// Description: Shared pretty-printing for persisted artifacts.
// Purpose: Keep every written artifact in one indentation style.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Persisted artifacts (sharding maps, debug reports, replay reports) are
//! written with 4-space indentation so regenerated files diff cleanly against
//! checked-in copies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a value as 4-space indented JSON.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when serialization fails.
pub fn to_pretty_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only emits UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
