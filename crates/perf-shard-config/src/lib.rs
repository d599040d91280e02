// crates/perf-shard-config/src/lib.rs
// ============================================================================
// Module: Perf Shard Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for perf-shard.toml semantics.
// Dependencies: perf-shard-core, serde, toml
// ============================================================================

//! ## Overview
//! `perf-shard-config` defines the configuration model for the perf-shard
//! CLI: default shard counts, task output naming, dashboard upload settings,
//! and the log publishing directory. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
