// crates/perf-shard-core/src/core/mod.rs
// ============================================================================
// Module: Perf Shard Core Types
// Description: Canonical data model for sharding maps and benchmark results.
// Purpose: Provide stable, serializable types shared by runtime and CLI.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types define story identifiers, the canonical story catalog, timing
//! data, the persisted sharding map, result-document shapes, and CI build
//! properties. These types are the single source of truth for every file
//! format the CLI reads or writes.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod build;
pub mod catalog;
pub mod identifiers;
pub mod json;
pub mod results;
pub mod sharding;
pub mod timing;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use build::BuildProperties;
pub use build::BuildPropertiesError;
pub use catalog::BenchmarkStories;
pub use catalog::CatalogError;
pub use catalog::StoryCatalog;
pub use identifiers::BenchmarkName;
pub use identifiers::StoryKey;
pub use results::CHARTS_KEY;
pub use results::PerfResult;
pub use results::ResultShape;
pub use sharding::BenchmarkRange;
pub use sharding::EXTRA_INFOS_KEY;
pub use sharding::ExtraInfos;
pub use sharding::Shard;
pub use sharding::ShardingMap;
pub use sharding::ShardingMapError;
pub use sharding::StoryRange;
pub use timing::StoryTiming;
pub use timing::TimingData;
pub use timing::TimingError;
