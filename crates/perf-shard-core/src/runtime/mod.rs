// crates/perf-shard-core/src/runtime/mod.rs
// ============================================================================
// Module: Perf Shard Runtime
// Description: Partitioner, replay, result merging, and the processing pipeline.
// Purpose: Implement sharding map generation and post-run result aggregation.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement sharding map generation and replay, merging of
//! per-shard result documents, and the post-run processing pipeline together
//! with local collaborator implementations. Every entry point is synchronous
//! and deterministic for a given input tree.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod events;
pub mod logs;
pub mod merge;
pub mod partition;
pub mod process;
pub mod replay;
pub mod upload;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::EventSink;
pub use events::JsonLineEventSink;
pub use events::NoopEventSink;
pub use events::PipelineEvent;
pub use events::StderrEventSink;
pub use events::StepTimer;
pub use logs::DirectoryLogPublisher;
pub use merge::LINKS_KEY;
pub use merge::MergeError;
pub use merge::merge_benchmark_results;
pub use merge::merge_perf_results;
pub use merge::merge_test_status;
pub use partition::REFERENCE_RUN_FACTOR;
pub use partition::ShardDebug;
pub use partition::ShardingDebugReport;
pub use partition::ShardingError;
pub use partition::ShardingOutcome;
pub use partition::generate_sharding_map;
pub use process::DashboardSettings;
pub use process::ProcessCollaborators;
pub use process::ProcessError;
pub use process::ProcessOutcome;
pub use process::ProcessRequest;
pub use process::ResultLayout;
pub use process::TaskOutput;
pub use process::process_perf_results;
pub use process::scan_task_output;
pub use replay::ReplayError;
pub use replay::ReplayReport;
pub use replay::ReplayShard;
pub use replay::replay_sharding_map;
pub use upload::CommandUploader;
pub use upload::DryRunUploader;
pub use upload::RecordedUpload;
pub use upload::dashboard_url;
