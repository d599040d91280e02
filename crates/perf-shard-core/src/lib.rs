// crates/perf-shard-core/src/lib.rs
// ============================================================================
// Module: Perf Shard Core Library
// Description: Public API surface for the perf sharding core.
// Purpose: Expose core types, collaborator interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Perf shard core turns historical story timing into static, balanced
//! sharding maps for benchmark CI and recombines the per-shard outputs those
//! maps produce. Dashboard upload and log hosting are reached only through
//! the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::JSON_CONTENT_TYPE;
pub use interfaces::LogPublisher;
pub use interfaces::PublishError;
pub use interfaces::UploadError;
pub use interfaces::UploadReceipt;
pub use interfaces::UploadRequest;
pub use interfaces::Uploader;
pub use runtime::CommandUploader;
pub use runtime::DashboardSettings;
pub use runtime::DirectoryLogPublisher;
pub use runtime::DryRunUploader;
pub use runtime::EventSink;
pub use runtime::JsonLineEventSink;
pub use runtime::MergeError;
pub use runtime::NoopEventSink;
pub use runtime::PipelineEvent;
pub use runtime::ProcessCollaborators;
pub use runtime::ProcessError;
pub use runtime::ProcessOutcome;
pub use runtime::ProcessRequest;
pub use runtime::ReplayError;
pub use runtime::ReplayReport;
pub use runtime::ResultLayout;
pub use runtime::ShardingDebugReport;
pub use runtime::ShardingError;
pub use runtime::ShardingOutcome;
pub use runtime::StderrEventSink;
pub use runtime::dashboard_url;
pub use runtime::generate_sharding_map;
pub use runtime::merge_benchmark_results;
pub use runtime::merge_perf_results;
pub use runtime::merge_test_status;
pub use runtime::process_perf_results;
pub use runtime::replay_sharding_map;
