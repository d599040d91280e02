// crates/perf-shard-core/src/interfaces/mod.rs
// ============================================================================
// Module: Perf Shard Interfaces
// Description: Seams for dashboard upload and log publishing collaborators.
// Purpose: Keep the result pipeline independent of network services.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The result pipeline hands merged results to an [`Uploader`] and raw text
//! (benchmark logs, link indexes, upload output) to a [`LogPublisher`]. Both
//! are external services in production; the runtime ships local
//! implementations for subprocess upload and directory-backed logs.
//!
//! Failures at these seams never abort a run: the pipeline records them and
//! moves on to the next benchmark.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use thiserror::Error;

use crate::core::BenchmarkName;
use crate::core::BuildProperties;
use crate::core::ResultShape;

// ============================================================================
// SECTION: Uploader
// ============================================================================

/// Inputs for one benchmark upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    /// Benchmark whose results are uploaded.
    pub benchmark: &'a BenchmarkName,
    /// Results file to upload (merged when the benchmark was split).
    pub results_file: &'a Path,
    /// Shape of the results file.
    pub shape: ResultShape,
    /// Bot configuration name.
    pub configuration_name: &'a str,
    /// CI build properties.
    pub build: &'a BuildProperties,
    /// Dashboard machine group.
    pub machine_group: &'a str,
    /// Dashboard base URL.
    pub results_url: &'a str,
    /// Scratch directory owned by the current run.
    pub scratch_dir: &'a Path,
}

/// Successful upload receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Uploader output forwarded to the log publisher.
    pub output: String,
}

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Uploader could not be started.
    #[error("failed to launch uploader: {0}")]
    Launch(String),
    /// Uploader ran and reported failure.
    #[error("upload rejected: {reason}")]
    Rejected {
        /// Failure description.
        reason: String,
        /// Uploader output captured before failing.
        output: String,
    },
    /// Request was missing required metadata.
    #[error("upload request invalid: {0}")]
    InvalidRequest(String),
}

impl UploadError {
    /// Returns any uploader output captured with the failure.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Rejected {
                output,
                ..
            } => Some(output),
            Self::Launch(_) | Self::InvalidRequest(_) => None,
        }
    }
}

/// Dashboard uploader.
pub trait Uploader {
    /// Uploads one benchmark's results.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError`] when the upload cannot be performed or is rejected.
    fn upload(&self, request: &UploadRequest<'_>) -> Result<UploadReceipt, UploadError>;
}

// ============================================================================
// SECTION: Log Publisher
// ============================================================================

/// Content type for JSON log streams.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Log publishing errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Stream could not be written.
    #[error("failed to publish log stream {name}: {error}")]
    Write {
        /// Stream name.
        name: String,
        /// Underlying error message.
        error: String,
    },
}

/// Text stream publisher returning a viewer link.
pub trait LogPublisher {
    /// Publishes a text stream and returns its link.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the stream cannot be stored.
    fn publish(
        &self,
        name: &str,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<String, PublishError>;
}
