// crates/perf-shard-core/src/runtime/upload.rs
// ============================================================================
// Module: Dashboard Upload
// Description: Subprocess and dry-run uploaders plus dashboard link building.
// Purpose: Hand merged results to the dashboard upload tool.
// Dependencies: crate::{core, interfaces}, url
// ============================================================================

//! ## Overview
//! [`CommandUploader`] runs an external upload program with the dashboard
//! argument list; a non-zero exit status is an upload failure.
//! [`DryRunUploader`] records requests without side effects and is used for
//! smoke tests and local runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

use url::Url;

use crate::core::BenchmarkName;
use crate::core::BuildProperties;
use crate::core::ResultShape;
use crate::interfaces::UploadError;
use crate::interfaces::UploadReceipt;
use crate::interfaces::UploadRequest;
use crate::interfaces::Uploader;

// ============================================================================
// SECTION: Dashboard Links
// ============================================================================

/// Builds the dashboard report URL for a benchmark.
///
/// The reference marker is removed from the benchmark name so reference and
/// measured runs share one report.
///
/// # Errors
///
/// Returns [`url::ParseError`] when `results_url` is not a valid URL.
pub fn dashboard_url(
    results_url: &str,
    machine_group: &str,
    configuration_name: &str,
    benchmark: &BenchmarkName,
    reference_marker: &str,
    build: &BuildProperties,
) -> Result<String, url::ParseError> {
    let base = format!("{}/report", results_url.trim_end_matches('/'));
    let tests = strip_marker(benchmark.as_str(), reference_marker);
    let revision = build.commit_position().unwrap_or_default();
    let url = Url::parse_with_params(
        &base,
        &[
            ("masters", machine_group),
            ("bots", configuration_name),
            ("tests", tests.as_str()),
            ("rev", revision.as_str()),
        ],
    )?;
    Ok(url.into())
}

/// Removes every occurrence of `marker` from `name`.
#[must_use]
pub fn strip_marker(name: &str, marker: &str) -> String {
    if marker.is_empty() { name.to_string() } else { name.replace(marker, "") }
}

// ============================================================================
// SECTION: Command Uploader
// ============================================================================

/// Uploader that shells out to a dashboard upload program.
#[derive(Debug, Clone)]
pub struct CommandUploader {
    /// Program and leading arguments.
    command: Vec<String>,
}

impl CommandUploader {
    /// Creates an uploader for a program and its leading arguments.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidRequest`] when the command is empty.
    pub fn new(command: Vec<String>) -> Result<Self, UploadError> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(UploadError::InvalidRequest("upload command must not be empty".to_string()));
        }
        Ok(Self {
            command,
        })
    }

    /// Builds the dashboard argument list for a request.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidRequest`] when required build properties are missing.
    pub fn arguments(
        request: &UploadRequest<'_>,
        output_json_file: &std::path::Path,
    ) -> Result<Vec<String>, UploadError> {
        let build = request.build;
        let required = |value: Option<&String>, name: &'static str| {
            BuildProperties::require(value, name)
                .map(str::to_string)
                .map_err(|err| UploadError::InvalidRequest(err.to_string()))
        };
        let mut args = vec![
            "--tmp-dir".to_string(),
            request.scratch_dir.display().to_string(),
            "--buildername".to_string(),
            required(build.buildername.as_ref(), "buildername")?,
            "--buildnumber".to_string(),
            required(build.buildnumber.as_ref(), "buildnumber")?,
            "--name".to_string(),
            request.benchmark.to_string(),
            "--configuration-name".to_string(),
            request.configuration_name.to_string(),
            "--results-file".to_string(),
            request.results_file.display().to_string(),
            "--results-url".to_string(),
            request.results_url.to_string(),
            "--got-revision-cp".to_string(),
            required(build.got_revision_cp.as_ref(), "got_revision_cp")?,
            "--got-v8-revision".to_string(),
            required(build.got_v8_revision.as_ref(), "got_v8_revision")?,
            "--got-webrtc-revision".to_string(),
            required(build.got_webrtc_revision.as_ref(), "got_webrtc_revision")?,
            "--output-json-file".to_string(),
            output_json_file.display().to_string(),
            "--perf-dashboard-machine-group".to_string(),
            request.machine_group.to_string(),
        ];
        if let Some(revision) = &build.git_revision {
            args.push("--git-revision".to_string());
            args.push(revision.clone());
        }
        if request.shape == ResultShape::Histograms {
            args.push("--send-as-histograms".to_string());
        }
        Ok(args)
    }
}

impl Uploader for CommandUploader {
    fn upload(&self, request: &UploadRequest<'_>) -> Result<UploadReceipt, UploadError> {
        let output_json_file =
            request.scratch_dir.join(format!("{}_upload_output.json", request.benchmark));
        let args = Self::arguments(request, &output_json_file)?;
        let (program, leading) = self
            .command
            .split_first()
            .ok_or_else(|| UploadError::InvalidRequest("upload command is empty".to_string()))?;
        let result = Command::new(program)
            .args(leading)
            .args(&args)
            .output()
            .map_err(|err| UploadError::Launch(format!("{program}: {err}")))?;
        let output = fs::read_to_string(&output_json_file)
            .unwrap_or_else(|_| String::from_utf8_lossy(&result.stdout).into_owned());
        if result.status.success() {
            return Ok(UploadReceipt {
                output,
            });
        }
        let stderr = String::from_utf8_lossy(&result.stderr);
        Err(UploadError::Rejected {
            reason: format!("{program} exited with {}: {}", result.status, stderr.trim()),
            output,
        })
    }
}

// ============================================================================
// SECTION: Dry-Run Uploader
// ============================================================================

/// Upload recorded by [`DryRunUploader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Benchmark name.
    pub benchmark: BenchmarkName,
    /// Results file handed to the uploader.
    pub results_file: PathBuf,
    /// Result shape.
    pub shape: ResultShape,
    /// Results file contents at upload time.
    pub contents: String,
}

/// Uploader that records requests and always succeeds.
#[derive(Debug, Default)]
pub struct DryRunUploader {
    /// Recorded uploads in request order.
    uploads: Mutex<Vec<RecordedUpload>>,
}

impl DryRunUploader {
    /// Creates an empty dry-run uploader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the uploads recorded so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().map(|uploads| uploads.clone()).unwrap_or_default()
    }
}

impl Uploader for DryRunUploader {
    fn upload(&self, request: &UploadRequest<'_>) -> Result<UploadReceipt, UploadError> {
        // Read now: merged files live in a scratch directory removed after the run.
        let contents = fs::read_to_string(request.results_file).map_err(|err| {
            UploadError::InvalidRequest(format!("{}: {err}", request.results_file.display()))
        })?;
        let record = RecordedUpload {
            benchmark: request.benchmark.clone(),
            results_file: request.results_file.to_path_buf(),
            shape: request.shape,
            contents,
        };
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(record);
        }
        Ok(UploadReceipt {
            output: format!("dry run: {} not uploaded", request.benchmark),
        })
    }
}
