// crates/perf-shard-core/src/runtime/process.rs
// ============================================================================
// Module: Result Processing Pipeline
// Description: Post-run aggregation of sharded benchmark outputs.
// Purpose: Publish logs, merge and upload results, and write the test status.
// Dependencies: crate::{core, interfaces}, serde_json, tempfile, thiserror
// ============================================================================

//! ## Overview
//! The task output root holds one directory per shard; each shard directory
//! holds one directory per benchmark it ran plus, optionally, the sharding map
//! it ran under. Processing runs in a fixed order:
//! 1. publish the sharding map and every benchmark log,
//! 2. read each `test_results.json` and decide which benchmarks are enabled,
//! 3. unless in smoke-test mode, merge and upload every enabled benchmark,
//! 4. write the merged test status with the collected links.
//!
//! Collaborator failures (publish, merge, upload) and unreadable test results
//! are recorded as events and never abort the run. Upload failures make the run's exit code non-zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use tempfile::TempDir;
use thiserror::Error;
use url::Url;

use crate::core::BenchmarkName;
use crate::core::BuildProperties;
use crate::core::BuildPropertiesError;
use crate::core::ResultShape;
use crate::core::json::to_pretty_string;
use crate::interfaces::JSON_CONTENT_TYPE;
use crate::interfaces::LogPublisher;
use crate::interfaces::UploadRequest;
use crate::interfaces::Uploader;
use crate::runtime::events::EVENT_BENCHMARK_DISABLED;
use crate::runtime::events::EVENT_LOG_MISSING;
use crate::runtime::events::EVENT_MERGE_FAILED;
use crate::runtime::events::EVENT_PUBLISH_FAILED;
use crate::runtime::events::EVENT_RESULTS_INVALID;
use crate::runtime::events::EVENT_RESULTS_MISSING;
use crate::runtime::events::EVENT_UPLOAD_FAILED;
use crate::runtime::events::EVENT_UPLOAD_STARTED;
use crate::runtime::events::EventSink;
use crate::runtime::events::PipelineEvent;
use crate::runtime::events::StepTimer;
use crate::runtime::merge::MergeError;
use crate::runtime::merge::load_perf_result;
use crate::runtime::merge::merge_benchmark_results;
use crate::runtime::merge::merge_test_status;
use crate::runtime::upload::dashboard_url;
use crate::runtime::upload::strip_marker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default performance dashboard base URL.
pub const DEFAULT_RESULTS_URL: &str = "https://chromeperf.appspot.com";
/// Link label for the published sharding map.
pub const SHARD_MAP_LINK: &str = "Benchmarks shard map";
/// Link label for the benchmark log index.
pub const LOGS_LINK: &str = "Benchmarks logs";
/// Link label for the dashboard link index.
pub const RESULTS_DASHBOARD_LINK: &str = "Results Dashboard";
/// Suffix appended to [`RESULTS_DASHBOARD_LINK`] when any upload failed.
pub const UPLOAD_FAILURE_SUFFIX: &str = " Upload Failure";
/// Dashboard link value recorded for a failed upload.
pub const UPLOAD_FAILED: &str = "upload failed";
/// Prefix of the per-run scratch directory.
pub const SCRATCH_DIR_PREFIX: &str = "resultscache";
/// Test-results schema version whose empty `tests` map means "disabled".
const DISABLED_AWARE_VERSION: u64 = 3;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Run-fatal processing errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A directory or file could not be read.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error message.
        error: String,
    },
    /// Build properties were incomplete.
    #[error(transparent)]
    Build(#[from] BuildPropertiesError),
    /// The scratch directory could not be created.
    #[error("failed to create scratch directory: {0}")]
    ScratchDir(String),
    /// The dashboard base URL was not a valid URL.
    #[error("invalid dashboard results url: {0}")]
    ResultsUrl(String),
    /// Test status documents could not be merged.
    #[error(transparent)]
    TestStatus(#[from] MergeError),
    /// The output file could not be written.
    #[error("failed to write {path}: {error}")]
    Write {
        /// File path.
        path: String,
        /// Underlying error message.
        error: String,
    },
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// File and directory naming conventions of the task output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLayout {
    /// Suffix stripped from directory names to obtain benchmark names.
    pub benchmark_dir_suffix: String,
    /// Marker identifying reference-build benchmarks.
    pub reference_marker: String,
    /// File name suffix identifying the sharding map.
    pub shard_map_file_suffix: String,
    /// Test status file inside a benchmark directory.
    pub test_results_file: String,
    /// Performance results file inside a benchmark directory.
    pub perf_results_file: String,
    /// Benchmark log file inside a benchmark directory.
    pub log_file: String,
    /// File name for merged results in the scratch directory.
    pub merged_results_file: String,
}

impl Default for ResultLayout {
    fn default() -> Self {
        Self {
            benchmark_dir_suffix: " benchmark".to_string(),
            reference_marker: ".reference".to_string(),
            shard_map_file_suffix: "benchmarks_shard_map.json".to_string(),
            test_results_file: "test_results.json".to_string(),
            perf_results_file: "perf_results.json".to_string(),
            log_file: "benchmark_log.txt".to_string(),
            merged_results_file: "merged_perf_results.json".to_string(),
        }
    }
}

impl ResultLayout {
    /// Derives the benchmark name from a benchmark output directory.
    #[must_use]
    pub fn benchmark_name(&self, directory: &Path) -> BenchmarkName {
        let base = directory.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
        BenchmarkName::new(strip_marker(&base, &self.benchmark_dir_suffix))
    }

    /// Returns true when the benchmark is a reference-build run.
    #[must_use]
    pub fn is_reference(&self, benchmark: &BenchmarkName) -> bool {
        !self.reference_marker.is_empty() && benchmark.as_str().contains(&self.reference_marker)
    }

    /// Returns the benchmark name with the reference marker removed.
    #[must_use]
    pub fn base_name(&self, benchmark: &BenchmarkName) -> String {
        strip_marker(benchmark.as_str(), &self.reference_marker)
    }
}

/// Dashboard connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSettings {
    /// Dashboard base URL.
    pub results_url: String,
    /// Legacy `mastername -> machine group` mapping.
    pub machine_groups: BTreeMap<String, String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            results_url: DEFAULT_RESULTS_URL.to_string(),
            machine_groups: BTreeMap::new(),
        }
    }
}

/// Inputs for one processing run.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    /// Output path for the merged test status.
    pub output_json: PathBuf,
    /// Root holding one directory per shard.
    pub task_output_dir: PathBuf,
    /// CI build properties.
    pub build: BuildProperties,
    /// Bot configuration name; defaults to the builder name.
    pub configuration_name: Option<String>,
    /// Skip merging and uploading when set.
    pub smoke_test_mode: bool,
    /// Task output naming conventions.
    pub layout: ResultLayout,
    /// Dashboard settings.
    pub dashboard: DashboardSettings,
    /// Parent for the scratch directory; the system temp dir when unset.
    pub scratch_root: Option<PathBuf>,
}

/// Collaborators used by a processing run.
#[derive(Clone, Copy)]
pub struct ProcessCollaborators<'a> {
    /// Dashboard uploader.
    pub uploader: &'a dyn Uploader,
    /// Log stream publisher.
    pub publisher: &'a dyn LogPublisher,
    /// Event sink.
    pub events: &'a dyn EventSink,
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Summary of a processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// True when any merge or upload failed.
    pub upload_failure: bool,
    /// Benchmarks with at least one enabled result, in name order.
    pub enabled: Vec<BenchmarkName>,
    /// Benchmarks whose results marked them disabled, in name order.
    pub disabled: Vec<BenchmarkName>,
    /// Benchmarks handed to the uploader, in name order.
    pub uploaded: Vec<BenchmarkName>,
    /// Links attached to the test status document.
    pub links: BTreeMap<String, String>,
}

impl ProcessOutcome {
    /// Returns the process exit code: 1 when any upload failed, else 0.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.upload_failure { 1 } else { 0 }
    }
}

// ============================================================================
// SECTION: Task Output Scan
// ============================================================================

/// Benchmark directories discovered under a task output root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    /// Sharding map file, when one of the shards wrote it.
    pub shard_map_file: Option<PathBuf>,
    /// Benchmark output directories grouped by benchmark name.
    pub benchmarks: BTreeMap<BenchmarkName, Vec<PathBuf>>,
}

/// Scans a task output root and groups benchmark directories by name.
///
/// Shard directories and their entries are visited in sorted order. Plain
/// files at the root and non-directory entries inside a shard (other than the
/// sharding map) are ignored.
///
/// # Errors
///
/// Returns [`ProcessError::Io`] when a directory cannot be listed.
pub fn scan_task_output(root: &Path, layout: &ResultLayout) -> Result<TaskOutput, ProcessError> {
    let mut output = TaskOutput::default();
    for shard_dir in sorted_entries(root)? {
        if !shard_dir.is_dir() {
            continue;
        }
        for entry in sorted_entries(&shard_dir)? {
            let name = entry.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
            if name.ends_with(&layout.shard_map_file_suffix) {
                output.shard_map_file = Some(entry);
            } else if entry.is_dir() {
                output.benchmarks.entry(layout.benchmark_name(&entry)).or_default().push(entry);
            }
        }
    }
    Ok(output)
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Processes a task output tree end to end.
///
/// # Errors
///
/// Returns [`ProcessError`] for run-fatal conditions: an unreadable task
/// output tree, an invalid dashboard results URL, incomplete build
/// properties, scratch directory failure, or an unwritable output file.
pub fn process_perf_results(
    request: &ProcessRequest,
    collaborators: &ProcessCollaborators<'_>,
) -> Result<ProcessOutcome, ProcessError> {
    let total = StepTimer::start("process perf results");
    let events = collaborators.events;
    if !request.smoke_test_mode {
        Url::parse(&request.dashboard.results_url)
            .map_err(|err| ProcessError::ResultsUrl(err.to_string()))?;
    }
    let task_output = scan_task_output(&request.task_output_dir, &request.layout)?;

    let mut links = BTreeMap::new();
    if let Some(path) = &task_output.shard_map_file {
        publish_shard_map(path, collaborators, &mut links);
    }
    publish_benchmark_logs(&task_output.benchmarks, &request.layout, collaborators, &mut links);

    let analysis = analyze_test_results(&task_output.benchmarks, &request.layout, events);

    let mut outcome = ProcessOutcome::default();
    for (benchmark, enabled) in &analysis.enabled {
        if *enabled {
            outcome.enabled.push(benchmark.clone());
        } else {
            outcome.disabled.push(benchmark.clone());
        }
    }

    if !request.smoke_test_mode {
        let summary =
            upload_results(request, &task_output.benchmarks, &analysis.enabled, collaborators)?;
        outcome.upload_failure = summary.upload_failure;
        outcome.uploaded = summary.uploaded;
        if let Some(link) = summary.link {
            links.insert(summary.label, link);
        }
    }

    write_test_status(&request.output_json, analysis.test_results, &links, events)?;
    outcome.links = links;
    total.finish(events);
    Ok(outcome)
}

// ============================================================================
// SECTION: Log Streams
// ============================================================================

/// Publishes the sharding map and records its link.
fn publish_shard_map(
    path: &Path,
    collaborators: &ProcessCollaborators<'_>,
    links: &mut BTreeMap<String, String>,
) {
    let timer = StepTimer::start("generate benchmark shard map stream");
    let rendered = fs::read_to_string(path)
        .map_err(|err| err.to_string())
        .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|err| err.to_string()))
        .and_then(|value| to_pretty_string(&value).map_err(|err| err.to_string()));
    match rendered {
        Ok(content) => {
            let link = publish_or_record(
                collaborators,
                "Benchmarks_Shard_Map",
                &content,
                Some(JSON_CONTENT_TYPE),
            );
            if let Some(link) = link {
                links.insert(SHARD_MAP_LINK.to_string(), link);
            }
        }
        Err(message) => collaborators.events.record(
            &PipelineEvent::new(EVENT_PUBLISH_FAILED)
                .with_path(path.display().to_string())
                .with_message(message),
        ),
    }
    timer.finish(collaborators.events);
}

/// Publishes every benchmark log and an index of their links.
fn publish_benchmark_logs(
    benchmarks: &BTreeMap<BenchmarkName, Vec<PathBuf>>,
    layout: &ResultLayout,
    collaborators: &ProcessCollaborators<'_>,
    links: &mut BTreeMap<String, String>,
) {
    let timer = StepTimer::start("generate perf log streams");
    let mut log_links: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (benchmark, directories) in benchmarks {
        for directory in directories {
            let path = directory.join(&layout.log_file);
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    collaborators.events.record(
                        &PipelineEvent::new(EVENT_LOG_MISSING)
                            .with_benchmark(benchmark.as_str())
                            .with_path(path.display().to_string())
                            .with_message(err.to_string()),
                    );
                    continue;
                }
            };
            if let Some(link) = publish_or_record(collaborators, benchmark.as_str(), &content, None)
            {
                log_links.entry(benchmark.as_str()).or_default().push(link);
            }
        }
    }
    match to_pretty_string(&log_links) {
        Ok(index) => {
            if let Some(link) =
                publish_or_record(collaborators, "Benchmarks_Logs", &index, Some(JSON_CONTENT_TYPE))
            {
                links.insert(LOGS_LINK.to_string(), link);
            }
        }
        Err(err) => collaborators.events.record(
            &PipelineEvent::new(EVENT_PUBLISH_FAILED).with_message(err.to_string()),
        ),
    }
    timer.finish(collaborators.events);
}

/// Publishes a stream, recording a failure event instead of returning it.
fn publish_or_record(
    collaborators: &ProcessCollaborators<'_>,
    name: &str,
    content: &str,
    content_type: Option<&str>,
) -> Option<String> {
    match collaborators.publisher.publish(name, content, content_type) {
        Ok(link) => Some(link),
        Err(err) => {
            collaborators.events.record(
                &PipelineEvent::new(EVENT_PUBLISH_FAILED)
                    .with_benchmark(name)
                    .with_message(err.to_string()),
            );
            None
        }
    }
}

// ============================================================================
// SECTION: Test Results
// ============================================================================

/// Enabled state per benchmark and the documents to aggregate.
struct TestResultAnalysis {
    /// Enabled flag per benchmark, taken from its last readable document.
    enabled: BTreeMap<BenchmarkName, bool>,
    /// Non-reference documents in visit order.
    test_results: Vec<Value>,
}

/// Reads every benchmark directory's test results.
fn analyze_test_results(
    benchmarks: &BTreeMap<BenchmarkName, Vec<PathBuf>>,
    layout: &ResultLayout,
    events: &dyn EventSink,
) -> TestResultAnalysis {
    let timer = StepTimer::start("analyze perf json test results");
    let mut analysis = TestResultAnalysis {
        enabled: BTreeMap::new(),
        test_results: Vec::new(),
    };
    for (benchmark, directories) in benchmarks {
        let is_reference = layout.is_reference(benchmark);
        for directory in directories {
            let path = directory.join(&layout.test_results_file);
            let document = match read_test_results(&path) {
                Ok(Some(document)) => document,
                Ok(None) => {
                    events.record(
                        &PipelineEvent::new(EVENT_RESULTS_MISSING)
                            .with_benchmark(benchmark.as_str())
                            .with_path(directory.display().to_string()),
                    );
                    continue;
                }
                Err(message) => {
                    events.record(
                        &PipelineEvent::new(EVENT_RESULTS_INVALID)
                            .with_benchmark(benchmark.as_str())
                            .with_path(path.display().to_string())
                            .with_message(message),
                    );
                    continue;
                }
            };
            let enabled = !is_disabled(&document);
            if !enabled {
                events.record(
                    &PipelineEvent::new(EVENT_BENCHMARK_DISABLED).with_benchmark(benchmark.as_str()),
                );
            }
            if !is_reference {
                analysis.test_results.push(document);
            }
            analysis.enabled.insert(benchmark.clone(), enabled);
        }
    }
    timer.finish(events);
    analysis
}

/// Reads a test results file; absent, blank, null, or empty documents yield `None`.
///
/// Unreadable files and documents that are not JSON objects yield the reason
/// as an error string; callers skip the contribution.
fn read_test_results(path: &Path) -> Result<Option<Value>, String> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.to_string()),
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(&text).map_err(|err| err.to_string())?;
    if !is_truthy(&value) {
        return Ok(None);
    }
    if !value.is_object() {
        return Err("test results must be a JSON object".to_string());
    }
    Ok(Some(value))
}

/// Returns true for version-3 documents that ran no tests.
fn is_disabled(document: &Value) -> bool {
    let version = document.get("version").and_then(Value::as_u64);
    version == Some(DISABLED_AWARE_VERSION) && !document.get("tests").is_some_and(is_truthy)
}

/// JSON truthiness: null, false, zero, and empty strings or containers are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number.abs() > 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(members) => !members.is_empty(),
    }
}

// ============================================================================
// SECTION: Upload
// ============================================================================

/// Result of the upload phase.
struct UploadSummary {
    /// True when any merge or upload failed.
    upload_failure: bool,
    /// Benchmarks handed to the uploader.
    uploaded: Vec<BenchmarkName>,
    /// Link label, suffixed on failure.
    label: String,
    /// Link to the published dashboard index.
    link: Option<String>,
}

/// Per-run values shared by every benchmark upload.
struct UploadContext<'a> {
    /// Processing request.
    request: &'a ProcessRequest,
    /// Resolved configuration name.
    configuration_name: &'a str,
    /// Resolved dashboard machine group.
    machine_group: &'a str,
    /// Scratch directory for merged results.
    scratch_dir: &'a Path,
    /// Collaborators.
    collaborators: &'a ProcessCollaborators<'a>,
}

/// Merges and uploads every enabled benchmark and publishes the link index.
fn upload_results(
    request: &ProcessRequest,
    benchmarks: &BTreeMap<BenchmarkName, Vec<PathBuf>>,
    enabled: &BTreeMap<BenchmarkName, bool>,
    collaborators: &ProcessCollaborators<'_>,
) -> Result<UploadSummary, ProcessError> {
    let timer = StepTimer::start("upload results to perf dashboard");
    let targets: Vec<(&BenchmarkName, &Vec<PathBuf>)> = benchmarks
        .iter()
        .filter(|(benchmark, _)| enabled.get(*benchmark).copied().unwrap_or(false))
        .collect();

    let mut upload_failure = false;
    let mut uploaded = Vec::new();
    let mut dashboard: BTreeMap<String, BTreeMap<&'static str, String>> = BTreeMap::new();
    if !targets.is_empty() {
        let configuration_name = match &request.configuration_name {
            Some(name) => name.clone(),
            None => BuildProperties::require(request.build.buildername.as_ref(), "buildername")?
                .to_string(),
        };
        let machine_group = request.build.machine_group(&request.dashboard.machine_groups)?;
        let scratch = create_scratch_dir(request.scratch_root.as_deref())?;
        let context = UploadContext {
            request,
            configuration_name: &configuration_name,
            machine_group: &machine_group,
            scratch_dir: scratch.path(),
            collaborators,
        };
        for (benchmark, directories) in targets {
            let (failed, output_link) = upload_benchmark(&context, benchmark, directories);
            upload_failure |= failed;
            uploaded.push(benchmark.clone());

            let layout = &request.layout;
            let entry = dashboard.entry(layout.base_name(benchmark)).or_default();
            if layout.is_reference(benchmark) {
                if let Some(link) = output_link {
                    entry.insert("perf_results_ref", link);
                }
                continue;
            }
            let url = if failed {
                UPLOAD_FAILED.to_string()
            } else {
                match dashboard_url(
                    &request.dashboard.results_url,
                    &machine_group,
                    &configuration_name,
                    benchmark,
                    &layout.reference_marker,
                    &request.build,
                ) {
                    Ok(url) => url,
                    Err(err) => {
                        collaborators.events.record(
                            &PipelineEvent::new(EVENT_UPLOAD_FAILED)
                                .with_benchmark(benchmark.as_str())
                                .with_message(err.to_string()),
                        );
                        upload_failure = true;
                        UPLOAD_FAILED.to_string()
                    }
                }
            };
            entry.insert("dashboard_url", url);
            if let Some(link) = output_link {
                entry.insert("perf_results", link);
            }
        }
    }

    let mut label = RESULTS_DASHBOARD_LINK.to_string();
    if upload_failure {
        label.push_str(UPLOAD_FAILURE_SUFFIX);
    }
    let link = match to_pretty_string(&dashboard) {
        Ok(index) => publish_or_record(
            collaborators,
            "Results_Dashboard_",
            &index,
            Some(JSON_CONTENT_TYPE),
        ),
        Err(err) => {
            collaborators.events.record(
                &PipelineEvent::new(EVENT_PUBLISH_FAILED).with_message(err.to_string()),
            );
            None
        }
    };
    timer.finish(collaborators.events);
    Ok(UploadSummary {
        upload_failure,
        uploaded,
        label,
        link,
    })
}

/// Merges (when split) and uploads one benchmark, publishing the uploader output.
///
/// Returns whether the benchmark failed and the link to its uploader output.
fn upload_benchmark(
    context: &UploadContext<'_>,
    benchmark: &BenchmarkName,
    directories: &[PathBuf],
) -> (bool, Option<String>) {
    let events = context.collaborators.events;
    let timer = StepTimer::start(format!("{benchmark} upload"));
    let (failed, output) = match prepare_results_file(context, benchmark, directories) {
        Err(err) => {
            events.record(
                &PipelineEvent::new(EVENT_MERGE_FAILED)
                    .with_benchmark(benchmark.as_str())
                    .with_message(err.to_string()),
            );
            (true, err.to_string())
        }
        Ok((results_file, shape)) => {
            events.record(
                &PipelineEvent::new(EVENT_UPLOAD_STARTED)
                    .with_benchmark(benchmark.as_str())
                    .with_path(results_file.display().to_string()),
            );
            let request = UploadRequest {
                benchmark,
                results_file: &results_file,
                shape,
                configuration_name: context.configuration_name,
                build: &context.request.build,
                machine_group: context.machine_group,
                results_url: &context.request.dashboard.results_url,
                scratch_dir: context.scratch_dir,
            };
            match context.collaborators.uploader.upload(&request) {
                Ok(receipt) => (false, receipt.output),
                Err(err) => {
                    events.record(
                        &PipelineEvent::new(EVENT_UPLOAD_FAILED)
                            .with_benchmark(benchmark.as_str())
                            .with_message(err.to_string()),
                    );
                    let output = err.output().map_or_else(|| err.to_string(), str::to_string);
                    (true, output)
                }
            }
        }
    };
    let link = publish_or_record(context.collaborators, benchmark.as_str(), &output, None);
    timer.finish(events);
    (failed, link)
}

/// Returns the file to upload and its shape, merging split benchmarks.
fn prepare_results_file(
    context: &UploadContext<'_>,
    benchmark: &BenchmarkName,
    directories: &[PathBuf],
) -> Result<(PathBuf, ResultShape), MergeError> {
    let layout = &context.request.layout;
    if let [directory] = directories {
        let path = directory.join(&layout.perf_results_file);
        let result = load_perf_result(benchmark, &path)?;
        return Ok((path, result.shape()));
    }

    let timer = StepTimer::start(format!("{benchmark} results merging"));
    let files: Vec<PathBuf> =
        directories.iter().map(|directory| directory.join(&layout.perf_results_file)).collect();
    let merged = merge_benchmark_results(benchmark, &files)?;
    let shape = merged.shape();
    let merge_dir = context.scratch_dir.join(benchmark.as_str());
    let path = merge_dir.join(&layout.merged_results_file);
    let io_error = |error: String| MergeError::Io {
        path: path.display().to_string(),
        error,
    };
    fs::create_dir_all(&merge_dir).map_err(|err| io_error(err.to_string()))?;
    let text = serde_json::to_string(&merged.into_value()).map_err(|err| io_error(err.to_string()))?;
    fs::write(&path, text).map_err(|err| io_error(err.to_string()))?;
    timer.finish(context.collaborators.events);
    Ok((path, shape))
}

/// Creates the uniquely named scratch directory.
fn create_scratch_dir(parent: Option<&Path>) -> Result<TempDir, ProcessError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_DIR_PREFIX);
    let created = match parent {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    };
    created.map_err(|err| ProcessError::ScratchDir(err.to_string()))
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Merges test status documents with the links and writes the output file.
fn write_test_status(
    output: &Path,
    test_results: Vec<Value>,
    links: &BTreeMap<String, String>,
    events: &dyn EventSink,
) -> Result<(), ProcessError> {
    let timer = StepTimer::start("merging json test results");
    let merged = merge_test_status(test_results, links)?;
    let text = serde_json::to_string(&merged).map_err(|err| ProcessError::Write {
        path: output.display().to_string(),
        error: err.to_string(),
    })?;
    fs::write(output, text).map_err(|err| ProcessError::Write {
        path: output.display().to_string(),
        error: err.to_string(),
    })?;
    timer.finish(events);
    Ok(())
}

/// Lists a directory's entries in sorted order.
fn sorted_entries(directory: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    let io_error = |err: std::io::Error| ProcessError::Io {
        path: directory.display().to_string(),
        error: err.to_string(),
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(directory).map_err(io_error)? {
        entries.push(entry.map_err(io_error)?.path());
    }
    entries.sort();
    Ok(entries)
}
