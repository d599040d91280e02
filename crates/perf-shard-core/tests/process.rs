// crates/perf-shard-core/tests/process.rs
// ============================================================================
// Module: Result Processing Tests
// Description: End-to-end runs of the post-run processing pipeline.
// Purpose: Validate publishing, enablement, upload dispatch, and output.
// ============================================================================

//! Result processing pipeline tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use perf_shard_core::BenchmarkName;
use perf_shard_core::BuildProperties;
use perf_shard_core::BuildPropertiesError;
use perf_shard_core::DashboardSettings;
use perf_shard_core::DirectoryLogPublisher;
use perf_shard_core::DryRunUploader;
use perf_shard_core::JsonLineEventSink;
use perf_shard_core::NoopEventSink;
use perf_shard_core::ProcessCollaborators;
use perf_shard_core::ProcessError;
use perf_shard_core::ProcessRequest;
use perf_shard_core::ResultLayout;
use perf_shard_core::ResultShape;
use perf_shard_core::UploadError;
use perf_shard_core::UploadReceipt;
use perf_shard_core::UploadRequest;
use perf_shard_core::Uploader;
use perf_shard_core::process_perf_results;
use perf_shard_core::runtime::scan_task_output;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use url::Url;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const BUILD_PROPERTIES: &str = r#"{
    "buildername": "linux-perf",
    "buildnumber": 42,
    "got_revision_cp": "refs/heads/main@{#12345}",
    "got_v8_revision": "v8rev",
    "got_webrtc_revision": "webrtcrev",
    "perf_dashboard_machine_group": "ChromiumPerf"
}"#;

/// Temporary task output tree plus scratch and log directories.
struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["tasks", "logs", "scratch"] {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        Self {
            root,
        }
    }

    fn tasks(&self) -> std::path::PathBuf {
        self.root.path().join("tasks")
    }

    fn logs(&self) -> std::path::PathBuf {
        self.root.path().join("logs")
    }

    fn scratch(&self) -> std::path::PathBuf {
        self.root.path().join("scratch")
    }

    fn output(&self) -> std::path::PathBuf {
        self.root.path().join("output.json")
    }

    fn benchmark(&self, shard: &str, dir_name: &str, test_results: Option<Value>, perf: Value) {
        let dir = self.tasks().join(shard).join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        if let Some(test_results) = test_results {
            fs::write(dir.join("test_results.json"), test_results.to_string()).unwrap();
        }
        fs::write(dir.join("perf_results.json"), perf.to_string()).unwrap();
        fs::write(dir.join("benchmark_log.txt"), format!("log for {dir_name}")).unwrap();
    }

    fn request(&self, smoke_test_mode: bool) -> ProcessRequest {
        ProcessRequest {
            output_json: self.output(),
            task_output_dir: self.tasks(),
            build: BuildProperties::from_json(BUILD_PROPERTIES).unwrap(),
            smoke_test_mode,
            scratch_root: Some(self.scratch()),
            ..ProcessRequest::default()
        }
    }

    fn read_output(&self) -> Value {
        serde_json::from_str(&fs::read_to_string(self.output()).unwrap()).unwrap()
    }
}

fn passing(benchmark: &str, story: &str) -> Value {
    json!({
        "version": 3,
        "tests": {benchmark: {story: {"expected": "PASS", "actual": "PASS"}}}
    })
}

/// Standard tree: a split chart benchmark, a single histogram benchmark,
/// a reference run, and the sharding map.
fn standard_tree(workspace: &Workspace) {
    workspace.benchmark(
        "shard_0",
        "speedometer benchmark",
        Some(passing("speedometer", "a")),
        json!({"charts": {"a": 1}}),
    );
    workspace.benchmark(
        "shard_1",
        "speedometer benchmark",
        Some(passing("speedometer", "b")),
        json!({"charts": {"b": 2}}),
    );
    workspace.benchmark(
        "shard_0",
        "jetstream benchmark",
        Some(passing("jetstream", "x")),
        json!([{"name": "x"}]),
    );
    workspace.benchmark(
        "shard_1",
        "speedometer.reference benchmark",
        Some(passing("speedometer.reference", "ref_only")),
        json!({"charts": {"a": 0}}),
    );
    fs::write(
        workspace.tasks().join("shard_0").join("benchmarks_shard_map.json"),
        r#"{"0": {"benchmarks": {"speedometer": {}}}}"#,
    )
    .unwrap();
}

fn read_link(link: &str) -> String {
    let path = Url::parse(link).unwrap().to_file_path().unwrap();
    fs::read_to_string(path).unwrap()
}

/// Uploader that rejects every request.
struct RejectingUploader;

impl Uploader for RejectingUploader {
    fn upload(&self, _request: &UploadRequest<'_>) -> Result<UploadReceipt, UploadError> {
        Err(UploadError::Rejected {
            reason: "dashboard unavailable".to_string(),
            output: "HTTP 503".to_string(),
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn scan_groups_shard_directories_by_benchmark() {
    let workspace = Workspace::new();
    standard_tree(&workspace);
    fs::write(workspace.tasks().join("summary.json"), "{}").unwrap();

    let output = scan_task_output(&workspace.tasks(), &ResultLayout::default()).unwrap();
    let names: Vec<&str> = output.benchmarks.keys().map(BenchmarkName::as_str).collect();
    assert_eq!(names, vec!["jetstream", "speedometer", "speedometer.reference"]);
    assert_eq!(output.benchmarks[&BenchmarkName::new("speedometer")].len(), 2);
    assert!(output.shard_map_file.unwrap().ends_with("shard_0/benchmarks_shard_map.json"));
}

#[test]
fn full_run_merges_uploads_and_links_everything() {
    let workspace = Workspace::new();
    standard_tree(&workspace);
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };

    let outcome = process_perf_results(&workspace.request(false), &collaborators).unwrap();
    assert_eq!(outcome.exit_code(), 0);

    let uploads = uploader.uploads();
    let names: Vec<&str> = uploads.iter().map(|upload| upload.benchmark.as_str()).collect();
    assert_eq!(names, vec!["jetstream", "speedometer", "speedometer.reference"]);
    assert_eq!(uploads[0].shape, ResultShape::Histograms);
    assert_eq!(uploads[1].shape, ResultShape::Chart);
    let merged: Value = serde_json::from_str(&uploads[1].contents).unwrap();
    assert_eq!(merged, json!({"charts": {"a": 1, "b": 2}}));
    assert!(uploads[1].results_file.ends_with("speedometer/merged_perf_results.json"));
    assert!(uploads[0].results_file.ends_with("jetstream benchmark/perf_results.json"));

    let labels: Vec<&str> = outcome.links.keys().map(String::as_str).collect();
    assert_eq!(labels, vec!["Benchmarks logs", "Benchmarks shard map", "Results Dashboard"]);

    let dashboard: Value =
        serde_json::from_str(&read_link(&outcome.links["Results Dashboard"])).unwrap();
    assert_eq!(
        dashboard["speedometer"]["dashboard_url"],
        json!(
            "https://chromeperf.appspot.com/report?masters=ChromiumPerf&bots=linux-perf&tests=speedometer&rev=12345"
        )
    );
    assert!(dashboard["speedometer"]["perf_results"].is_string());
    assert!(dashboard["speedometer"]["perf_results_ref"].is_string());
    assert!(dashboard.get("speedometer.reference").is_none());

    let logs: Value = serde_json::from_str(&read_link(&outcome.links["Benchmarks logs"])).unwrap();
    assert_eq!(logs["speedometer"].as_array().unwrap().len(), 2);
    let first_log = logs["speedometer"][0].as_str().unwrap();
    assert_eq!(read_link(first_log), "log for speedometer benchmark");

    let shard_map = read_link(&outcome.links["Benchmarks shard map"]);
    assert!(shard_map.starts_with("{\n    \"0\": {"));
}

#[test]
fn output_aggregates_non_reference_test_status_with_links() {
    let workspace = Workspace::new();
    standard_tree(&workspace);
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };

    process_perf_results(&workspace.request(false), &collaborators).unwrap();
    let output = workspace.read_output();
    assert_eq!(output["version"], json!(3));
    assert!(output["tests"]["speedometer"]["a"].is_object());
    assert!(output["tests"]["speedometer"]["b"].is_object());
    assert!(output["tests"]["jetstream"]["x"].is_object());
    assert!(output["tests"].get("speedometer.reference").is_none());
    assert_eq!(output["links"].as_object().unwrap().len(), 3);
}

#[test]
fn scratch_directory_is_removed_after_the_run() {
    let workspace = Workspace::new();
    standard_tree(&workspace);
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };

    process_perf_results(&workspace.request(false), &collaborators).unwrap();
    assert!(uploader.uploads()[1].results_file.starts_with(workspace.scratch()));
    assert_eq!(fs::read_dir(workspace.scratch()).unwrap().count(), 0);
}

#[test]
fn smoke_test_mode_skips_uploads() {
    let workspace = Workspace::new();
    standard_tree(&workspace);
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };

    let outcome = process_perf_results(&workspace.request(true), &collaborators).unwrap();
    assert_eq!(outcome.exit_code(), 0);
    assert!(uploader.uploads().is_empty());
    assert!(outcome.uploaded.is_empty());
    assert!(!outcome.links.contains_key("Results Dashboard"));
    assert!(workspace.read_output()["links"]["Benchmarks logs"].is_string());
}

#[test]
fn disabled_benchmarks_are_aggregated_but_not_uploaded() {
    let workspace = Workspace::new();
    workspace.benchmark(
        "shard_0",
        "octane benchmark",
        Some(json!({"version": 3, "tests": {}, "path_delimiter": "/"})),
        json!({"charts": {}}),
    );
    workspace.benchmark(
        "shard_0",
        "jetstream benchmark",
        Some(passing("jetstream", "x")),
        json!([]),
    );
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };

    let outcome = process_perf_results(&workspace.request(false), &collaborators).unwrap();
    assert_eq!(outcome.disabled, vec![BenchmarkName::new("octane")]);
    assert_eq!(outcome.enabled, vec![BenchmarkName::new("jetstream")]);
    assert_eq!(outcome.uploaded, vec![BenchmarkName::new("jetstream")]);
    assert_eq!(workspace.read_output()["path_delimiter"], json!("/"));
}

#[test]
fn missing_results_are_logged_and_skipped() {
    let workspace = Workspace::new();
    workspace.benchmark("shard_0", "octane benchmark", None, json!({"charts": {}}));
    workspace.benchmark("shard_0", "kraken benchmark", Some(Value::Null), json!({"charts": {}}));
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let events = JsonLineEventSink::new(Vec::new());
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &events,
    };

    let outcome = process_perf_results(&workspace.request(false), &collaborators).unwrap();
    assert!(outcome.enabled.is_empty());
    assert!(uploader.uploads().is_empty());
    assert_eq!(workspace.read_output()["links"].as_object().unwrap().len(), 2);

    let log = String::from_utf8(events.into_inner().unwrap()).unwrap();
    let missing: Vec<Value> = log
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .filter(|event| event["event"] == "results_missing")
        .collect();
    assert_eq!(missing.len(), 2);
    assert!(log.lines().any(|line| line.contains("\"step_duration\"")));
}

#[test]
fn upload_failures_set_exit_code_and_label() {
    let workspace = Workspace::new();
    standard_tree(&workspace);
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &RejectingUploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };

    let outcome = process_perf_results(&workspace.request(false), &collaborators).unwrap();
    assert_eq!(outcome.exit_code(), 1);
    assert!(outcome.upload_failure);
    let link = &outcome.links["Results Dashboard Upload Failure"];
    let dashboard: Value = serde_json::from_str(&read_link(link)).unwrap();
    assert_eq!(dashboard["jetstream"]["dashboard_url"], json!("upload failed"));
    let output_link = dashboard["jetstream"]["perf_results"].as_str().unwrap();
    assert_eq!(read_link(output_link), "HTTP 503");
    assert!(workspace.read_output()["links"]["Results Dashboard Upload Failure"].is_string());
}

#[test]
fn mismatched_shard_shapes_fail_only_that_benchmark() {
    let workspace = Workspace::new();
    workspace.benchmark(
        "shard_0",
        "speedometer benchmark",
        Some(passing("speedometer", "a")),
        json!({"charts": {}}),
    );
    workspace.benchmark(
        "shard_1",
        "speedometer benchmark",
        Some(passing("speedometer", "b")),
        json!([]),
    );
    workspace.benchmark(
        "shard_1",
        "jetstream benchmark",
        Some(passing("jetstream", "x")),
        json!([]),
    );
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };

    let outcome = process_perf_results(&workspace.request(false), &collaborators).unwrap();
    assert_eq!(outcome.exit_code(), 1);
    let uploads = uploader.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].benchmark, BenchmarkName::new("jetstream"));
}

#[test]
fn machine_group_falls_back_to_mastername_mapping() {
    let workspace = Workspace::new();
    workspace.benchmark(
        "shard_0",
        "jetstream benchmark",
        Some(passing("jetstream", "x")),
        json!([]),
    );
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };
    let mut request = workspace.request(false);
    request.build.perf_dashboard_machine_group = None;

    let error = process_perf_results(&request, &collaborators).unwrap_err();
    assert!(matches!(error, ProcessError::Build(BuildPropertiesError::MissingMachineGroup)));
    assert!(uploader.uploads().is_empty());

    request.build.mastername = Some("chromium.perf".to_string());
    request.dashboard = DashboardSettings {
        machine_groups: BTreeMap::from([("chromium.perf".to_string(), "ChromiumPerf".to_string())]),
        ..DashboardSettings::default()
    };
    let outcome = process_perf_results(&request, &collaborators).unwrap();
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(uploader.uploads().len(), 1);
}

#[test]
fn configuration_name_overrides_builder_name() {
    let workspace = Workspace::new();
    workspace.benchmark(
        "shard_0",
        "jetstream benchmark",
        Some(passing("jetstream", "x")),
        json!([]),
    );
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };
    let mut request = workspace.request(false);
    request.configuration_name = Some("linux-perf-fyi".to_string());

    let outcome = process_perf_results(&request, &collaborators).unwrap();
    let dashboard: Value =
        serde_json::from_str(&read_link(&outcome.links["Results Dashboard"])).unwrap();
    let url = dashboard["jetstream"]["dashboard_url"].as_str().unwrap();
    assert!(url.contains("bots=linux-perf-fyi"));
}

#[test]
fn unreadable_test_results_skip_only_that_benchmark() {
    let workspace = Workspace::new();
    workspace.benchmark(
        "shard_0",
        "jetstream benchmark",
        Some(passing("jetstream", "x")),
        json!([]),
    );
    let octane = workspace.tasks().join("shard_1").join("octane benchmark");
    fs::create_dir_all(&octane).unwrap();
    fs::write(octane.join("test_results.json"), "{not json").unwrap();
    workspace.benchmark("shard_1", "kraken benchmark", Some(json!([1, 2])), json!([]));
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let events = JsonLineEventSink::new(Vec::new());
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &events,
    };

    let outcome = process_perf_results(&workspace.request(false), &collaborators).unwrap();
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.enabled, vec![BenchmarkName::new("jetstream")]);
    assert_eq!(uploader.uploads().len(), 1);
    assert!(Path::new(&workspace.output()).exists());
    assert!(workspace.read_output()["tests"]["jetstream"].is_object());

    let log = String::from_utf8(events.into_inner().unwrap()).unwrap();
    let invalid: Vec<Value> = log
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .filter(|event| event["event"] == "results_invalid")
        .collect();
    assert_eq!(invalid.len(), 2);
    let benchmarks: Vec<&str> =
        invalid.iter().filter_map(|event| event["benchmark"].as_str()).collect();
    assert!(benchmarks.contains(&"octane"));
    assert!(benchmarks.contains(&"kraken"));
}

#[test]
fn invalid_results_url_fails_before_any_side_effect() {
    let workspace = Workspace::new();
    standard_tree(&workspace);
    let uploader = DryRunUploader::new();
    let publisher = DirectoryLogPublisher::new(workspace.logs()).unwrap();
    let collaborators = ProcessCollaborators {
        uploader: &uploader,
        publisher: &publisher,
        events: &NoopEventSink,
    };
    let mut request = workspace.request(false);
    request.dashboard.results_url = "http://[bad".to_string();

    let error = process_perf_results(&request, &collaborators).unwrap_err();
    assert!(matches!(error, ProcessError::ResultsUrl(_)));
    assert!(uploader.uploads().is_empty());
    assert_eq!(fs::read_dir(workspace.logs()).unwrap().count(), 0);
    assert!(!Path::new(&workspace.output()).exists());
}
