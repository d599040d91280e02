//! Config default and conversion tests for perf-shard-config.
// crates/perf-shard-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Default Tests
// Description: Validate built-in defaults and conversion into core settings.
// Purpose: Keep the CLI behavior stable when no config file is present.
// =============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use perf_shard_config::PerfShardConfig;
use perf_shard_core::ResultLayout;
use perf_shard_core::runtime::process::DEFAULT_RESULTS_URL;

type TestResult = Result<(), String>;

#[test]
fn empty_config_matches_core_defaults() -> TestResult {
    let config = PerfShardConfig::from_toml_str("").map_err(|err| err.to_string())?;
    if config != PerfShardConfig::default() {
        return Err("empty document should equal defaults".to_string());
    }
    if config.result_layout() != ResultLayout::default() {
        return Err("default layout mismatch".to_string());
    }
    let dashboard = config.dashboard_settings();
    if dashboard.results_url != DEFAULT_RESULTS_URL || !dashboard.machine_groups.is_empty() {
        return Err("default dashboard settings mismatch".to_string());
    }
    if config.sharding.num_shards.is_some() || config.dashboard.upload_command.is_some() {
        return Err("optional settings should be unset".to_string());
    }
    Ok(())
}

#[test]
fn defaults_validate() -> TestResult {
    PerfShardConfig::default().validate().map_err(|err| err.to_string())
}

#[test]
fn overrides_flow_into_core_settings() -> TestResult {
    let config = PerfShardConfig::from_toml_str(
        r#"
        [results]
        reference_marker = ".ref"
        merged_results_file = "combined.json"

        [dashboard]
        results_url = " https://dashboard.example "
        upload_command = ["upload_perf_dashboard_results", "--verbose"]

        [dashboard.machine_groups]
        "chromium.perf" = "ChromiumPerf"

        [logs]
        publish_dir = "out/logs"
        "#,
    )
    .map_err(|err| err.to_string())?;

    let layout = config.result_layout();
    if layout.reference_marker != ".ref" || layout.merged_results_file != "combined.json" {
        return Err("layout overrides lost".to_string());
    }
    if layout.perf_results_file != ResultLayout::default().perf_results_file {
        return Err("unset layout fields should keep defaults".to_string());
    }
    let dashboard = config.dashboard_settings();
    if dashboard.results_url != "https://dashboard.example" {
        return Err(format!("results url not trimmed: {}", dashboard.results_url));
    }
    let expected = BTreeMap::from([("chromium.perf".to_string(), "ChromiumPerf".to_string())]);
    if dashboard.machine_groups != expected {
        return Err("machine groups mismatch".to_string());
    }
    if config.logs.publish_dir() != Some(PathBuf::from("out/logs")) {
        return Err("publish dir mismatch".to_string());
    }
    Ok(())
}
