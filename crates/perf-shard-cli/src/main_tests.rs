// crates/perf-shard-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for option resolution in the CLI entry point.
// Purpose: Ensure flag, config, and default precedence stays stable.
// Dependencies: perf-shard-cli main helpers
// ============================================================================

//! ## Overview
//! Validates shard count, log directory, locale, and build property
//! resolution for the CLI commands.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use super::DEFAULT_LOG_DIR_NAME;
use super::LangArg;
use super::Locale;
use super::PerfShardConfig;
use super::parse_build_properties;
use super::resolve_locale;
use super::resolve_log_dir;
use super::resolve_num_shards;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn num_shards_flag_overrides_config() {
    let config = PerfShardConfig::from_toml_str("[sharding]\nnum_shards = 8\n").unwrap();
    assert_eq!(resolve_num_shards(Some(3), &config).unwrap(), 3);
    assert_eq!(resolve_num_shards(None, &config).unwrap(), 8);
    let error = resolve_num_shards(None, &PerfShardConfig::default()).unwrap_err();
    assert!(error.to_string().contains("--num-shards"));
}

#[test]
fn log_dir_prefers_flag_then_config_then_output_sibling() {
    let configured = PerfShardConfig::from_toml_str("[logs]\npublish_dir = \"shared/logs\"\n")
        .unwrap();
    let output = Path::new("out/results/output.json");

    let flagged = resolve_log_dir(Some(PathBuf::from("flag")), &configured, output);
    assert_eq!(flagged, PathBuf::from("flag"));
    assert_eq!(resolve_log_dir(None, &configured, output), PathBuf::from("shared/logs"));
    assert_eq!(
        resolve_log_dir(None, &PerfShardConfig::default(), output),
        Path::new("out/results").join(DEFAULT_LOG_DIR_NAME)
    );
    assert_eq!(
        resolve_log_dir(None, &PerfShardConfig::default(), Path::new("output.json")),
        PathBuf::from(DEFAULT_LOG_DIR_NAME)
    );
}

#[test]
fn build_properties_are_optional_but_must_parse() {
    let empty = parse_build_properties(None).unwrap();
    assert!(empty.buildername.is_none());
    let parsed = parse_build_properties(Some(r#"{"buildername": "linux-perf"}"#)).unwrap();
    assert_eq!(parsed.buildername.as_deref(), Some("linux-perf"));
    let error = parse_build_properties(Some("{")).unwrap_err();
    assert!(error.to_string().starts_with("Invalid build properties"));
}

#[test]
fn locale_flag_wins_over_environment() {
    assert_eq!(resolve_locale(Some(LangArg::Ca), Some("en")).unwrap(), Locale::Ca);
    assert_eq!(resolve_locale(None, Some("ca-ES")).unwrap(), Locale::Ca);
    assert_eq!(resolve_locale(None, None).unwrap(), Locale::En);
    assert!(resolve_locale(None, Some("xx")).is_err());
}
