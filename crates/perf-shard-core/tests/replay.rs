// crates/perf-shard-core/tests/replay.rs
// ============================================================================
// Module: Replay Tests
// Description: Replaying persisted sharding maps against timing data.
// Purpose: Validate report shape, missing-story handling, and map mismatches.
// ============================================================================

//! Sharding map replay tests.

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

use perf_shard_core::BenchmarkName;
use perf_shard_core::ReplayError;
use perf_shard_core::ShardingMap;
use perf_shard_core::StoryCatalog;
use perf_shard_core::StoryKey;
use perf_shard_core::TimingData;
use perf_shard_core::replay_sharding_map;
use perf_shard_core::runtime::replay::format_duration;
use serde_json::json;

fn catalog() -> StoryCatalog {
    StoryCatalog::from_json(
        r#"[
            {"name": "speedometer", "stories": ["a", "b", "c"]},
            {"name": "jetstream", "stories": ["x", "y"]}
        ]"#,
    )
    .unwrap()
}

fn timing() -> TimingData {
    TimingData::from_entries([
        (StoryKey::new("speedometer", "a"), 60.0),
        (StoryKey::new("speedometer", "b"), 12.5),
        (StoryKey::new("speedometer", "c"), 7.0),
        (StoryKey::new("jetstream", "x"), 3.0),
    ])
}

#[test]
fn replay_renders_story_durations_and_full_time() {
    let map = ShardingMap::from_json(
        r#"{
            "0": {"benchmarks": {"speedometer": {"end": 2}}},
            "1": {"benchmarks": {"speedometer": {"begin": 2}, "jetstream": {}}},
            "extra_infos": {
                "num_stories": 5,
                "predicted_min_shard_time": 0.0,
                "predicted_min_shard_index": 0,
                "predicted_max_shard_time": 0.0,
                "predicted_max_shard_index": null
            }
        }"#,
    )
    .unwrap();
    let report = replay_sharding_map(&map, &timing(), &catalog()).unwrap();

    assert_eq!(report.full_times(), vec![72.5, 10.0]);
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        json!({
            "0": {"speedometer/a": "60.0", "speedometer/b": "12.5", "full_time": 72.5},
            "1": {
                "speedometer/c": "7.0",
                "jetstream/x": "3.0",
                "jetstream/y": "0.0",
                "full_time": 10.0
            }
        })
    );
}

#[test]
fn replay_keeps_map_benchmark_order() {
    let map = ShardingMap::from_json(
        r#"{"0": {"benchmarks": {"speedometer": {"begin": 2}, "jetstream": {"end": 1}}}}"#,
    )
    .unwrap();
    let report = replay_sharding_map(&map, &timing(), &catalog()).unwrap();
    let keys: Vec<String> = report.shards[0].stories.iter().map(|(key, _)| key.to_string()).collect();
    assert_eq!(keys, vec!["speedometer/c", "jetstream/x"]);
}

#[test]
fn stories_missing_from_timing_count_as_zero() {
    let map = ShardingMap::from_json(r#"{"0": {"benchmarks": {"jetstream": {}}}}"#).unwrap();
    let report = replay_sharding_map(&map, &TimingData::default(), &catalog()).unwrap();
    assert_eq!(report.full_times(), vec![0.0]);
    assert_eq!(report.shards[0].stories.len(), 2);
}

#[test]
fn unknown_benchmark_is_rejected() {
    let map = ShardingMap::from_json(r#"{"0": {"benchmarks": {"octane": {}}}}"#).unwrap();
    let error = replay_sharding_map(&map, &timing(), &catalog()).unwrap_err();
    assert_eq!(
        error,
        ReplayError::UnknownBenchmark {
            shard: 0,
            benchmark: BenchmarkName::new("octane"),
        }
    );
}

#[test]
fn range_outside_story_list_is_rejected() {
    let map = ShardingMap::from_json(
        r#"{"0": {"benchmarks": {}}, "1": {"benchmarks": {"jetstream": {"begin": 1, "end": 4}}}}"#,
    )
    .unwrap();
    let error = replay_sharding_map(&map, &timing(), &catalog()).unwrap_err();
    assert_eq!(
        error,
        ReplayError::RangeOutOfBounds {
            shard: 1,
            benchmark: BenchmarkName::new("jetstream"),
            begin: 1,
            end: 4,
            story_count: 2,
        }
    );
}

#[test]
fn duration_strings_keep_one_decimal_for_whole_numbers() {
    assert_eq!(format_duration(60.0), "60.0");
    assert_eq!(format_duration(0.0), "0.0");
    assert_eq!(format_duration(12.25), "12.25");
}
