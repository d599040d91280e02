// crates/perf-shard-cli/src/main.rs
// ============================================================================
// Module: Perf Shard CLI Entry Point
// Description: Command dispatcher for sharding map and results workflows.
// Purpose: Provide a localized CLI over the perf-shard core operations.
// Dependencies: clap, perf-shard-config, perf-shard-core, serde, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The perf-shard CLI generates and replays benchmark sharding maps, merges
//! per-shard result files, and runs the post-CI results pipeline. All
//! user-facing strings are routed through the i18n catalog; structured
//! pipeline events go to stderr as JSON lines.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use perf_shard_cli::i18n::Locale;
use perf_shard_cli::i18n::set_locale;
use perf_shard_cli::t;
use perf_shard_config::PerfShardConfig;
use perf_shard_core::BenchmarkName;
use perf_shard_core::BuildProperties;
use perf_shard_core::CommandUploader;
use perf_shard_core::DirectoryLogPublisher;
use perf_shard_core::DryRunUploader;
use perf_shard_core::ProcessCollaborators;
use perf_shard_core::ProcessRequest;
use perf_shard_core::ShardingMap;
use perf_shard_core::StderrEventSink;
use perf_shard_core::StoryCatalog;
use perf_shard_core::TimingData;
use perf_shard_core::Uploader;
use perf_shard_core::core::json::to_pretty_string;
use perf_shard_core::generate_sharding_map;
use perf_shard_core::merge_benchmark_results;
use perf_shard_core::process_perf_results;
use perf_shard_core::replay_sharding_map;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "PERF_SHARD_LANG";
/// Log directory name used when neither a flag nor config names one.
const DEFAULT_LOG_DIR_NAME: &str = "perf-shard-logs";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "perf-shard", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `PERF_SHARD_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Optional config file path (defaults to perf-shard.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a benchmark sharding map from story timing data.
    Generate(GenerateCommand),
    /// Replay a sharding map against timing data and print per-shard totals.
    Replay(ReplayCommand),
    /// Merge one benchmark's per-shard result files.
    Merge(MergeCommand),
    /// Merge, upload, and summarize the outputs of a sharded perf run.
    Process(ProcessCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `generate`.
#[derive(Args, Debug)]
struct GenerateCommand {
    /// JSON list of benchmarks and their stories.
    #[arg(long, value_name = "PATH")]
    stories: PathBuf,
    /// Timing data files whose durations are summed per story.
    #[arg(long = "timing-data", value_name = "PATH", required = true, num_args = 1..)]
    timing_data: Vec<PathBuf>,
    /// Number of shards (defaults to `sharding.num_shards`).
    #[arg(long = "num-shards", value_name = "N")]
    num_shards: Option<usize>,
    /// Output path for the sharding map.
    #[arg(long = "output-file", value_name = "PATH")]
    output_file: PathBuf,
    /// Optional output path for the per-shard assignment report.
    #[arg(long = "debug-file", value_name = "PATH")]
    debug_file: Option<PathBuf>,
    /// Timing data to replay the written map against.
    #[arg(long = "test-data", value_name = "PATH", num_args = 1..)]
    test_data: Vec<PathBuf>,
}

/// Arguments for `replay`.
#[derive(Args, Debug)]
struct ReplayCommand {
    /// Sharding map to replay.
    #[arg(long, value_name = "PATH")]
    map: PathBuf,
    /// JSON list of benchmarks and their stories.
    #[arg(long, value_name = "PATH")]
    stories: PathBuf,
    /// Timing data files whose durations are summed per story.
    #[arg(long = "timing-data", value_name = "PATH", required = true, num_args = 1..)]
    timing_data: Vec<PathBuf>,
}

/// Arguments for `merge`.
#[derive(Args, Debug)]
struct MergeCommand {
    /// Benchmark the result files belong to.
    #[arg(long, value_name = "NAME")]
    benchmark: String,
    /// Output path for the merged results.
    #[arg(long, value_name = "PATH")]
    output: PathBuf,
    /// Result files in merge order.
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,
}

/// Arguments for `process`.
#[derive(Args, Debug)]
struct ProcessCommand {
    /// Root directory holding one directory per shard.
    #[arg(long = "task-output-dir", value_name = "DIR")]
    task_output_dir: PathBuf,
    /// Output path for the merged test status.
    #[arg(short = 'o', long = "output-json", value_name = "PATH")]
    output_json: PathBuf,
    /// CI build properties as a JSON object.
    #[arg(long = "build-properties", value_name = "JSON")]
    build_properties: Option<String>,
    /// Bot configuration name (defaults to the builder name).
    #[arg(long = "configuration-name", value_name = "NAME")]
    configuration_name: Option<String>,
    /// Skip merging and uploading; only aggregate test status.
    #[arg(long = "smoke-test-mode", action = ArgAction::SetTrue)]
    smoke_test_mode: bool,
    /// Directory receiving published log streams.
    #[arg(long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a perf-shard configuration file.
    Validate,
}

/// CLI language selector.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config_path = cli.config.as_deref();
    match command {
        Commands::Generate(command) => command_generate(&command, config_path),
        Commands::Replay(command) => command_replay(&command),
        Commands::Merge(command) => command_merge(&command),
        Commands::Process(command) => command_process(command, config_path),
        Commands::Config {
            command,
        } => command_config(&command, config_path),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Sharding Commands
// ============================================================================

/// Executes the `generate` command.
fn command_generate(command: &GenerateCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let num_shards = resolve_num_shards(command.num_shards, &config)?;
    let catalog = load_catalog(&command.stories)?;
    let timing = TimingData::load(&catalog, &command.timing_data)
        .map_err(|err| CliError::new(t!("generate.timing_failed", error = err)))?;

    let outcome =
        generate_sharding_map(&timing, &catalog, num_shards, command.debug_file.is_some())
            .map_err(|err| CliError::new(t!("generate.failed", error = err)))?;
    outcome.map.write(&command.output_file).map_err(|err| {
        CliError::new(t!(
            "generate.write_failed",
            path = command.output_file.display(),
            error = err
        ))
    })?;
    if let (Some(path), Some(debug)) = (&command.debug_file, &outcome.debug) {
        let rendered = render_json(debug)?;
        fs::write(path, rendered).map_err(|err| {
            CliError::new(t!("generate.debug_write_failed", path = path.display(), error = err))
        })?;
    }
    write_stdout_line(&t!(
        "generate.ok",
        shards = num_shards,
        path = command.output_file.display()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;

    if !command.test_data.is_empty() {
        let test_timing = TimingData::load(&catalog, &command.test_data)
            .map_err(|err| CliError::new(t!("generate.test_data_failed", error = err)))?;
        let report = replay_sharding_map(&outcome.map, &test_timing, &catalog)
            .map_err(|err| CliError::new(t!("replay.failed", error = err)))?;
        write_stdout_line(&render_json(&report)?)
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `replay` command.
fn command_replay(command: &ReplayCommand) -> CliResult<ExitCode> {
    let map = ShardingMap::load(&command.map).map_err(|err| {
        CliError::new(t!("replay.map_failed", path = command.map.display(), error = err))
    })?;
    let catalog = load_catalog(&command.stories)?;
    let timing = TimingData::load(&catalog, &command.timing_data)
        .map_err(|err| CliError::new(t!("generate.timing_failed", error = err)))?;
    let report = replay_sharding_map(&map, &timing, &catalog)
        .map_err(|err| CliError::new(t!("replay.failed", error = err)))?;
    write_stdout_line(&render_json(&report)?)
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Results Commands
// ============================================================================

/// Executes the `merge` command.
fn command_merge(command: &MergeCommand) -> CliResult<ExitCode> {
    let benchmark = BenchmarkName::new(command.benchmark.as_str());
    let merged = merge_benchmark_results(&benchmark, &command.files).map_err(|err| {
        CliError::new(t!("merge.failed", benchmark = benchmark, error = err))
    })?;
    let rendered = serde_json::to_vec(&merged.into_value())
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    fs::write(&command.output, rendered).map_err(|err| {
        CliError::new(t!("merge.write_failed", path = command.output.display(), error = err))
    })?;
    write_stdout_line(&t!(
        "merge.ok",
        count = command.files.len(),
        benchmark = benchmark,
        path = command.output.display()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `process` command.
fn command_process(command: ProcessCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let build = parse_build_properties(command.build_properties.as_deref())?;

    let uploader: Box<dyn Uploader> = match &config.dashboard.upload_command {
        Some(argv) => Box::new(
            CommandUploader::new(argv.clone())
                .map_err(|err| CliError::new(t!("process.uploader_failed", error = err)))?,
        ),
        None => {
            write_stderr_line(&t!("process.dry_run"))
                .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Box::new(DryRunUploader::new())
        }
    };
    let log_dir = resolve_log_dir(command.log_dir, &config, &command.output_json);
    let publisher = DirectoryLogPublisher::new(&log_dir).map_err(|err| {
        CliError::new(t!("process.log_dir_failed", path = log_dir.display(), error = err))
    })?;
    let events = StderrEventSink;

    let request = ProcessRequest {
        output_json: command.output_json,
        task_output_dir: command.task_output_dir,
        build,
        configuration_name: command.configuration_name,
        smoke_test_mode: command.smoke_test_mode,
        layout: config.result_layout(),
        dashboard: config.dashboard_settings(),
        scratch_root: None,
    };
    let collaborators = ProcessCollaborators {
        uploader: uploader.as_ref(),
        publisher: &publisher,
        events: &events,
    };
    let outcome = process_perf_results(&request, &collaborators)
        .map_err(|err| CliError::new(t!("process.failed", error = err)))?;

    let mut lines = vec![t!(
        "process.summary",
        enabled = outcome.enabled.len(),
        disabled = outcome.disabled.len(),
        uploaded = outcome.uploaded.len()
    )];
    for (label, url) in &outcome.links {
        lines.push(t!("process.link", label = label, url = url));
    }
    for line in &lines {
        write_stdout_line(line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    if outcome.upload_failure {
        write_stderr_line(&t!("process.upload_failed"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(ExitCode::from(outcome.exit_code()))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => command_config_validate(config_path),
    }
}

/// Executes the config validation command.
fn command_config_validate(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let message = if config.source.is_some() {
        t!("config.validate.ok")
    } else {
        t!("config.validate.defaults")
    };
    write_stdout_line(&message).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration with localized errors.
fn load_config(path: Option<&Path>) -> CliResult<PerfShardConfig> {
    PerfShardConfig::load(path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Loads the story catalog with localized errors.
fn load_catalog(path: &Path) -> CliResult<StoryCatalog> {
    StoryCatalog::load(path).map_err(|err| {
        CliError::new(t!("generate.stories_failed", path = path.display(), error = err))
    })
}

/// Picks the shard count from the flag, then from config.
fn resolve_num_shards(flag: Option<usize>, config: &PerfShardConfig) -> CliResult<usize> {
    flag.or(config.sharding.num_shards)
        .ok_or_else(|| CliError::new(t!("generate.num_shards_missing")))
}

/// Picks the log directory from the flag, then config, then next to the output.
fn resolve_log_dir(flag: Option<PathBuf>, config: &PerfShardConfig, output_json: &Path) -> PathBuf {
    flag.or_else(|| config.logs.publish_dir()).unwrap_or_else(|| {
        output_json.parent().unwrap_or_else(|| Path::new("")).join(DEFAULT_LOG_DIR_NAME)
    })
}

/// Parses inline build properties; absent properties are empty.
fn parse_build_properties(json: Option<&str>) -> CliResult<BuildProperties> {
    json.map_or_else(
        || Ok(BuildProperties::default()),
        |text| {
            BuildProperties::from_json(text).map_err(|err| {
                CliError::new(t!("process.build_properties_invalid", error = err))
            })
        },
    )
}

/// Resolves the output locale from the flag, then the environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

/// Renders a serializable value as 4-space JSON, keeping its field order.
fn render_json<T: Serialize>(value: &T) -> CliResult<String> {
    to_pretty_string(value)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))
}

/// Converts CLI language selections into locales.
impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
