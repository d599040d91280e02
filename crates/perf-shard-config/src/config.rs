// crates/perf-shard-config/src/config.rs
// ============================================================================
// Module: Perf Shard Configuration
// Description: Configuration loading and validation for perf-shard.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: perf-shard-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! An explicitly named file (flag or environment variable) must exist; when
//! neither is given and `perf-shard.toml` is absent from the working
//! directory, built-in defaults apply. Invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use perf_shard_core::DashboardSettings;
use perf_shard_core::ResultLayout;
use perf_shard_core::runtime::process::DEFAULT_RESULTS_URL;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "perf-shard.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PERF_SHARD_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of shards accepted from configuration.
pub(crate) const MAX_NUM_SHARDS: usize = 10_000;
/// Maximum number of machine group mappings.
pub(crate) const MAX_MACHINE_GROUPS: usize = 1_024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Perf shard configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerfShardConfig {
    /// Sharding map generation defaults.
    #[serde(default)]
    pub sharding: ShardingConfig,
    /// Task output naming conventions.
    #[serde(default)]
    pub results: ResultsConfig,
    /// Dashboard upload settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Log publishing settings.
    #[serde(default)]
    pub logs: LogsConfig,
    /// Path the configuration was loaded from; `None` for built-in defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl PerfShardConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sharding.validate()?;
        self.results.validate()?;
        self.dashboard.validate()?;
        self.logs.validate()?;
        Ok(())
    }

    /// Returns the task output naming conventions.
    #[must_use]
    pub fn result_layout(&self) -> ResultLayout {
        let results = &self.results;
        ResultLayout {
            benchmark_dir_suffix: results.benchmark_dir_suffix.clone(),
            reference_marker: results.reference_marker.clone(),
            shard_map_file_suffix: results.shard_map_file_suffix.clone(),
            test_results_file: results.test_results_file.clone(),
            perf_results_file: results.perf_results_file.clone(),
            log_file: results.log_file.clone(),
            merged_results_file: results.merged_results_file.clone(),
        }
    }

    /// Returns the dashboard settings.
    #[must_use]
    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            results_url: self.dashboard.results_url.trim().to_string(),
            machine_groups: self.dashboard.machine_groups.clone(),
        }
    }
}

/// Sharding map generation defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShardingConfig {
    /// Shard count used when the CLI does not pass one.
    #[serde(default)]
    pub num_shards: Option<usize>,
}

impl ShardingConfig {
    /// Validates sharding defaults.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(num_shards) = self.num_shards
            && !(1 ..= MAX_NUM_SHARDS).contains(&num_shards)
        {
            return Err(ConfigError::Invalid(format!(
                "sharding.num_shards must be between 1 and {MAX_NUM_SHARDS}"
            )));
        }
        Ok(())
    }
}

/// Task output naming conventions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResultsConfig {
    /// Suffix stripped from benchmark directory names.
    pub benchmark_dir_suffix: String,
    /// Marker identifying reference-build benchmarks.
    pub reference_marker: String,
    /// File name suffix identifying the sharding map.
    pub shard_map_file_suffix: String,
    /// Test status file name.
    pub test_results_file: String,
    /// Performance results file name.
    pub perf_results_file: String,
    /// Benchmark log file name.
    pub log_file: String,
    /// Merged results file name.
    pub merged_results_file: String,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        let layout = ResultLayout::default();
        Self {
            benchmark_dir_suffix: layout.benchmark_dir_suffix,
            reference_marker: layout.reference_marker,
            shard_map_file_suffix: layout.shard_map_file_suffix,
            test_results_file: layout.test_results_file,
            perf_results_file: layout.perf_results_file,
            log_file: layout.log_file,
            merged_results_file: layout.merged_results_file,
        }
    }
}

impl ResultsConfig {
    /// Validates naming conventions.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_file_name("results.shard_map_file_suffix", &self.shard_map_file_suffix)?;
        validate_file_name("results.test_results_file", &self.test_results_file)?;
        validate_file_name("results.perf_results_file", &self.perf_results_file)?;
        validate_file_name("results.log_file", &self.log_file)?;
        validate_file_name("results.merged_results_file", &self.merged_results_file)?;
        if self.reference_marker.trim().is_empty() {
            return Err(ConfigError::Invalid("results.reference_marker must be non-empty".to_string()));
        }
        for (field, value) in [
            ("results.benchmark_dir_suffix", &self.benchmark_dir_suffix),
            ("results.reference_marker", &self.reference_marker),
        ] {
            if value.contains(['/', '\\']) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must not contain path separators"
                )));
            }
        }
        Ok(())
    }
}

/// Dashboard upload settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Dashboard base URL.
    pub results_url: String,
    /// Upload program and leading arguments; dry run when unset.
    pub upload_command: Option<Vec<String>>,
    /// Legacy `mastername -> machine group` mapping.
    pub machine_groups: BTreeMap<String, String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            results_url: DEFAULT_RESULTS_URL.to_string(),
            upload_command: None,
            machine_groups: BTreeMap::new(),
        }
    }
}

impl DashboardConfig {
    /// Validates dashboard settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.results_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "dashboard.results_url must include http:// or https://".to_string(),
            ));
        }
        if url.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "dashboard.results_url must not contain whitespace".to_string(),
            ));
        }
        if let Err(err) = Url::parse(url) {
            return Err(ConfigError::Invalid(format!("dashboard.results_url is invalid: {err}")));
        }
        if let Some(command) = &self.upload_command
            && command.first().is_none_or(|program| program.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "dashboard.upload_command must name a program".to_string(),
            ));
        }
        if self.machine_groups.len() > MAX_MACHINE_GROUPS {
            return Err(ConfigError::Invalid(format!(
                "dashboard.machine_groups exceeds {MAX_MACHINE_GROUPS} entries"
            )));
        }
        for (master, group) in &self.machine_groups {
            if master.trim().is_empty() || group.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "dashboard.machine_groups entries must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Log publishing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
    /// Directory receiving published log streams.
    #[serde(default)]
    pub publish_dir: Option<String>,
}

impl LogsConfig {
    /// Validates log publishing settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.publish_dir {
            validate_path_string("logs.publish_dir", dir)?;
        }
        Ok(())
    }

    /// Returns the publish directory as a path.
    #[must_use]
    pub fn publish_dir(&self) -> Option<PathBuf> {
        self.publish_dir.as_deref().map(|dir| PathBuf::from(dir.trim()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns the path and whether it was named explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a bare file name (exactly one normal path component).
fn validate_file_name(field: &str, value: &str) -> Result<(), ConfigError> {
    validate_path_string(field, value)?;
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if value.trim() == value => Ok(()),
        _ => Err(ConfigError::Invalid(format!("{field} must be a single file name"))),
    }
}
