// crates/perf-shard-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The perf-shard CLI stores user-facing strings in a small translation
//! catalog to enforce consistent messaging across commands. All runtime
//! output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let normalized = value.to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "ca" => Some(Self::Ca),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "perf-shard {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to render JSON output: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("config.validate.defaults", "No config file found; built-in defaults are valid."),
    ("generate.stories_failed", "Failed to load story list {path}: {error}"),
    ("generate.timing_failed", "Failed to load timing data: {error}"),
    (
        "generate.num_shards_missing",
        "Pass --num-shards or set sharding.num_shards in the config file.",
    ),
    ("generate.failed", "Sharding map generation failed: {error}"),
    ("generate.write_failed", "Failed to write sharding map to {path}: {error}"),
    ("generate.debug_write_failed", "Failed to write sharding debug report to {path}: {error}"),
    ("generate.ok", "Sharding map with {shards} shards written to {path}"),
    ("generate.test_data_failed", "Failed to load test timing data: {error}"),
    ("replay.map_failed", "Failed to load sharding map {path}: {error}"),
    ("replay.failed", "Sharding map replay failed: {error}"),
    ("merge.failed", "Failed to merge results for {benchmark}: {error}"),
    ("merge.write_failed", "Failed to write merged results to {path}: {error}"),
    ("merge.ok", "Merged {count} result files for {benchmark} into {path}"),
    ("process.build_properties_invalid", "Invalid build properties: {error}"),
    ("process.uploader_failed", "Failed to configure the dashboard uploader: {error}"),
    ("process.log_dir_failed", "Failed to prepare log directory {path}: {error}"),
    ("process.dry_run", "No dashboard.upload_command configured; uploads are recorded only."),
    ("process.failed", "Processing perf results failed: {error}"),
    (
        "process.summary",
        "Processed {enabled} benchmarks ({disabled} disabled, {uploaded} sent to the dashboard).",
    ),
    ("process.link", "{label}: {url}"),
    ("process.upload_failed", "One or more benchmarks failed to merge or upload."),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Static Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "perf-shard {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("output.json_failed", "No s'ha pogut renderitzar la sortida JSON: {error}"),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.validate.ok", "Configuració vàlida."),
    (
        "config.validate.defaults",
        "No s'ha trobat cap fitxer de configuració; els valors per defecte són vàlids.",
    ),
    ("generate.stories_failed", "No s'ha pogut carregar la llista d'històries {path}: {error}"),
    ("generate.timing_failed", "No s'han pogut carregar les dades de temps: {error}"),
    (
        "generate.num_shards_missing",
        "Passeu --num-shards o definiu sharding.num_shards al fitxer de configuració.",
    ),
    ("generate.failed", "La generació del mapa de fragments ha fallat: {error}"),
    ("generate.write_failed", "No s'ha pogut escriure el mapa de fragments a {path}: {error}"),
    (
        "generate.debug_write_failed",
        "No s'ha pogut escriure l'informe de depuració a {path}: {error}",
    ),
    ("generate.ok", "Mapa de fragments amb {shards} fragments escrit a {path}"),
    ("generate.test_data_failed", "No s'han pogut carregar les dades de temps de prova: {error}"),
    ("replay.map_failed", "No s'ha pogut carregar el mapa de fragments {path}: {error}"),
    ("replay.failed", "La reproducció del mapa de fragments ha fallat: {error}"),
    ("merge.failed", "No s'han pogut combinar els resultats de {benchmark}: {error}"),
    ("merge.write_failed", "No s'han pogut escriure els resultats combinats a {path}: {error}"),
    ("merge.ok", "S'han combinat {count} fitxers de resultats de {benchmark} a {path}"),
    ("process.build_properties_invalid", "Propietats de compilació no vàlides: {error}"),
    ("process.uploader_failed", "No s'ha pogut configurar el carregador del tauler: {error}"),
    ("process.log_dir_failed", "No s'ha pogut preparar el directori de registres {path}: {error}"),
    (
        "process.dry_run",
        "No hi ha dashboard.upload_command configurat; les càrregues només es registren.",
    ),
    ("process.failed", "El processament dels resultats de rendiment ha fallat: {error}"),
    (
        "process.summary",
        "S'han processat {enabled} proves ({disabled} desactivades, {uploaded} enviades al \
         tauler).",
    ),
    ("process.link", "{label}: {url}"),
    ("process.upload_failed", "Una o més proves no s'han pogut combinar o carregar."),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the raw catalog entries for the requested locale.
pub(crate) const fn catalog_entries_for(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::En => CATALOG_EN,
        Locale::Ca => CATALOG_CA,
    }
}

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    let cell = match locale {
        Locale::En => &CATALOG_EN_MAP,
        Locale::Ca => &CATALOG_CA_MAP,
    };
    cell.get_or_init(|| catalog_entries_for(locale).iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let locale = current_locale();
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
