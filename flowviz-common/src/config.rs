//! Configuration loading and config-file resolution
//!
//! The display is configured by a single TOML file. All sections are
//! optional; anything missing falls back to built-in defaults, and a
//! missing file is a warning, never a startup failure.
//!
//! # Config File Priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `FLOWVIZ_CONFIG`
//! 3. Platform config directory (`~/.config/flowviz/config.toml` on Linux)
//! 4. Compiled defaults (no file)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "FLOWVIZ_CONFIG";

/// Lower clamp for the autoplay speed (ms)
pub const MIN_AUTOPLAY_SPEED_MS: u64 = 500;

/// Upper clamp for the autoplay speed (ms)
pub const MAX_AUTOPLAY_SPEED_MS: u64 = 120_000;

/// Complete bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Display behaviour (autoplay, filtering, initial field pair)
    #[serde(default)]
    pub display: DisplaySettings,

    /// Sankey viewport geometry
    #[serde(default)]
    pub linear: LinearSettings,

    /// Chord viewport geometry
    #[serde(default)]
    pub radial: RadialSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Color overrides: mode -> field -> label -> color token
    #[serde(default)]
    pub theme: ThemeTables,

    /// Catalog override; empty means the built-in survey catalog
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// Display behaviour settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Start the highlight sequencer automatically
    pub autoplay: bool,

    /// Base dwell duration in milliseconds; finer steps are derived from it
    pub autoplay_speed_ms: u64,

    /// Count records flagged as test data
    pub include_test_data: bool,

    /// Pick colors from the dark palette
    pub dark_mode: bool,

    /// Fewer non-empty nodes than this (both sides together) means
    /// "insufficient data"
    pub min_active_nodes: usize,

    /// Initial source-axis field
    pub source_field: Option<String>,

    /// Initial target-axis field
    pub target_field: Option<String>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            autoplay: true,
            autoplay_speed_ms: 5000,
            include_test_data: false,
            dark_mode: true,
            min_active_nodes: 2,
            source_field: None,
            target_field: None,
        }
    }
}

impl DisplaySettings {
    /// Autoplay speed clamped to the supported range
    pub fn autoplay_speed(&self) -> Duration {
        let clamped = self
            .autoplay_speed_ms
            .clamp(MIN_AUTOPLAY_SPEED_MS, MAX_AUTOPLAY_SPEED_MS);
        if clamped != self.autoplay_speed_ms {
            warn!(
                "autoplay_speed_ms {} outside [{}, {}], using {}",
                self.autoplay_speed_ms, MIN_AUTOPLAY_SPEED_MS, MAX_AUTOPLAY_SPEED_MS, clamped
            );
        }
        Duration::from_millis(clamped)
    }
}

/// Sankey (linear) viewport geometry, in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSettings {
    pub width: f64,
    pub height: f64,
    pub node_width: f64,
    pub node_padding: f64,
    pub margin: f64,
}

impl Default for LinearSettings {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 900.0,
            node_width: 24.0,
            node_padding: 16.0,
            margin: 40.0,
        }
    }
}

/// Chord (radial) viewport geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadialSettings {
    pub outer_radius: f64,
    pub inner_radius: f64,
    /// Gap between the source half and the target half, at 12 and 6 o'clock
    pub side_gap_degrees: f64,
    /// Gap between neighbouring arcs within one half
    pub pad_degrees: f64,
}

impl Default for RadialSettings {
    fn default() -> Self {
        Self {
            outer_radius: 420.0,
            inner_radius: 400.0,
            side_gap_degrees: 20.0,
            pad_degrees: 2.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Color override tables keyed by field, then label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeTables {
    #[serde(default)]
    pub light: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub dark: BTreeMap<String, BTreeMap<String, String>>,
}

/// Raw catalog entry as written in the config file
///
/// Exactly one of `labels` or `buckets` must be present; the catalog
/// builder validates this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub buckets: Option<Vec<BucketDefinition>>,
}

/// One numeric bucket; `lower` is inclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketDefinition {
    pub label: String,
    pub lower: f64,
}

/// Config file resolution following the documented priority order
pub struct ConfigResolver {
    env_var_name: String,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self {
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Use a different environment variable (tests, embedding hosts)
    pub fn with_env_var(env_var_name: impl Into<String>) -> Self {
        Self {
            env_var_name: env_var_name.into(),
        }
    }

    /// Resolve which config file to read, if any
    ///
    /// The CLI argument and environment variable are returned as-is even
    /// if the file does not exist; `load_or_default` reports that case.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path().filter(|p| p.exists())
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Platform config file location (`<config_dir>/flowviz/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flowviz").join("config.toml"))
}

/// Parse a config file
pub fn load_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse config text
pub fn parse_config(content: &str) -> Result<TomlConfig> {
    let config: TomlConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Resolve and load the config, falling back to defaults
///
/// A missing file logs a warning and yields defaults. A file that exists
/// but cannot be parsed is an error: silently ignoring a broken config
/// would hide operator mistakes.
pub fn load_or_default(resolver: &ConfigResolver, cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolver.resolve(cli_arg) {
        Some(path) if path.exists() => load_config(&path),
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write a config file (used to seed a default config for operators)
pub fn write_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn validate(config: &TomlConfig) -> Result<()> {
    let linear = &config.linear;
    if linear.width <= 0.0 || linear.height <= 0.0 {
        return Err(Error::Config(format!(
            "linear viewport must be positive, got {}x{}",
            linear.width, linear.height
        )));
    }
    if linear.node_padding < 0.0 || linear.margin < 0.0 || linear.node_width < 0.0 {
        return Err(Error::Config(
            "linear node_width, node_padding and margin must not be negative".to_string(),
        ));
    }

    let radial = &config.radial;
    if radial.inner_radius <= 0.0 || radial.outer_radius < radial.inner_radius {
        return Err(Error::Config(format!(
            "radial radii invalid: inner {} outer {}",
            radial.inner_radius, radial.outer_radius
        )));
    }
    if !(0.0..180.0).contains(&radial.side_gap_degrees) || radial.pad_degrees < 0.0 {
        return Err(Error::Config(format!(
            "radial gaps invalid: side_gap {} pad {}",
            radial.side_gap_degrees, radial.pad_degrees
        )));
    }

    Ok(())
}
