//! Integration tests for config-file resolution and graceful degradation
//!
//! Covers:
//! - Missing config files never abort startup (warning + defaults)
//! - Priority order: CLI argument > environment variable > platform default
//! - Round trip through `write_config` / `load_config`
//!
//! Note: Uses serial_test to prevent ENV variable races. Tests that touch
//! the resolver's environment variable are marked #[serial].

use flowviz_common::config::{
    load_config, load_or_default, write_config, ConfigResolver, DisplaySettings, TomlConfig,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

const TEST_ENV_VAR: &str = "FLOWVIZ_CONFIG_TEST";

#[test]
#[serial]
fn test_cli_argument_wins_over_env_var() {
    env::set_var(TEST_ENV_VAR, "/tmp/from-env.toml");

    let resolver = ConfigResolver::with_env_var(TEST_ENV_VAR);
    let cli = PathBuf::from("/tmp/from-cli.toml");
    assert_eq!(resolver.resolve(Some(&cli)), Some(cli.clone()));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(TEST_ENV_VAR, "/tmp/from-env.toml");

    let resolver = ConfigResolver::with_env_var(TEST_ENV_VAR);
    assert_eq!(
        resolver.resolve(None),
        Some(PathBuf::from("/tmp/from-env.toml"))
    );

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(TEST_ENV_VAR);
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let resolver = ConfigResolver::with_env_var(TEST_ENV_VAR);
    let config = load_or_default(&resolver, Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_write_then_load_preserves_settings() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("config.toml");

    let mut config = TomlConfig::default();
    config.display = DisplaySettings {
        autoplay: false,
        autoplay_speed_ms: 8000,
        include_test_data: true,
        dark_mode: false,
        min_active_nodes: 3,
        source_field: Some("motivation".to_string()),
        target_field: Some("shaped_by".to_string()),
    };
    config.logging.level = "debug".to_string();
    config
        .theme
        .light
        .entry("motivation".to_string())
        .or_default()
        .insert("growth".to_string(), "#2a9d8f".to_string());

    write_config(&config, &target).unwrap();
    assert!(target.exists());

    let loaded = load_config(&target).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_broken_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");
    std::fs::write(&target, "[display]\nautoplay = \"sometimes\"\n").unwrap();

    let resolver = ConfigResolver::with_env_var(TEST_ENV_VAR);
    assert!(load_or_default(&resolver, Some(&target)).is_err());
}
