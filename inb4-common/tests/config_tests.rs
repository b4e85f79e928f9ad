//! Tests for configuration resolution
//!
//! Covers the CLI → ENV → TOML → default priority order and the
//! handling of missing or broken TOML files.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that read or set INB4_* variables are marked with #[serial].

use inb4_common::config::{
    default_cache_dir, default_db_path, load_toml_config, resolve_config, resolve_log_level,
    ConfigOverrides, TomlConfig, ENV_API_KEY, ENV_CACHE_DIR, ENV_DB, ENV_GROUP, ENV_LOG_LEVEL,
};
use inb4_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn clear_env() {
    for var in [ENV_API_KEY, ENV_GROUP, ENV_DB, ENV_CACHE_DIR, ENV_LOG_LEVEL] {
        env::remove_var(var);
    }
}

fn cli(key: Option<&str>, group: Option<&str>) -> ConfigOverrides {
    ConfigOverrides {
        api_key: key.map(str::to_string),
        group: group.map(str::to_string),
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_cli_values_resolve_with_defaults() {
    clear_env();

    let config = resolve_config(&cli(Some("k"), Some("g")), &TomlConfig::default()).unwrap();

    assert_eq!(config.api_key, "k");
    assert_eq!(config.group, "g");
    assert_eq!(config.db_path, default_db_path());
    assert_eq!(config.cache_dir, default_cache_dir());
    assert_eq!(config.log_level, "info");
}

#[test]
#[serial]
fn test_missing_api_key_is_config_error() {
    clear_env();

    let result = resolve_config(&cli(None, Some("g")), &TomlConfig::default());
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("API key")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_missing_group_is_config_error() {
    clear_env();

    let result = resolve_config(&cli(Some("k"), None), &TomlConfig::default());
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("group")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_blank_cli_value_counts_as_missing() {
    clear_env();

    let result = resolve_config(&cli(Some("   "), Some("g")), &TomlConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    env::set_var(ENV_API_KEY, "env-key");
    env::set_var(ENV_DB, "/tmp/inb4-env.sqlite3");

    let toml = TomlConfig {
        api_key: Some("toml-key".to_string()),
        group: Some("toml-group".to_string()),
        db_path: Some(PathBuf::from("/tmp/inb4-toml.sqlite3")),
        ..Default::default()
    };

    let config = resolve_config(&ConfigOverrides::default(), &toml).unwrap();
    assert_eq!(config.api_key, "env-key");
    assert_eq!(config.group, "toml-group");
    assert_eq!(config.db_path, PathBuf::from("/tmp/inb4-env.sqlite3"));

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var(ENV_GROUP, "env-group");
    env::set_var(ENV_LOG_LEVEL, "warn");

    let mut overrides = cli(Some("k"), Some("cli-group"));
    overrides.log_level = Some("debug".to_string());

    let config = resolve_config(&overrides, &TomlConfig::default()).unwrap();
    assert_eq!(config.group, "cli-group");
    assert_eq!(config.log_level, "debug");
    assert_eq!(resolve_log_level(&overrides, &TomlConfig::default()), "debug");

    clear_env();
}

#[test]
fn test_missing_toml_file_yields_empty_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_toml_config(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_toml_file_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "api_key = \"abc\"\ngroup = \"listeners\"\ncache_dir = \"/var/cache/inb4\"\n",
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.api_key.as_deref(), Some("abc"));
    assert_eq!(config.group.as_deref(), Some("listeners"));
    assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/inb4")));
    assert!(config.db_path.is_none());
}

#[test]
fn test_broken_toml_file_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "api_key = [unterminated").unwrap();

    assert!(matches!(load_toml_config(&path), Err(Error::Config(_))));
}
