//! Configuration loading and resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The API key and group name have no compiled default; when no tier
//! provides them resolution fails with [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "INB4_API_KEY";
pub const ENV_GROUP: &str = "INB4_GROUP";
pub const ENV_DB: &str = "INB4_DB";
pub const ENV_CACHE_DIR: &str = "INB4_CACHE_DIR";
pub const ENV_LOG_LEVEL: &str = "INB4_LOG_LEVEL";

const APP_DIR: &str = "inb4";
const DB_FILE_NAME: &str = "inb4.sqlite3";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api_key: Option<String>,
    pub group: Option<String>,
    pub db_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub group: Option<String>,
    pub db_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved settings for one import run
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    pub api_key: String,
    pub group: String,
    pub db_path: PathBuf,
    pub cache_dir: PathBuf,
    pub log_level: String,
}

/// Default location of the config file (`<config_dir>/inb4/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Load a TOML config file
///
/// A missing file is not an error and yields an empty config. A file that
/// exists but cannot be read or parsed is reported so the caller can warn
/// and continue with defaults.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve the log level before the rest of the config
///
/// Tracing must be initialized before anything else is logged, so this is
/// split out of [`resolve_config`].
pub fn resolve_log_level(cli: &ConfigOverrides, toml: &TomlConfig) -> String {
    pick(cli.log_level.clone(), ENV_LOG_LEVEL, toml.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Resolve every setting through the CLI → ENV → TOML → default tiers
pub fn resolve_config(cli: &ConfigOverrides, toml: &TomlConfig) -> Result<ImportConfig> {
    let api_key = pick(cli.api_key.clone(), ENV_API_KEY, toml.api_key.clone()).ok_or_else(|| {
        Error::Config(format!(
            "Last.fm API key not configured. Provide one of:\n\
             1. Command line: --key <KEY>\n\
             2. Environment: {}=<KEY>\n\
             3. TOML config: api_key = \"<KEY>\"",
            ENV_API_KEY
        ))
    })?;

    let group = pick(cli.group.clone(), ENV_GROUP, toml.group.clone()).ok_or_else(|| {
        Error::Config(format!(
            "Last.fm group not configured. Provide one of:\n\
             1. Command line: --group <NAME>\n\
             2. Environment: {}=<NAME>\n\
             3. TOML config: group = \"<NAME>\"",
            ENV_GROUP
        ))
    })?;

    let db_path = pick_path(cli.db_path.clone(), ENV_DB, toml.db_path.clone())
        .unwrap_or_else(default_db_path);
    let cache_dir = pick_path(cli.cache_dir.clone(), ENV_CACHE_DIR, toml.cache_dir.clone())
        .unwrap_or_else(default_cache_dir);

    Ok(ImportConfig {
        api_key,
        group,
        db_path,
        cache_dir,
        log_level: resolve_log_level(cli, toml),
    })
}

/// Blank values count as unset at every tier
fn pick(cli: Option<String>, env_var: &str, toml: Option<String>) -> Option<String> {
    let valid = |v: &String| !v.trim().is_empty();

    cli.filter(valid)
        .or_else(|| std::env::var(env_var).ok().filter(valid))
        .or_else(|| toml.filter(valid))
}

fn pick_path(cli: Option<PathBuf>, env_var: &str, toml: Option<PathBuf>) -> Option<PathBuf> {
    pick(
        cli.map(|p| p.to_string_lossy().into_owned()),
        env_var,
        toml.map(|p| p.to_string_lossy().into_owned()),
    )
    .map(PathBuf::from)
}

/// `<data_local_dir>/inb4/inb4.sqlite3`
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR))
        .join(DB_FILE_NAME)
}

/// `<cache_dir>/inb4`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR).join("cache"))
}
