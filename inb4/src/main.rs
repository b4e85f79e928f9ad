//! inb4 - Last.fm group listening history importer
//!
//! `inb4 build` fetches the listening history of every member of a
//! Last.fm group for a date range and stores it in a local SQLite
//! database. Responses are cached on disk so an interrupted run can be
//! repeated cheaply.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, CommandFactory, Parser, Subcommand};
use inb4::error::ImportError;
use inb4::services::run_build;
use inb4_common::config::{
    default_config_path, load_toml_config, resolve_config, resolve_log_level, ConfigOverrides,
    TomlConfig, ENV_API_KEY, ENV_CACHE_DIR, ENV_DB, ENV_GROUP,
};
use inb4_common::time::parse_day;
use inb4_common::DateRange;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "inb4", version, about = "Build a local database of a Last.fm group's listening history")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the group's listening history and store it in the database
    Build(BuildArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Database file (created if missing)
    #[arg(long, env = ENV_DB)]
    db: Option<PathBuf>,

    /// First day to fetch, YYYY-MM-DD (default: 1 January of this year)
    #[arg(long)]
    from: Option<String>,

    /// Last day to fetch, YYYY-MM-DD (default: today)
    #[arg(long)]
    to: Option<String>,

    /// Last.fm API key
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    key: Option<String>,

    /// Last.fm group name
    #[arg(long, env = ENV_GROUP)]
    group: Option<String>,

    /// Response cache directory
    #[arg(long, env = ENV_CACHE_DIR)]
    cache_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/inb4/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl BuildArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.key.clone(),
            group: self.group.clone(),
            db_path: self.db.clone(),
            cache_dir: self.cache_dir.clone(),
            log_level: self.log_level.clone(),
        }
    }

    fn date_range(&self) -> inb4_common::Result<DateRange> {
        let today = Utc::now().date_naive();
        match (&self.from, &self.to) {
            (None, None) => DateRange::year_to_date(today),
            (from, to) => {
                let from = match from {
                    Some(value) => parse_day(value)?,
                    None => DateRange::year_to_date(today)?.from().date_naive(),
                };
                let to = match to {
                    Some(value) => parse_day(value)?,
                    None => today,
                };
                DateRange::from_days(from, to)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let Command::Build(args) = cli.command;

    let overrides = args.overrides();

    let config_path = args.config.clone().or_else(default_config_path);
    let (toml_config, toml_error) = match config_path.as_deref() {
        Some(path) => match load_toml_config(path) {
            Ok(config) => (config, None),
            Err(e) => (TomlConfig::default(), Some(e)),
        },
        None => (TomlConfig::default(), None),
    };

    let log_level = resolve_log_level(&overrides, &toml_config);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting inb4 v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(e) = toml_error {
        warn!("Ignoring config file: {}", e);
    }

    let config = match resolve_config(&overrides, &toml_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}\n", e);
            let mut command = Cli::command();
            if let Some(build) = command.find_subcommand_mut("build") {
                build.print_help()?;
            }
            std::process::exit(1);
        }
    };

    let range = args.date_range()?;

    match run_build(&config, &range).await {
        Ok(summary) => {
            info!(
                "Stored {} plays for {} users ({} requests)",
                summary.plays, summary.users, summary.requests
            );
            Ok(())
        }
        Err(e) => Err(build_failure(e)),
    }
}

/// Log a failed run and keep the whole error chain for `main`'s report
fn build_failure(e: ImportError) -> anyhow::Error {
    let e = anyhow::Error::from(e);
    error!("Build failed: {:#}", e);
    e
}
