//! Command implementations

pub mod config;
pub mod list;
pub mod pipe;
pub mod rotate;

use anyhow::{Context, Result};
use rollfile_core::LoggerConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::LoggerArgs;

/// Build the effective config: explicit `--config`, else a rollfile.* file in
/// `cwd`, else defaults; flags are applied on top
pub fn resolve_config(args: &LoggerArgs, cwd: &Path) -> Result<LoggerConfig> {
    let mut config = match &args.config {
        Some(path) => LoggerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match LoggerConfig::find_and_load(cwd)? {
            Some((config, path)) => {
                debug!("Using config file {}", path.display());
                config
            }
            None => LoggerConfig::default(),
        },
    };

    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut LoggerConfig, args: &LoggerArgs) {
    if let Some(file) = &args.file {
        config.filename = Some(file.clone());
    }
    if let Some(max_size) = args.max_size {
        config.max_size = max_size;
    }
    if let Some(max_backups) = args.max_backups {
        config.max_backups = max_backups;
    }
    if let Some(max_age) = args.max_age {
        config.max_age = max_age;
    }
    if args.local_time {
        config.local_time = true;
    }
    if args.compress {
        config.compress = true;
    }
    if let Some(interval) = args.interval {
        config.rotation_interval_secs = interval;
    }
    if !args.rotate_at_minutes.is_empty() {
        config.rotate_at_minutes = args.rotate_at_minutes.clone();
    }
}

/// Resolve against the process working directory
pub fn current_config(args: &LoggerArgs) -> Result<LoggerConfig> {
    let cwd: PathBuf = std::env::current_dir().context("Failed to read current directory")?;
    resolve_config(args, &cwd)
}
