//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollfile")]
#[command(version, about = "Rolling log files with size, interval and clock-minute rotation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append stdin to a rolling log file, line by line
    Pipe(PipeArgs),

    /// Force a rotation of the log file now
    Rotate(LoggerArgs),

    /// List backups of the log file, newest first
    List(ListArgs),

    /// Print the effective configuration
    Config(LoggerArgs),
}

#[derive(Args)]
pub struct PipeArgs {
    #[command(flatten)]
    pub logger: LoggerArgs,

    /// Also echo each line to stdout
    #[arg(long)]
    pub tee: bool,

    /// How long to wait for background compression and cleanup on exit
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub grace: u64,
}

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub logger: LoggerArgs,

    /// Output in JSON format instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Options that shape the logger; each one overrides the config file
#[derive(Args, Clone, Default)]
pub struct LoggerArgs {
    /// Config file (.toml, .yaml, .yml or .json); defaults to rollfile.* in the current directory
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path of the active log file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Max size before rotation (e.g. 1048576, 512K, 100M, 1G)
    #[arg(long, value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Max number of backups to keep (0 keeps all)
    #[arg(long)]
    pub max_backups: Option<usize>,

    /// Max age of backups in days (0 keeps all)
    #[arg(long)]
    pub max_age: Option<u32>,

    /// Use local time in backup names
    #[arg(long)]
    pub local_time: bool,

    /// Gzip backups after rotation
    #[arg(long)]
    pub compress: bool,

    /// Rotate after this much time (e.g. 3600, 30m, 1h, 1d)
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<u64>,

    /// Minutes of the hour at which to rotate (e.g. 0,15,30,45)
    #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u32).range(0..60))]
    pub rotate_at_minutes: Vec<u32>,
}

/// Parse duration strings like "1h", "30m", "2d", "24h30m" into seconds
fn parse_duration(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("Empty duration string".to_string());
    }

    let mut total_secs: u64 = 0;
    let mut current_num = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            current_num.push(c);
        } else {
            if current_num.is_empty() {
                return Err(format!("Invalid duration format: {}", s));
            }
            let num: u64 = current_num
                .parse()
                .map_err(|_| format!("Invalid number in duration: {}", current_num))?;
            current_num.clear();

            let multiplier = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(format!("Unknown duration unit: {}", c)),
            };
            total_secs = num
                .checked_mul(multiplier)
                .and_then(|secs| total_secs.checked_add(secs))
                .ok_or_else(|| format!("Duration too large: {}", s))?;
        }
    }

    // Plain numbers are seconds
    if !current_num.is_empty() {
        let num: u64 = current_num
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", current_num))?;
        total_secs = total_secs
            .checked_add(num)
            .ok_or_else(|| format!("Duration too large: {}", s))?;
    }

    if total_secs == 0 {
        return Err("Duration must be greater than 0".to_string());
    }

    Ok(total_secs)
}

/// Parse sizes like "512", "64K", "100M", "1G" into bytes (binary units)
fn parse_size(s: &str) -> Result<u64, String> {
    let upper = s.trim().to_uppercase();
    let s = upper.strip_suffix('B').unwrap_or(&upper);
    if s.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (digits, multiplier) = match s.chars().last() {
        Some('K') => (&s[..s.len() - 1], 1024),
        Some('M') => (&s[..s.len() - 1], 1024 * 1024),
        Some('G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1),
    };

    let num: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("Size too large: {}", s))
}
