//! Terminal output formatting

use colored::Colorize;
use rollfile_logs::BackupEntry;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Tabled)]
pub struct BackupRow {
    #[tabled(rename = "name")]
    pub name: String,
    #[tabled(rename = "timestamp")]
    pub timestamp: String,
    #[tabled(rename = "reason")]
    pub reason: String,
    #[tabled(rename = "gz")]
    pub compressed: String,
    #[tabled(rename = "size")]
    pub size: String,
}

/// JSON-friendly backup representation
#[derive(Debug, Serialize)]
pub struct BackupJson {
    pub path: String,
    pub timestamp: String,
    pub reason: String,
    pub compressed: bool,
    pub size_bytes: u64,
}

fn file_name(entry: &BackupEntry) -> String {
    entry
        .key_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl From<&BackupEntry> for BackupJson {
    fn from(entry: &BackupEntry) -> Self {
        BackupJson {
            path: entry.key_path().display().to_string(),
            timestamp: entry.timestamp.to_rfc3339(),
            reason: entry.reason.to_string(),
            compressed: entry.is_compressed(),
            size_bytes: entry.size,
        }
    }
}

impl From<&BackupEntry> for BackupRow {
    fn from(entry: &BackupEntry) -> Self {
        let reason = match entry.reason.as_str() {
            "time" => "time".cyan().to_string(),
            other => other.yellow().to_string(),
        };

        BackupRow {
            name: file_name(entry),
            timestamp: entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            reason,
            compressed: if entry.is_compressed() {
                "yes".green().to_string()
            } else {
                "no".to_string()
            },
            size: format_bytes(entry.size),
        }
    }
}

pub fn print_backup_table(entries: &[BackupEntry], json: bool) {
    if json {
        let rows: Vec<BackupJson> = entries.iter().map(BackupJson::from).collect();
        match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing to JSON: {}", e),
        }
        return;
    }

    if entries.is_empty() {
        println!("No backups found");
        return;
    }

    let rows: Vec<BackupRow> = entries.iter().map(BackupRow::from).collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(4)).with(Alignment::right()))
        .to_string();

    println!("{}", table);
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1}G", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.0}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message);
}
