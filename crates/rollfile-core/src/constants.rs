//! Constants and default values for rollfile

use std::path::PathBuf;
use std::time::Duration;

/// Default max size of the active file in bytes (100MB)
pub const DEFAULT_MAX_SIZE: u64 = 100 * 1024 * 1024;

/// Suffix appended to the default log file name
pub const DEFAULT_FILE_SUFFIX: &str = "-rollfile.log";

/// Suffix of a compressed backup
pub const COMPRESS_SUFFIX: &str = ".gz";

/// Timestamp layout embedded in backup names (no colons, millisecond precision)
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// Upper bound on a single scheduler wait before the clock is read again
pub const SCHEDULER_TICK: Duration = Duration::from_secs(1);

/// Number of minutes in an hour, the exclusive bound for minute marks
pub const MINUTES_PER_HOUR: u32 = 60;

/// Default config file names to search for (in priority order)
pub const CONFIG_FILES: &[&str] = &[
    "rollfile.toml",
    "rollfile.yaml",
    "rollfile.yml",
    "rollfile.json",
];

/// Log file used when no filename is configured: `<tmp>/<exe>-rollfile.log`
pub fn default_log_path() -> PathBuf {
    let exe = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "rollfile".to_string());
    std::env::temp_dir().join(format!("{}{}", exe, DEFAULT_FILE_SUFFIX))
}
