//! Backup file naming: `<prefix>-<timestamp>-<reason><ext>[.gz]`

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rollfile_core::{RotationReason, BACKUP_TIME_FORMAT, COMPRESS_SUFFIX};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Identity of a backup recovered from its file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupInfo {
    pub timestamp: DateTime<Utc>,
    pub reason: RotationReason,
    pub compressed: bool,
}

/// Encodes and decodes backup names for one active file
#[derive(Debug, Clone)]
pub struct BackupNamer {
    prefix: String,
    ext: String,
    local_time: bool,
}

impl BackupNamer {
    /// Derive prefix and extension from the active file's name
    pub fn for_path(active: &Path, local_time: bool) -> Self {
        let name = active
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (prefix, ext) = match name.rfind('.') {
            Some(dot) => (name[..dot].to_string(), name[dot..].to_string()),
            None => (name, String::new()),
        };
        Self {
            prefix,
            ext,
            local_time,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// File name for a backup rotated at `timestamp`
    pub fn encode(&self, timestamp: DateTime<Utc>, reason: RotationReason) -> String {
        format!(
            "{}-{}-{}{}",
            self.prefix,
            self.format_timestamp(timestamp),
            reason,
            self.ext
        )
    }

    /// Backup path next to the active file
    pub fn backup_path(
        &self,
        active: &Path,
        timestamp: DateTime<Utc>,
        reason: RotationReason,
    ) -> PathBuf {
        active.with_file_name(self.encode(timestamp, reason))
    }

    /// Parse a directory entry name; `None` if it is not one of our backups
    pub fn decode(&self, file_name: &str) -> Option<BackupInfo> {
        let (logical, compressed) = match file_name.strip_suffix(COMPRESS_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (file_name, false),
        };

        let rest = logical
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('-')?;

        RotationReason::ALL.iter().find_map(|reason| {
            let suffix = format!("-{}{}", reason, self.ext);
            let stamp = rest.strip_suffix(suffix.as_str())?;
            let timestamp = self.parse_timestamp(stamp)?;
            Some(BackupInfo {
                timestamp,
                reason: *reason,
                compressed,
            })
        })
    }

    fn format_timestamp(&self, timestamp: DateTime<Utc>) -> String {
        if self.local_time {
            timestamp
                .with_timezone(&Local)
                .format(BACKUP_TIME_FORMAT)
                .to_string()
        } else {
            timestamp.format(BACKUP_TIME_FORMAT).to_string()
        }
    }

    /// Only stamps exactly as [`BACKUP_TIME_FORMAT`] renders them decode
    fn parse_timestamp(&self, stamp: &str) -> Option<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT).ok()?;
        if naive.format(BACKUP_TIME_FORMAT).to_string() != stamp {
            return None;
        }
        if self.local_time {
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
        } else {
            Some(Utc.from_utc_datetime(&naive))
        }
    }
}

/// `path` with the compressed suffix appended
pub fn compressed_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(COMPRESS_SUFFIX);
    PathBuf::from(name)
}
