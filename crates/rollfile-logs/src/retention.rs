//! Backup discovery and retention planning
//!
//! Backups are found by scanning the active file's directory on every pass,
//! so the cost of a pass is linear in the number of directory entries. Files
//! that do not decode as one of our backups are never touched.

use chrono::{DateTime, Utc};
use rollfile_core::{Error, LoggerConfig, RotationReason, COMPRESS_SUFFIX};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::backup::{compressed_path, BackupNamer};
use crate::compress::compress_file;
use crate::sink::ErrorSink;

/// One logical backup. A plain file and its `.gz` twin (left behind by an
/// interrupted compression) are a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    /// Uncompressed path of the backup, whether or not it still exists
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub reason: RotationReason,
    /// The uncompressed file is present
    pub has_plain: bool,
    /// The `.gz` file is present
    pub has_compressed: bool,
    /// Size of the file the entry is keyed by
    pub size: u64,
}

impl BackupEntry {
    /// Only the `.gz` form remains
    pub fn is_compressed(&self) -> bool {
        !self.has_plain
    }

    /// Path the entry is keyed by: the `.gz` file when there is one
    pub fn key_path(&self) -> PathBuf {
        if self.has_compressed {
            compressed_path(&self.path)
        } else {
            self.path.clone()
        }
    }

    /// Every on-disk variant of this backup
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files = Vec::with_capacity(2);
        if self.has_plain {
            files.push(self.path.clone());
        }
        if self.has_compressed {
            files.push(compressed_path(&self.path));
        }
        files
    }
}

/// Count and age limits plus the compression switch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// 0 keeps any number of backups
    pub max_backups: usize,
    pub max_age: Option<chrono::Duration>,
    pub compress: bool,
}

impl RetentionPolicy {
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self {
            max_backups: config.max_backups,
            max_age: config.max_age_duration(),
            compress: config.compress,
        }
    }
}

/// What one retention pass will do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    pub remove: Vec<BackupEntry>,
    pub compress: Vec<PathBuf>,
}

impl RetentionPlan {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.compress.is_empty()
    }

    /// Delete, then compress. Failures go to `sink`; a file that already
    /// vanished is not a failure.
    pub fn execute(&self, sink: &dyn ErrorSink) {
        for entry in &self.remove {
            for file in entry.files() {
                match fs::remove_file(&file) {
                    Ok(()) => debug!("Removed backup {}", file.display()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => sink.report(&Error::Remove { path: file, source }),
                }
            }
        }

        for path in &self.compress {
            if let Err(e) = compress_file(path) {
                if !e.is_not_found() {
                    sink.report(&e);
                }
            }
        }
    }
}

/// List the backups next to `active`, newest first
pub fn scan_backups(active: &Path, namer: &BackupNamer) -> io::Result<Vec<BackupEntry>> {
    let dir = match active.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let active_name = active.file_name();

    let mut by_name: BTreeMap<String, BackupEntry> = BTreeMap::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        match entry.file_type() {
            Ok(file_type) if !file_type.is_dir() => {}
            _ => continue,
        }

        let file_name = entry.file_name();
        if Some(file_name.as_os_str()) == active_name {
            continue;
        }
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(info) = namer.decode(name) else {
            continue;
        };

        let logical = if info.compressed {
            name.strip_suffix(COMPRESS_SUFFIX).unwrap_or(name)
        } else {
            name
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

        let slot = by_name
            .entry(logical.to_string())
            .or_insert_with(|| BackupEntry {
                path: dir.join(logical),
                timestamp: info.timestamp,
                reason: info.reason,
                has_plain: false,
                has_compressed: false,
                size: 0,
            });

        if info.compressed {
            slot.has_compressed = true;
            slot.size = size;
        } else {
            slot.has_plain = true;
            if !slot.has_compressed {
                slot.size = size;
            }
        }
    }

    let mut entries: Vec<BackupEntry> = by_name.into_values().collect();
    sort_newest_first(&mut entries);
    Ok(entries)
}

fn sort_newest_first(entries: &mut [BackupEntry]) {
    entries.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Decide deletions and compressions for the given backups.
///
/// `just_rotated` is excluded from the compression set because the rotation
/// that produced it compresses it directly.
pub fn plan(
    mut entries: Vec<BackupEntry>,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
    just_rotated: Option<&Path>,
) -> RetentionPlan {
    sort_newest_first(&mut entries);

    let cutoff = policy.max_age.map(|age| now - age);
    let mut result = RetentionPlan::default();

    for (index, entry) in entries.into_iter().enumerate() {
        let over_count = policy.max_backups > 0 && index >= policy.max_backups;
        let too_old = cutoff.map_or(false, |cutoff| entry.timestamp < cutoff);

        if over_count || too_old {
            result.remove.push(entry);
            continue;
        }

        if policy.compress && entry.has_plain && Some(entry.path.as_path()) != just_rotated {
            result.compress.push(entry.path);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryErrorSink;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 12, 14, 0, 0).unwrap()
    }

    fn entry(name: &str, days_ago: i64, has_plain: bool, has_compressed: bool) -> BackupEntry {
        BackupEntry {
            path: PathBuf::from(name),
            timestamp: base() - chrono::Duration::days(days_ago),
            reason: RotationReason::Size,
            has_plain,
            has_compressed,
            size: 0,
        }
    }

    fn write_backup(dir: &Path, namer: &BackupNamer, at: DateTime<Utc>, suffix: &str) -> PathBuf {
        let name = format!("{}{}", namer.encode(at, RotationReason::Size), suffix);
        let path = dir.join(name);
        fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn test_scan_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("foobar.log");
        let namer = BackupNamer::for_path(&active, false);

        fs::write(&active, b"live").unwrap();
        let t1 = base();
        let t2 = base() + chrono::Duration::days(2);
        write_backup(dir.path(), &namer, t1, "");
        write_backup(dir.path(), &namer, t2, "");

        let entries = scan_backups(&active, &namer).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, t2);
        assert_eq!(entries[1].timestamp, t1);
    }

    #[test]
    fn test_scan_ignores_foreign_files_and_directories() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("foobar.log");
        let namer = BackupNamer::for_path(&active, false);

        fs::write(&active, b"live").unwrap();
        fs::write(dir.path().join("foobar.log.foo"), b"data").unwrap();
        fs::write(dir.path().join("other-2025-05-12T14-00-00.000-size.log"), b"x").unwrap();
        fs::create_dir(dir.path().join(namer.encode(base(), RotationReason::Size))).unwrap();

        assert!(scan_backups(&active, &namer).unwrap().is_empty());
    }

    #[test]
    fn test_scan_merges_plain_and_compressed_twins() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("foobar.log");
        let namer = BackupNamer::for_path(&active, false);

        let plain = write_backup(dir.path(), &namer, base(), "");
        write_backup(dir.path(), &namer, base(), COMPRESS_SUFFIX);
        write_backup(dir.path(), &namer, base() + chrono::Duration::hours(1), COMPRESS_SUFFIX);

        let entries = scan_backups(&active, &namer).unwrap();
        assert_eq!(entries.len(), 2);

        let gz_only = &entries[0];
        assert!(gz_only.is_compressed());
        assert_eq!(gz_only.files().len(), 1);

        let twins = &entries[1];
        assert_eq!(twins.path, plain);
        assert!(twins.has_plain && twins.has_compressed);
        assert!(!twins.is_compressed());
        assert_eq!(twins.key_path(), compressed_path(&plain));
        assert_eq!(twins.files().len(), 2);
    }

    #[test]
    fn test_plan_count_limit_keeps_newest() {
        let entries = vec![
            entry("c", 3, true, false),
            entry("a", 1, true, false),
            entry("b", 2, true, false),
        ];
        let policy = RetentionPolicy {
            max_backups: 2,
            ..Default::default()
        };

        let result = plan(entries, &policy, base(), None);
        assert_eq!(result.remove.len(), 1);
        assert_eq!(result.remove[0].path, PathBuf::from("c"));
        assert!(result.compress.is_empty());
    }

    #[test]
    fn test_plan_age_limit_ignores_count() {
        let entries = vec![entry("new", 0, true, false), entry("old", 3, false, true)];
        let policy = RetentionPolicy {
            max_age: Some(chrono::Duration::days(1)),
            ..Default::default()
        };

        let result = plan(entries, &policy, base(), None);
        assert_eq!(result.remove.len(), 1);
        assert_eq!(result.remove[0].path, PathBuf::from("old"));
    }

    #[test]
    fn test_plan_without_limits_deletes_nothing() {
        let entries = (0..10).map(|i| entry(&i.to_string(), i, true, false)).collect();
        let result = plan(entries, &RetentionPolicy::default(), base(), None);
        assert!(result.is_empty());
    }

    #[test]
    fn test_plan_compression_set() {
        let entries = vec![
            entry("just", 0, true, false),
            entry("leftover", 1, true, false),
            entry("twins", 2, true, true),
            entry("done", 3, false, true),
            entry("expired", 9, true, false),
        ];
        let policy = RetentionPolicy {
            max_age: Some(chrono::Duration::days(5)),
            compress: true,
            ..Default::default()
        };

        let result = plan(entries, &policy, base(), Some(Path::new("just")));
        assert_eq!(
            result.compress,
            vec![PathBuf::from("leftover"), PathBuf::from("twins")]
        );
        assert_eq!(result.remove.len(), 1);
        assert_eq!(result.remove[0].path, PathBuf::from("expired"));
    }

    #[test]
    fn test_plan_ties_broken_by_path() {
        let entries = vec![entry("b", 1, true, false), entry("a", 1, true, false)];
        let policy = RetentionPolicy {
            max_backups: 1,
            ..Default::default()
        };

        let result = plan(entries, &policy, base(), None);
        assert_eq!(result.remove[0].path, PathBuf::from("b"));
    }

    #[test]
    fn test_execute_removes_both_variants_and_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("foobar.log");
        let namer = BackupNamer::for_path(&active, false);

        let plain = write_backup(dir.path(), &namer, base(), "");
        let gz = write_backup(dir.path(), &namer, base(), COMPRESS_SUFFIX);

        let mut entries = scan_backups(&active, &namer).unwrap();
        entries.push(BackupEntry {
            path: dir.path().join("already-gone.log"),
            ..entries[0].clone()
        });

        let plan = RetentionPlan {
            remove: entries,
            compress: vec![dir.path().join("also-gone.log")],
        };
        let sink = MemoryErrorSink::new();
        plan.execute(&sink);

        assert!(!plain.exists());
        assert!(!gz.exists());
        assert!(sink.is_empty(), "unexpected errors: {:?}", sink.errors());
    }
}
