//! Logger configuration and config file parsing
//!
//! Supports multiple configuration file formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Rolling file configuration. Immutable once a logger is built from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Path of the active file (default: `<tmp>/<exe>-rollfile.log`)
    pub filename: Option<PathBuf>,
    /// Max size in bytes before rotation; 0 means [`DEFAULT_MAX_SIZE`]
    #[serde(alias = "maxsize")]
    pub max_size: u64,
    /// Max age of a backup in days; 0 keeps backups regardless of age
    #[serde(alias = "maxage")]
    pub max_age: u32,
    /// Max number of backups; 0 keeps all of them
    #[serde(alias = "maxbackups")]
    pub max_backups: usize,
    /// Render backup timestamps in local time instead of UTC
    #[serde(alias = "localtime")]
    pub local_time: bool,
    /// Gzip backups after rotation
    pub compress: bool,
    /// Rotate when this many seconds have passed since the last rotation; 0 disables
    #[serde(alias = "rotation_interval")]
    pub rotation_interval_secs: u64,
    /// Minutes of the hour (0-59) at which to force a rotation
    pub rotate_at_minutes: Vec<u32>,
}

impl LoggerConfig {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    /// Resolved path of the active file
    pub fn path(&self) -> PathBuf {
        self.filename.clone().unwrap_or_else(default_log_path)
    }

    /// Max size with the default applied
    pub fn effective_max_size(&self) -> u64 {
        if self.max_size == 0 {
            DEFAULT_MAX_SIZE
        } else {
            self.max_size
        }
    }

    /// Max backup age, if age-based retention is enabled
    pub fn max_age_duration(&self) -> Option<chrono::Duration> {
        (self.max_age > 0).then(|| chrono::Duration::days(i64::from(self.max_age)))
    }

    /// Fixed rotation interval, if enabled
    pub fn rotation_interval(&self) -> Option<Duration> {
        (self.rotation_interval_secs > 0).then(|| Duration::from_secs(self.rotation_interval_secs))
    }

    /// Sorted, de-duplicated minute marks
    pub fn minute_marks(&self) -> Vec<u32> {
        let mut marks = self.rotate_at_minutes.clone();
        marks.sort_unstable();
        marks.dedup();
        marks
    }

    /// Whether a rotation pass has any retention or compression work to do
    pub fn needs_mill(&self) -> bool {
        self.compress || self.max_backups > 0 || self.max_age > 0
    }

    /// Check values that cannot be defaulted
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .rotate_at_minutes
            .iter()
            .find(|m| **m >= MINUTES_PER_HOUR)
        {
            return Err(Error::config(format!(
                "rotate_at_minutes entry {} is outside 0-59",
                bad
            )));
        }
        if let Some(name) = &self.filename {
            if name.file_name().is_none() {
                return Err(Error::config(format!(
                    "filename {} does not name a file",
                    name.display()
                )));
            }
        }
        Ok(())
    }

    /// Load config from file, automatically detecting format from extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unsupported config file extension: {}. Expected .toml, .yaml, .yml, or .json",
                path.display()
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Parse config content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => Ok(toml::from_str(content)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }

    /// Find and load a config file from a directory, if one exists
    pub fn find_and_load(dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok(Some((config, path)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_config_format_detection() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("yaml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert_eq!(config.effective_max_size(), DEFAULT_MAX_SIZE);
        assert!(config.max_age_duration().is_none());
        assert!(config.rotation_interval().is_none());
        assert!(!config.needs_mill());
        assert!(config.path().to_string_lossy().ends_with(DEFAULT_FILE_SUFFIX));
    }

    #[test]
    fn test_config_parse_json_short_keys() {
        let content = r#"
{
    "filename": "foo",
    "maxsize": 5,
    "maxage": 10,
    "maxbackups": 3,
    "localtime": true,
    "compress": true
}"#;
        let config = LoggerConfig::parse(content, ConfigFormat::Json).unwrap();
        assert_eq!(config.filename, Some(PathBuf::from("foo")));
        assert_eq!(config.max_size, 5);
        assert_eq!(config.max_age, 10);
        assert_eq!(config.max_backups, 3);
        assert!(config.local_time);
        assert!(config.compress);
    }

    #[test]
    fn test_config_parse_toml() {
        let content = r#"
filename = "/var/log/app/app.log"
max_size = 1048576
max_backups = 7
rotation_interval_secs = 3600
rotate_at_minutes = [30, 0, 30]
"#;
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let config = LoggerConfig::load(file.path()).unwrap();
        assert_eq!(config.path(), PathBuf::from("/var/log/app/app.log"));
        assert_eq!(config.effective_max_size(), 1048576);
        assert_eq!(config.max_backups, 7);
        assert_eq!(config.rotation_interval(), Some(Duration::from_secs(3600)));
        assert_eq!(config.minute_marks(), vec![0, 30]);
        assert!(config.needs_mill());
    }

    #[test]
    fn test_config_parse_yaml() {
        let content = r#"
filename: app.log
compress: true
max_age: 2
"#;
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let config = LoggerConfig::load(file.path()).unwrap();
        assert!(config.compress);
        assert_eq!(config.max_age_duration(), Some(chrono::Duration::days(2)));
    }

    #[test]
    fn test_config_not_found() {
        let result = LoggerConfig::load(Path::new("/nonexistent/rollfile.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_config_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".ini").unwrap();
        let result = LoggerConfig::load(file.path());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_validate_minute_marks() {
        let mut config = LoggerConfig::new("app.log");
        config.rotate_at_minutes = vec![0, 59];
        assert!(config.validate().is_ok());

        config.rotate_at_minutes = vec![15, 60];
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_find_and_load() {
        let dir = TempDir::new().unwrap();
        assert!(LoggerConfig::find_and_load(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join("rollfile.json"), r#"{"max_backups": 2}"#).unwrap();
        let (config, path) = LoggerConfig::find_and_load(dir.path()).unwrap().unwrap();
        assert_eq!(config.max_backups, 2);
        assert!(path.ends_with("rollfile.json"));
    }
}
