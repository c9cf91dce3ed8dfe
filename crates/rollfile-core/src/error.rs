//! Error types for rollfile

use std::io;
use std::path::PathBuf;

/// rollfile error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("logger is closed")]
    Closed,

    #[error("write length {len} exceeds maximum file size {max}")]
    WriteTooLarge { len: u64, max: u64 },

    #[error("write failed after {written} bytes: {source}")]
    Write {
        written: usize,
        #[source]
        source: io::Error,
    },

    #[error("Failed to rotate {}: {source}", path.display())]
    Rotate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to compress {}: {source}", path.display())]
    Compression {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type alias for rollfile
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    /// Whether the error is a file that vanished underneath us
    pub fn is_not_found(&self) -> bool {
        let io_err = match self {
            Error::Write { source, .. }
            | Error::Rotate { source, .. }
            | Error::Compression { source, .. }
            | Error::Remove { source, .. }
            | Error::IoError(source) => source,
            _ => return false,
        };
        io_err.kind() == io::ErrorKind::NotFound
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::IoError(e) => e,
            Error::Write { source, .. } => source,
            Error::WriteTooLarge { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            Error::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
