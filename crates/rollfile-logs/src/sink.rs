//! Destinations for errors raised off the write path

use parking_lot::Mutex;
use rollfile_core::Error;
use tracing::warn;

/// Receives errors from background compression, deletion, and scheduled rotation
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &Error);
}

/// Default sink: logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, error: &Error) {
        warn!("rollfile background error: {}", error);
    }
}

/// A sink that records every reported error, for testing
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    errors: Mutex<Vec<String>>,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of all reported errors, oldest first
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl ErrorSink for MemoryErrorSink {
    fn report(&self, error: &Error) {
        self.errors.lock().push(error.to_string());
    }
}
