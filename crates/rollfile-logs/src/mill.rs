//! Background retention and compression passes
//!
//! Each rotation hands a pass to a detached thread. Passes never overlap each
//! other, and the number still pending is tracked so callers can wait for
//! them to drain.

use parking_lot::{Condvar, Mutex};
use rollfile_core::{Error, LoggerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::backup::BackupNamer;
use crate::clock::Clock;
use crate::compress::compress_file;
use crate::retention::{plan, scan_backups, RetentionPolicy};
use crate::sink::ErrorSink;

/// Everything a pass needs, shared with the logger
pub(crate) struct Mill {
    active: PathBuf,
    namer: BackupNamer,
    policy: RetentionPolicy,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ErrorSink>,
    run_lock: Mutex<()>,
    pending: Mutex<usize>,
    idle: Condvar,
}

impl Mill {
    pub(crate) fn new(
        config: &LoggerConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        let active = config.path();
        Self {
            namer: BackupNamer::for_path(&active, config.local_time),
            active,
            policy: RetentionPolicy::from_config(config),
            clock,
            sink,
            run_lock: Mutex::new(()),
            pending: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    /// Queue a pass on its own thread. `just_rotated` is the backup the
    /// triggering rotation produced, if any.
    pub(crate) fn spawn(self: &Arc<Self>, just_rotated: Option<PathBuf>) {
        *self.pending.lock() += 1;

        let mill = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("rollfile-mill".to_string())
            .spawn(move || {
                mill.run(just_rotated.as_deref());
                mill.finish();
            });

        if let Err(e) = spawned {
            self.finish();
            self.sink.report(&Error::IoError(e));
        }
    }

    /// Run one pass on the calling thread
    pub(crate) fn run(&self, just_rotated: Option<&Path>) {
        let _guard = self.run_lock.lock();

        if self.policy.compress {
            if let Some(path) = just_rotated.filter(|p| p.exists()) {
                if let Err(e) = compress_file(path) {
                    self.sink.report(&e);
                }
            }
        }

        let entries = match scan_backups(&self.active, &self.namer) {
            Ok(entries) => entries,
            Err(e) => {
                self.sink.report(&Error::IoError(e));
                return;
            }
        };

        let pass = plan(entries, &self.policy, self.clock.now(), just_rotated);
        if !pass.is_empty() {
            debug!(
                "Retention pass for {}: {} to remove, {} to compress",
                self.active.display(),
                pass.remove.len(),
                pass.compress.len()
            );
        }
        pass.execute(self.sink.as_ref());
    }

    fn finish(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until no pass is pending or `timeout` elapses; true if drained
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        while *pending > 0 {
            if self.idle.wait_until(&mut pending, deadline).timed_out() {
                return *pending == 0;
            }
        }
        true
    }
}
