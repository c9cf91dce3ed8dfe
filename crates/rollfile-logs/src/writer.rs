//! Rolling log writer: the active file, its triggers, and its rotations

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rollfile_core::{Error, LoggerConfig, Result, RotationReason, SCHEDULER_TICK};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backup::BackupNamer;
use crate::clock::{Clock, SystemClock};
use crate::mill::Mill;
use crate::rotation::RotationPolicy;
use crate::scheduler::{self, SchedulerHandle};
use crate::sink::{ErrorSink, TracingErrorSink};

/// Builds a [`Logger`] with an optional clock and error sink
pub struct LoggerBuilder {
    config: LoggerConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ErrorSink>,
    scheduler_tick: Duration,
}

impl LoggerBuilder {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            sink: Arc::new(TracingErrorSink),
            scheduler_tick: SCHEDULER_TICK,
        }
    }

    /// Time source for rotation decisions and backup names
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Where background errors are reported
    pub fn error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    #[cfg(test)]
    pub(crate) fn scheduler_tick(mut self, tick: Duration) -> Self {
        self.scheduler_tick = tick;
        self
    }

    /// Validate the config and start the minute scheduler if marks are set
    pub fn build(self) -> Result<Logger> {
        self.config.validate()?;

        let path = self.config.path();
        let policy = RotationPolicy::from_config(&self.config);
        let mill = Arc::new(Mill::new(&self.config, self.clock.clone(), self.sink.clone()));

        let shared = Arc::new(Shared {
            namer: BackupNamer::for_path(&path, self.config.local_time),
            path,
            policy,
            run_mill: self.config.needs_mill(),
            clock: self.clock,
            sink: self.sink,
            mill,
            state: Mutex::new(State {
                file: None,
                size: 0,
                last_rotation: None,
                closed: false,
            }),
        });

        let scheduler = if shared.policy.has_minute_marks() {
            let on_mark = Arc::clone(&shared);
            Some(scheduler::spawn(
                shared.policy.clone(),
                shared.clock.clone(),
                self.scheduler_tick,
                move || on_mark.rotate_on_mark(),
            )?)
        } else {
            None
        };

        Ok(Logger {
            shared,
            scheduler: Mutex::new(scheduler),
        })
    }
}

/// A rolling file sink.
///
/// Writes go to the active file. Before a write that would push the file past
/// its max size, or once the rotation interval has elapsed, the active file is
/// renamed to a timestamped backup and a fresh one is opened. Retention and
/// compression of backups happen on background threads.
///
/// All writes and rotations on one logger are serialized by a single lock.
pub struct Logger {
    shared: Arc<Shared>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

struct Shared {
    path: PathBuf,
    namer: BackupNamer,
    policy: RotationPolicy,
    run_mill: bool,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ErrorSink>,
    mill: Arc<Mill>,
    state: Mutex<State>,
}

struct State {
    /// `None` until the first write or rotation opens the active file
    file: Option<File>,
    /// Always equal to the active file's length on disk
    size: u64,
    last_rotation: Option<DateTime<Utc>>,
    closed: bool,
}

impl Logger {
    /// Create a logger with the system clock and a tracing error sink
    pub fn new(config: LoggerConfig) -> Result<Self> {
        LoggerBuilder::new(config).build()
    }

    pub fn builder(config: LoggerConfig) -> LoggerBuilder {
        LoggerBuilder::new(config)
    }

    /// Append `buf` to the active file, rotating first if a trigger fires.
    ///
    /// A buffer larger than the max size is rejected without touching the
    /// file. Returns the number of bytes written.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        self.shared.write(buf)
    }

    /// Rotate now, regardless of size
    pub fn rotate(&self) -> Result<()> {
        self.shared.rotate()
    }

    /// Stop the scheduler and close the active file. Safe to call repeatedly.
    pub fn close(&self) -> Result<()> {
        let file = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.file.take()
        };

        if let Some(scheduler) = self.scheduler.lock().take() {
            scheduler.stop();
        }

        if let Some(file) = file {
            file.sync_all()?;
        }
        debug!("Closed {}", self.shared.path.display());
        Ok(())
    }

    /// Path of the active file
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Bytes in the active file
    pub fn size(&self) -> u64 {
        self.shared.state.lock().size
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Wait for pending retention and compression passes; true if they all
    /// finished within `timeout`
    pub fn wait_for_background(&self, timeout: Duration) -> bool {
        self.shared.mill.wait_idle(timeout)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {}: {}", self.shared.path.display(), e);
        }
    }
}

impl Shared {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::Closed);
        }

        let len = buf.len() as u64;
        if self.policy.oversized(len) {
            return Err(Error::WriteTooLarge {
                len,
                max: self.policy.max_size,
            });
        }

        if state.file.is_none() {
            self.open_existing_or_new(&mut state)?;
        }

        let now = self.clock.now();
        let last_rotation = state.last_rotation.unwrap_or(now);
        let time_due = self.policy.interval_due(last_rotation, now);
        if time_due || self.policy.size_due(state.size, len) {
            let reason = if time_due {
                RotationReason::Time
            } else {
                RotationReason::Size
            };
            self.rotate_locked(&mut state, reason, now)?;
        }

        let Some(file) = state.file.as_mut() else {
            return Err(Error::IoError(io::Error::new(
                io::ErrorKind::NotFound,
                "active file is not open",
            )));
        };
        let (written, result) = write_fully(file, buf);
        state.size += written as u64;

        match result {
            Ok(()) => Ok(written),
            Err(source) => Err(Error::Write { written, source }),
        }
    }

    fn rotate(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::Closed);
        }
        if state.file.is_none() {
            self.open_existing_or_new(&mut state)?;
        }

        let now = self.clock.now();
        let reason = self
            .policy
            .reason(state.last_rotation.unwrap_or(now), now);
        self.rotate_locked(&mut state, reason, now)
    }

    /// Scheduler callback; false once the logger is closed
    fn rotate_on_mark(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        if state.file.is_none() {
            if let Err(e) = self.open_existing_or_new(&mut state) {
                self.sink.report(&e);
                return true;
            }
        }

        let now = self.clock.now();
        if let Err(e) = self.rotate_locked(&mut state, RotationReason::Time, now) {
            self.sink.report(&e);
        }
        true
    }

    fn open_existing_or_new(&self, state: &mut State) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let existing = fs::metadata(&self.path).ok();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let size = file.metadata()?.len();

        let last_rotation = existing
            .and_then(|meta| meta.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|| self.clock.now());

        debug!("Opened {} ({} bytes)", self.path.display(), size);
        state.file = Some(file);
        state.size = size;
        state.last_rotation = Some(last_rotation);

        // picks up backups a previous run left uncompressed or over the limits
        if self.run_mill {
            self.mill.spawn(None);
        }
        Ok(())
    }

    /// Close, rename to a backup, reopen empty. Caller holds the lock.
    fn rotate_locked(&self, state: &mut State, reason: RotationReason, now: DateTime<Utc>) -> Result<()> {
        let previous = state.file.take();
        let permissions = previous
            .as_ref()
            .and_then(|f| f.metadata().ok())
            .map(|m| m.permissions());
        drop(previous);

        let backup = self.namer.backup_path(&self.path, now, reason);
        let rotated = match fs::rename(&self.path, &backup) {
            Ok(()) => Some(backup),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                // keep appending to the file we could not move
                if let Ok(file) = OpenOptions::new().append(true).open(&self.path) {
                    state.file = Some(file);
                }
                return Err(Error::Rotate {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| Error::Rotate {
                path: self.path.clone(),
                source,
            })?;
        if let Some(permissions) = permissions {
            if let Err(e) = file.set_permissions(permissions) {
                debug!("Could not copy permissions to {}: {}", self.path.display(), e);
            }
        }

        state.file = Some(file);
        state.size = 0;
        state.last_rotation = Some(now);

        match &rotated {
            Some(backup) => debug!("Rotated {} -> {} ({})", self.path.display(), backup.display(), reason),
            None => debug!("Recreated missing {}", self.path.display()),
        }

        if self.run_mill {
            self.mill.spawn(rotated);
        }
        Ok(())
    }
}

/// Write until done or the first hard error; returns bytes actually written
fn write_fully(file: &mut File, buf: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while written < buf.len() {
        match file.write(&buf[written..]) {
            Ok(0) => return (written, Err(io::ErrorKind::WriteZero.into())),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}

impl Write for &Logger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match Logger::write(*self, buf) {
            Ok(n) => Ok(n),
            Err(Error::Write { written, .. }) if written > 0 => Ok(written),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for Logger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
