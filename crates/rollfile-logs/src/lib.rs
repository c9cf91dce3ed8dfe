//! rollfile logs - Rolling file sink with rotation, retention, and compression

mod backup;
mod clock;
mod compress;
mod mill;
mod retention;
mod rotation;
mod scheduler;
mod sink;
mod writer;

pub use backup::{compressed_path, BackupInfo, BackupNamer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use compress::compress_file;
pub use retention::{plan, scan_backups, BackupEntry, RetentionPlan, RetentionPolicy};
pub use rotation::{next_mark, RotationPolicy};
pub use sink::{ErrorSink, MemoryErrorSink, TracingErrorSink};
pub use writer::{Logger, LoggerBuilder};

pub use rollfile_core::{Error, LoggerConfig, Result, RotationReason};
