//! Rotation triggers: size, elapsed interval, and minute-of-hour marks

use chrono::{DateTime, Local, LocalResult, TimeZone, Timelike, Utc};
use rollfile_core::{LoggerConfig, RotationReason};
use std::time::Duration;

/// Trigger settings taken from a [`LoggerConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Max bytes in the active file
    pub max_size: u64,
    /// Rotate once this much time has passed since the last rotation
    pub interval: Option<Duration>,
    /// Sorted minute-of-hour marks
    pub minute_marks: Vec<u32>,
    /// Marks are read on the local clock rather than UTC
    pub local_time: bool,
}

impl RotationPolicy {
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self {
            max_size: config.effective_max_size(),
            interval: config.rotation_interval(),
            minute_marks: config.minute_marks(),
            local_time: config.local_time,
        }
    }

    /// A single write that can never fit, even in an empty file
    pub fn oversized(&self, incoming: u64) -> bool {
        incoming > self.max_size
    }

    /// Strict "would exceed": landing exactly on max size does not rotate
    pub fn size_due(&self, current: u64, incoming: u64) -> bool {
        current.saturating_add(incoming) > self.max_size
    }

    pub fn interval_due(&self, last_rotation: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.interval.and_then(|i| chrono::Duration::from_std(i).ok()) {
            Some(interval) => now - last_rotation >= interval,
            None => false,
        }
    }

    /// Reason to record for a rotation happening now: `time` whenever an
    /// interval rotation is due, `size` otherwise
    pub fn reason(&self, last_rotation: DateTime<Utc>, now: DateTime<Utc>) -> RotationReason {
        if self.interval_due(last_rotation, now) {
            RotationReason::Time
        } else {
            RotationReason::Size
        }
    }

    pub fn has_minute_marks(&self) -> bool {
        !self.minute_marks.is_empty()
    }

    /// Next mark strictly after `now`, on the configured clock
    pub fn next_mark(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.local_time {
            next_mark(&now.with_timezone(&Local), &self.minute_marks).map(|t| t.with_timezone(&Utc))
        } else {
            next_mark(&now, &self.minute_marks)
        }
    }
}

/// Soonest instant among `marks` in the current and next two hours that is
/// strictly after `now`.
///
/// Candidates are laid out on the naive local clock and then resolved in the
/// zone: a repeated wall-clock minute yields both instants, a skipped one none.
pub fn next_mark<Tz: TimeZone>(now: &DateTime<Tz>, marks: &[u32]) -> Option<DateTime<Tz>> {
    let local = now.naive_local();
    let hour_start = local.date().and_hms_opt(local.hour(), 0, 0)?;
    let tz = now.timezone();

    (0..3i64)
        .flat_map(|hour| {
            marks
                .iter()
                .map(move |minute| hour * 60 + i64::from(*minute))
        })
        .map(|offset| hour_start + chrono::Duration::minutes(offset))
        .flat_map(|naive| match tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => vec![t],
            LocalResult::Ambiguous(earliest, latest) => vec![earliest, latest],
            LocalResult::None => Vec::new(),
        })
        .filter(|candidate| candidate > now)
        .min()
}
