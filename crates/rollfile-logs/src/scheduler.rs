//! Minute-mark scheduler: forces rotations at fixed minutes of the hour

use crossbeam_channel::{select, Receiver, Sender, TryRecvError};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::rotation::RotationPolicy;

/// Owns the scheduler thread; stopping drops the stop sender and joins
pub(crate) struct SchedulerHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub(crate) fn stop(mut self) {
        // disconnecting the channel wakes the pending select
        drop(self.stop_tx.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Minute scheduler thread panicked");
            }
        }
    }
}

/// Start the scheduler. `on_mark` runs at every mark crossing and returns
/// false once the logger is closed.
pub(crate) fn spawn<F>(
    policy: RotationPolicy,
    clock: Arc<dyn Clock>,
    tick: Duration,
    on_mark: F,
) -> io::Result<SchedulerHandle>
where
    F: FnMut() -> bool + Send + 'static,
{
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

    let thread = thread::Builder::new()
        .name("rollfile-scheduler".to_string())
        .spawn(move || run(&policy, clock.as_ref(), tick, stop_rx, on_mark))?;

    Ok(SchedulerHandle {
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    })
}

fn run<F>(
    policy: &RotationPolicy,
    clock: &dyn Clock,
    tick: Duration,
    stop_rx: Receiver<()>,
    mut on_mark: F,
) where
    F: FnMut() -> bool,
{
    loop {
        let target = match policy.next_mark(clock.now()) {
            Some(target) => target,
            None => {
                // no mark resolves in the configured zone right now
                select! {
                    recv(stop_rx) -> _ => return,
                    default(tick) => {}
                }
                continue;
            }
        };
        debug!("Next minute-mark rotation at {}", target);

        loop {
            let remaining = (target - clock.now()).to_std().unwrap_or(Duration::ZERO);
            if remaining.is_zero() {
                break;
            }
            // re-read the clock at least once per tick
            select! {
                recv(stop_rx) -> _ => return,
                default(remaining.min(tick)) => {}
            }
        }

        if matches!(stop_rx.try_recv(), Err(TryRecvError::Disconnected)) {
            return;
        }
        if !on_mark() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use rollfile_core::LoggerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn policy(marks: Vec<u32>) -> RotationPolicy {
        let mut config = LoggerConfig::new("app.log");
        config.rotate_at_minutes = marks;
        RotationPolicy::from_config(&config)
    }

    fn wait_for(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_fires_once_per_crossing() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 12, 14, 1, 0).unwrap()));
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let handle = spawn(policy(vec![0, 15, 30]), clock.clone(), Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        clock.set(Utc.with_ymd_and_hms(2025, 5, 12, 14, 15, 0).unwrap());
        assert!(wait_for(|| fired.load(Ordering::SeqCst) == 1));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        clock.set(Utc.with_ymd_and_hms(2025, 5, 12, 14, 31, 0).unwrap());
        assert!(wait_for(|| fired.load(Ordering::SeqCst) == 2));

        handle.stop();
    }

    #[test]
    fn test_stop_interrupts_wait() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 12, 14, 1, 0).unwrap()));
        let handle = spawn(policy(vec![30]), clock, Duration::from_secs(60), || true).unwrap();

        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_exits_when_callback_declines() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 12, 14, 1, 0).unwrap()));
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let handle = spawn(policy(vec![0, 15]), clock.clone(), Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        })
        .unwrap();

        clock.set(Utc.with_ymd_and_hms(2025, 5, 12, 14, 15, 0).unwrap());
        assert!(wait_for(|| fired.load(Ordering::SeqCst) == 1));

        clock.set(Utc.with_ymd_and_hms(2025, 5, 12, 15, 1, 0).unwrap());
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        handle.stop();
    }
}
