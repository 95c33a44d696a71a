//! Monotonic clock and fixed-interval tick scheduler.
//!
//! An absolute-wake hot loop built on `std::time::Instant`, second-granularity
//! only — millisecond-grade real-time guarantees are out of scope, so no raw
//! POSIX timer syscalls are used here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Seconds elapsed on a monotonic clock, anchored to an arbitrary epoch.
/// Only differences between two calls are meaningful.
pub fn monotonic_seconds() -> f64 {
    static START: once_cell::sync::Lazy<Instant> = once_cell::sync::Lazy::new(Instant::now);
    START.elapsed().as_secs_f64()
}

/// Wall-clock seconds since the Unix epoch, for display/export only.
pub fn wall_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Process-wide, write-once-per-signal cancellation flag shared between the
/// poller and render/controller threads.
#[derive(Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a callback at a fixed wall-clock interval, bounding how many missed
/// ticks it will silently absorb after a stall (a slow collector, a suspended
/// laptop) before resuming on the current beat instead of replaying history.
pub struct FixedIntervalLoop {
    interval: Duration,
    max_catchup_frames: u32,
}

impl FixedIntervalLoop {
    pub fn new(interval: Duration, max_catchup_frames: u32) -> Self {
        FixedIntervalLoop {
            interval,
            max_catchup_frames,
        }
    }

    /// Runs `tick` once per interval until `cancel` is signalled, then returns.
    /// `tick` receives the number of intervals that elapsed since the previous
    /// call was scheduled to start (normally 1; >1 only after a stall, capped
    /// at `max_catchup_frames`).
    pub fn run(&self, cancel: &CancelToken, mut tick: impl FnMut(u32)) {
        let mut next_deadline = Instant::now() + self.interval;
        while !cancel.is_cancelled() {
            let now = Instant::now();
            if now < next_deadline {
                std::thread::sleep(next_deadline - now);
                if cancel.is_cancelled() {
                    break;
                }
            }

            let mut elapsed_frames = 0u32;
            while next_deadline <= Instant::now() && elapsed_frames < self.max_catchup_frames {
                next_deadline += self.interval;
                elapsed_frames += 1;
            }
            if elapsed_frames == 0 {
                elapsed_frames = 1;
                next_deadline += self.interval;
            } else if next_deadline <= Instant::now() {
                // Catch-up cap hit: resume on the current beat instead of
                // replaying every missed interval.
                next_deadline = Instant::now() + self.interval;
            }

            tick(elapsed_frames);
        }
    }
}
