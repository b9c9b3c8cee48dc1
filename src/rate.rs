//! Display-rate estimation.

use std::time::{Duration, Instant};

/// Sliding-window frames-per-second estimator.
///
/// `update` counts one frame; when the elapsed time since the window opened
/// exceeds the interval, the rate is recomputed as `count / elapsed` and the
/// window restarts. Between window boundaries the last computed rate is
/// returned unchanged.
#[derive(Debug)]
pub struct RateEstimator {
    interval: Duration,
    frame_count: u32,
    window_start: Instant,
    rate: f64,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RateEstimator {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            frame_count: 0,
            window_start: Instant::now(),
            rate: 0.0,
        }
    }

    /// Counts one displayed frame and returns the current estimate.
    pub fn update(&mut self) -> f64 {
        self.update_at(Instant::now())
    }

    /// Clock-injected variant of [`RateEstimator::update`], used by tests and
    /// callers that already hold the tick timestamp.
    pub fn update_at(&mut self, now: Instant) -> f64 {
        self.frame_count += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed > self.interval {
            self.rate = self.frame_count as f64 / elapsed.as_secs_f64();
            self.frame_count = 0;
            self.window_start = now;
        }
        self.rate
    }

    /// The most recently computed rate, without counting a frame.
    pub fn current(&self) -> f64 {
        self.rate
    }
}
