//! Sliding-window FPS accounting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Tracks tick timestamps within a sliding window and reports the
/// resulting frame rate. Old timestamps are pruned on every
/// [`record`](FpsMonitor::record) call, so memory use stays bounded
/// regardless of how long the engine runs.
pub struct FpsMonitor {
    window: Duration,
    ticks: VecDeque<Instant>,
}

impl FpsMonitor {
    pub fn new(window: Duration) -> Self {
        Self { window, ticks: VecDeque::new() }
    }

    /// Records a tick at `now` and prunes anything older than the window.
    pub fn record(&mut self, now: Instant) {
        self.ticks.push_back(now);
        while let Some(&front) = self.ticks.front() {
            if now.duration_since(front) > self.window {
                self.ticks.pop_front();
            } else {
                break;
            }
        }
    }

    /// The current frame rate: tick count over the window divided by the
    /// actual elapsed span covered (not the configured window width, so
    /// the estimate isn't artificially low right after startup). Returns
    /// `0.0` until at least two ticks have been recorded.
    pub fn fps(&self) -> f64 {
        if self.ticks.len() < 2 {
            return 0.0;
        }
        let span = self.ticks.back().unwrap().duration_since(*self.ticks.front().unwrap());
        if span.is_zero() {
            return 0.0;
        }
        (self.ticks.len() - 1) as f64 / span.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_zero_before_two_samples() {
        let mut m = FpsMonitor::new(Duration::from_secs(2));
        assert_eq!(m.fps(), 0.0);
        m.record(Instant::now());
        assert_eq!(m.fps(), 0.0);
    }

    #[test]
    fn estimates_fps_from_even_spacing() {
        let mut m = FpsMonitor::new(Duration::from_secs(10));
        let start = Instant::now();
        for i in 0..5u32 {
            m.record(start + Duration::from_millis(i as u64 * 100));
        }
        let fps = m.fps();
        assert!((fps - 10.0).abs() < 0.01, "expected ~10fps, got {fps}");
    }

    #[test]
    fn prunes_ticks_outside_window() {
        let mut m = FpsMonitor::new(Duration::from_millis(50));
        let start = Instant::now();
        m.record(start);
        m.record(start + Duration::from_millis(200));
        // the first tick is well outside a 50ms window relative to the second
        assert_eq!(m.ticks.len(), 1);
    }
}
