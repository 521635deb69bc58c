//! Self-correcting step rate control.
//!
//! The scheduler drives simulation steps from a dedicated loop, measuring
//! the rate it actually achieves over a sliding window of recent step
//! timestamps and nudging its sleep delay to close the gap with the
//! desired rate. The correction factors are deliberately tiny so the
//! delay drifts smoothly instead of oscillating.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::StopSignal;

/// Steps-per-second bounds the desired rate is clamped into.
const MIN_RATE: f64 = 5.0;
const MAX_RATE: f64 = 50.0;

/// Number of step timestamps kept for rate estimation.
const WINDOW_LEN: usize = 10;

/// Multiplicative delay corrections per loop iteration.
const SHRINK_FACTOR: f64 = 0.99999;
const GROW_FACTOR: f64 = 1.00001;

/// How a scheduler loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The bound step callback reported stability.
    Stable,
    /// The stop signal was triggered (orderly shutdown).
    Stopped,
}

/// Sliding window over the most recent step timestamps.
#[derive(Debug, Default)]
struct RateWindow {
    timestamps: Vec<Instant>,
}

impl RateWindow {
    fn record(&mut self, now: Instant) {
        if self.timestamps.len() == WINDOW_LEN {
            self.timestamps.remove(0);
        }
        self.timestamps.push(now);
    }

    /// Achieved steps/sec over the window, or None with fewer than two samples.
    fn achieved_rate(&self) -> Option<f64> {
        let first = *self.timestamps.first()?;
        let last = *self.timestamps.last()?;
        if self.timestamps.len() < 2 {
            return None;
        }
        let span = last.duration_since(first).as_secs_f64();
        if span <= 0.0 {
            return None;
        }
        Some((self.timestamps.len() - 1) as f64 / span)
    }
}

/// The background step loop.
///
/// Sleeps `delay` between steps via the stop signal, so a stop request
/// interrupts the sleep immediately. At most one scheduler may be
/// actively stepping a given arena; the engine upholds this by joining
/// the previous scheduler thread before starting a new one.
#[derive(Debug)]
pub struct RateScheduler {
    desired_rate: f64,
    delay: Duration,
    window: RateWindow,
}

impl RateScheduler {
    /// Create a scheduler targeting the given steps/sec, clamped to [5, 50].
    pub fn new(steps_per_second: f64) -> Self {
        let desired_rate = steps_per_second.clamp(MIN_RATE, MAX_RATE);
        Self {
            desired_rate,
            delay: Duration::from_secs_f64(1.0 / desired_rate),
            window: RateWindow::default(),
        }
    }

    pub fn desired_rate(&self) -> f64 {
        self.desired_rate
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run the loop until the step callback reports stability or the stop
    /// signal fires.
    ///
    /// The callback returns `true` once the arena is stable. Each
    /// iteration sleeps, re-estimates the achieved rate, corrects the
    /// delay, then steps.
    pub fn run<F>(mut self, stop: &StopSignal, mut step: F) -> RunEnd
    where
        F: FnMut() -> bool,
    {
        let mut steps = 0u64;
        loop {
            if stop.wait_timeout(self.delay) {
                debug!(steps, "scheduler stopped");
                return RunEnd::Stopped;
            }

            let now = Instant::now();
            self.window.record(now);
            if let Some(achieved) = self.window.achieved_rate() {
                self.correct(achieved);
            }

            steps += 1;
            if step() {
                trace!(steps, delay_us = self.delay.as_micros() as u64, "run stable");
                return RunEnd::Stable;
            }
        }
    }

    /// Nudge the delay toward the desired rate.
    fn correct(&mut self, achieved: f64) {
        let factor = if achieved < self.desired_rate {
            SHRINK_FACTOR
        } else {
            GROW_FACTOR
        };
        self.delay = Duration::from_secs_f64(self.delay.as_secs_f64() * factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_clamped_low() {
        let scheduler = RateScheduler::new(1.0);
        assert_eq!(scheduler.desired_rate(), 5.0);
        assert_eq!(scheduler.delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_rate_clamped_high() {
        let scheduler = RateScheduler::new(500.0);
        assert_eq!(scheduler.desired_rate(), 50.0);
        assert_eq!(scheduler.delay(), Duration::from_millis(20));
    }

    #[test]
    fn test_initial_delay_from_rate() {
        let scheduler = RateScheduler::new(25.0);
        assert_eq!(scheduler.delay(), Duration::from_millis(40));
    }

    #[test]
    fn test_window_needs_two_samples() {
        let mut window = RateWindow::default();
        let base = Instant::now();
        assert!(window.achieved_rate().is_none());
        window.record(base);
        assert!(window.achieved_rate().is_none());
    }

    #[test]
    fn test_window_measures_rate() {
        let mut window = RateWindow::default();
        let base = Instant::now();
        // 11 samples 100ms apart: window keeps the last 10, spanning 900ms.
        for i in 0..11u32 {
            window.record(base + Duration::from_millis(100 * i as u64));
        }
        let rate = window.achieved_rate().unwrap();
        assert!((rate - 10.0).abs() < 0.1, "rate was {rate}");
        assert_eq!(window.timestamps.len(), WINDOW_LEN);
    }

    #[test]
    fn test_correct_shrinks_when_behind() {
        let mut scheduler = RateScheduler::new(25.0);
        let before = scheduler.delay();
        scheduler.correct(20.0);
        assert!(scheduler.delay() < before);
    }

    #[test]
    fn test_correct_grows_when_ahead() {
        let mut scheduler = RateScheduler::new(25.0);
        let before = scheduler.delay();
        scheduler.correct(30.0);
        assert!(scheduler.delay() > before);
    }

    #[test]
    fn test_run_ends_on_stability() {
        let (signal, _trigger) = StopSignal::new();
        let scheduler = RateScheduler::new(50.0);
        let mut remaining = 3;
        let end = scheduler.run(&signal, || {
            remaining -= 1;
            remaining == 0
        });
        assert_eq!(end, RunEnd::Stable);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_run_ends_on_stop() {
        let (signal, trigger) = StopSignal::new();
        let scheduler = RateScheduler::new(50.0);
        trigger.stop();
        let mut stepped = false;
        let end = scheduler.run(&signal, || {
            stepped = true;
            false
        });
        assert_eq!(end, RunEnd::Stopped);
        assert!(!stepped, "no step may run after a stop request");
    }
}
