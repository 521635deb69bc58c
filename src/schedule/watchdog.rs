//! Watchdog: bounds the wall-clock duration of a layout run.
//!
//! Non-convergence is not an error. If a run has not stabilized within
//! the timeout, the watchdog forces stability so the scheduler's next
//! step observes it and terminates, delivering a possibly imperfect but
//! always-delivered layout.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::sim::ForcedStable;

use super::{StopSignal, StopTrigger};

/// Armed once per run; fires the shared forced-stability flag for that
/// run's generation unless cancelled first.
pub struct Watchdog;

impl Watchdog {
    /// Arm a watchdog for the given run generation.
    pub fn arm(timeout: Duration, generation: u64, forced: Arc<ForcedStable>) -> WatchdogHandle {
        let (signal, trigger) = StopSignal::new();
        let thread = thread::spawn(move || {
            if !signal.wait_timeout(timeout) {
                forced.fire(generation);
                debug!(generation, timeout_ms = timeout.as_millis() as u64, "watchdog fired");
            }
        });

        WatchdogHandle {
            trigger,
            thread: Some(thread),
        }
    }
}

/// Handle to an armed watchdog.
pub struct WatchdogHandle {
    trigger: StopTrigger,
    thread: Option<JoinHandle<()>>,
}

impl WatchdogHandle {
    /// Cancel the watchdog and join its thread.
    ///
    /// Cancelling after the timeout is harmless: the flag is
    /// generation-tagged, so a fire that already happened only affects
    /// the run it was armed for.
    pub fn cancel(mut self) {
        self.trigger.stop();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.trigger.stop();
        // Don't join in drop to avoid blocking
    }
}
