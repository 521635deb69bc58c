//! Run scheduling: the background step loop, its stop signal, and the
//! watchdog that bounds run time.

mod rate;
mod signal;
mod watchdog;

pub use rate::{RateScheduler, RunEnd};
pub use signal::{StopSignal, StopTrigger};
pub use watchdog::{Watchdog, WatchdogHandle};
