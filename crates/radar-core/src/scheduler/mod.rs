//! Periodic work on dedicated threads.
//!
//! A [`TaskScheduler`] runs one callback forever on its own thread at a
//! target cadence until stopped. Faults inside the callback are logged and
//! never end the loop.

mod clock;
mod worker;

pub use clock::{Clock, ShutdownSignal, SleepMode, SystemClock};
pub use worker::TaskScheduler;
