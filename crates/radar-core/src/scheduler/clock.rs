use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Policy for the delay between consecutive work cycles.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum SleepMode {
    /// Sleep the full interval after every cycle; cadence drifts by the
    /// callback's own latency.
    Fixed,
    /// Sleep the interval minus the time the cycle took; start the next
    /// cycle immediately when the cycle ran for the whole interval or longer.
    #[default]
    Compensated,
}

impl SleepMode {
    /// Delay before the next cycle, or `None` to start it immediately.
    pub fn delay(&self, interval: Duration, elapsed: Duration) -> Option<Duration> {
        match self {
            SleepMode::Fixed => Some(interval),
            SleepMode::Compensated => interval.checked_sub(elapsed).filter(|d| !d.is_zero()),
        }
    }
}

/// Cooperative stop flag with interruptible waits.
///
/// Once triggered it stays triggered; every current and future wait
/// returns at once.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn trigger(&self) {
        *self.state() = true;
        self.wake.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        *self.state()
    }

    /// Block up to `duration`; `true` if triggered before or during the wait.
    pub fn wait(&self, duration: Duration) -> bool {
        let (stopped, _) = self
            .wake
            .wait_timeout_while(self.state(), duration, |stopped| !*stopped)
            .unwrap_or_else(|e| e.into_inner());
        *stopped
    }
}

/// Time source for schedulers.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Sleep for `duration` unless `shutdown` fires first.
    ///
    /// Returns `true` if the sleep was cut short by shutdown.
    fn sleep(&self, duration: Duration, shutdown: &ShutdownSignal) -> bool;
}

/// Wall clock backed by [`Instant`] and interruptible waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration, shutdown: &ShutdownSignal) -> bool {
        shutdown.wait(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::thread;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn test_compensated_subtracts_elapsed() {
        let delay = SleepMode::Compensated.delay(INTERVAL, Duration::from_millis(30));
        assert_eq!(delay, Some(Duration::from_millis(70)));
    }

    #[test]
    fn test_compensated_overload_skips_sleep() {
        assert_eq!(
            SleepMode::Compensated.delay(INTERVAL, Duration::from_millis(150)),
            None
        );
        assert_eq!(SleepMode::Compensated.delay(INTERVAL, INTERVAL), None);
    }

    #[test]
    fn test_fixed_ignores_elapsed() {
        assert_eq!(
            SleepMode::Fixed.delay(INTERVAL, Duration::from_millis(150)),
            Some(INTERVAL)
        );
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(SleepMode::from_str("Fixed").unwrap(), SleepMode::Fixed);
        assert_eq!(SleepMode::Compensated.to_string(), "Compensated");
        assert!(SleepMode::from_str("Dynamic").is_err());
    }

    #[test]
    fn test_wait_times_out_untriggered() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(!signal.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn test_trigger_from_other_thread_ends_wait() {
        let signal = Arc::new(ShutdownSignal::new());
        let trigger = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            trigger.trigger();
        });

        let start = Instant::now();
        assert!(signal.wait(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(30));
        handle.join().unwrap();
    }

    #[test]
    fn test_triggered_signal_never_blocks() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_shutdown());
        assert!(signal.wait(Duration::from_secs(30)));
        assert!(SystemClock.sleep(Duration::from_secs(30), &signal));
    }

    #[test]
    fn test_trigger_wakes_every_waiter() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = Arc::clone(&signal);
                thread::spawn(move || signal.wait(Duration::from_secs(30)))
            })
            .collect();

        thread::sleep(Duration::from_millis(10));
        signal.trigger();
        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }
}
