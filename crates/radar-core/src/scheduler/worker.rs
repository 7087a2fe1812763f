use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use super::{Clock, ShutdownSignal, SleepMode, SystemClock};
use crate::error::{Error, Result};

enum State {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

/// Runs a callback repeatedly on a dedicated thread.
///
/// Lifecycle is `Idle -> Running -> Stopped`. A stopped scheduler cannot be
/// restarted; create a new one instead.
pub struct TaskScheduler {
    name: String,
    interval: Duration,
    mode: SleepMode,
    clock: Arc<dyn Clock>,
    shutdown: Arc<ShutdownSignal>,
    cycles: Arc<AtomicU64>,
    state: State,
}

impl TaskScheduler {
    pub fn new(name: impl Into<String>, interval: Duration, mode: SleepMode) -> Self {
        Self {
            name: name.into(),
            interval,
            mode,
            clock: Arc::new(SystemClock),
            shutdown: Arc::new(ShutdownSignal::new()),
            cycles: Arc::new(AtomicU64::new(0)),
            state: State::Idle,
        }
    }

    /// Replace the time source (used to drive cadence deterministically)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mode(&self) -> SleepMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Number of completed work cycles, successful or not
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Spawn the worker thread and begin calling `task`.
    pub fn start<F>(&mut self, task: F) -> Result<()>
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        match self.state {
            State::Running(_) => return Err(Error::SchedulerRunning(self.name.clone())),
            State::Stopped => return Err(Error::SchedulerStopped(self.name.clone())),
            State::Idle => {}
        }

        let worker = Worker {
            name: self.name.clone(),
            interval: self.interval,
            mode: self.mode,
            clock: Arc::clone(&self.clock),
            shutdown: Arc::clone(&self.shutdown),
            cycles: Arc::clone(&self.cycles),
        };

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || worker.run(task))?;

        info!(
            "Started '{}' ({:?}, {}ms)",
            self.name,
            self.mode,
            self.interval.as_millis()
        );
        self.state = State::Running(handle);
        Ok(())
    }

    /// Signal the worker to stop and wait for it to exit.
    ///
    /// Returns once the in-flight cycle (if any) has finished. Safe to call
    /// more than once.
    pub fn stop(&mut self) {
        self.shutdown.trigger();
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Running(handle) => {
                if handle.join().is_err() {
                    error!("Worker thread '{}' terminated abnormally", self.name);
                }
                info!("Stopped '{}' after {} cycles", self.name, self.cycles());
            }
            State::Idle | State::Stopped => {}
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    name: String,
    interval: Duration,
    mode: SleepMode,
    clock: Arc<dyn Clock>,
    shutdown: Arc<ShutdownSignal>,
    cycles: Arc<AtomicU64>,
}

impl Worker {
    fn run<F>(self, mut task: F)
    where
        F: FnMut() -> anyhow::Result<()>,
    {
        debug!("Worker '{}' running", self.name);

        while !self.shutdown.is_shutdown() {
            let started = self.clock.now();

            match panic::catch_unwind(AssertUnwindSafe(|| task())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("[{}] Unhandled error in work cycle: {:#}", self.name, e),
                Err(payload) => error!(
                    "[{}] Work cycle panicked: {}",
                    self.name,
                    panic_message(payload.as_ref())
                ),
            }
            self.cycles.fetch_add(1, Ordering::Relaxed);

            let elapsed = self.clock.now().saturating_duration_since(started);
            if let Some(delay) = self.mode.delay(self.interval, elapsed)
                && self.clock.sleep(delay, &self.shutdown)
            {
                break;
            }
        }

        debug!("Worker '{}' exiting", self.name);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
