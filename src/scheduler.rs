//! Interval timer that fires commit runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::commit::{AutoCommitter, Trigger};
use crate::config::SettingsSource;
use crate::error::ConfigError;

/// Shortest period the timer accepts, whatever the settings say.
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Work fired by the scheduler.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn execute(&self, trigger: Trigger);
}

#[async_trait]
impl Job for AutoCommitter {
    async fn execute(&self, trigger: Trigger) {
        self.run_and_report(trigger).await;
    }
}

type Runs = Arc<Mutex<Vec<JoinHandle<()>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawn one execution and remember its handle so shutdown can wait for it.
fn spawn_run(job: &Arc<dyn Job>, runs: &Runs, trigger: Trigger) {
    let job = Arc::clone(job);
    let handle = tokio::spawn(async move { job.execute(trigger).await });

    let mut runs = lock(runs);
    runs.retain(|h| !h.is_finished());
    runs.push(handle);
}

struct Timer {
    handle: JoinHandle<()>,
    period: Duration,
}

/// Owns at most one active timer.
///
/// Every firing runs as its own task, so cancelling the timer never cancels a
/// run already in progress.
pub struct Scheduler {
    job: Arc<dyn Job>,
    settings: Arc<dyn SettingsSource>,
    timer: Mutex<Option<Timer>>,
    runs: Runs,
}

impl Scheduler {
    pub fn new(job: Arc<dyn Job>, settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            job,
            settings,
            timer: Mutex::new(None),
            runs: Arc::default(),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<Timer>> {
        lock(&self.timer)
    }

    /// Start the timer with the interval from current settings, replacing any
    /// active timer. The first firing happens one period from now.
    pub fn start(&self) -> Result<Duration, ConfigError> {
        let period = self.settings.load()?.effective_interval().max(MIN_PERIOD);

        let job = Arc::clone(&self.job);
        let runs = Arc::clone(&self.runs);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                debug!("Timer fired");
                spawn_run(&job, &runs, Trigger::Scheduled);
            }
        });

        if let Some(previous) = self.timer().replace(Timer { handle, period }) {
            previous.handle.abort();
        }

        info!("Scheduler started with a {}s interval", period.as_secs());
        Ok(period)
    }

    /// Cancel the active timer. Returns whether there was one.
    pub fn stop(&self) -> bool {
        match self.timer().take() {
            Some(timer) => {
                timer.handle.abort();
                info!("Scheduler stopped");
                true
            }
            None => false,
        }
    }

    /// Stop, start again with fresh settings, then run once right away.
    pub fn restart(&self) -> Result<Duration, ConfigError> {
        self.stop();
        let period = self.start()?;
        self.run_now(Trigger::Scheduled);
        Ok(period)
    }

    /// Fire the job outside the timer.
    pub fn run_now(&self, trigger: Trigger) {
        spawn_run(&self.job, &self.runs, trigger);
    }

    pub fn is_active(&self) -> bool {
        self.timer()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Period of the active timer, if any.
    pub fn interval(&self) -> Option<Duration> {
        self.timer().as_ref().map(|t| t.period)
    }

    /// Stop the timer and wait for every spawned run to finish.
    pub async fn shutdown(&self) {
        self.stop();
        loop {
            let pending = std::mem::take(&mut *lock(&self.runs));
            if pending.is_empty() {
                break;
            }
            debug!("Waiting for {} run(s) to finish", pending.len());
            for handle in pending {
                // A panicked run has already been reported by the runtime
                let _ = handle.await;
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer().take() {
            timer.handle.abort();
        }
    }
}
