// Per-job dispatch loops
//
// One long-lived task per wall-clock job, one per (job, initial delay)
// pair for interval jobs. Loops share nothing but the read-only job spec
// and the dispatcher; a failure in one never reaches another. The
// wall-clock loop is an explicit state machine so tests can assert on
// transitions instead of wall-clock sleeps.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::dispatch::Dispatcher;
use crate::models::{JobSpec, TimeOfDay, TriggerPolicy};
use crate::resolver;

/// Delay before restarting a loop task that panicked
const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Loop behavior knobs shared by every dispatch loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Fixed backoff after a transport-level dispatch failure or a
    /// failed occurrence resolution
    pub retry_backoff: Duration,
    /// Whether a non-2xx response re-enters the retry path. Off by
    /// default: a received response counts as a completed firing and the
    /// loop waits for the next scheduled occurrence.
    pub retry_non_success: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_secs(60),
            retry_non_success: false,
        }
    }
}

/// States of the wall-clock dispatch loop. No terminal state: the loop
/// runs until the process exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// About to compute the next occurrence
    Idle,
    /// Wake-up scheduled at `fire_at`
    Waiting {
        fire_at: DateTime<Utc>,
        label: TimeOfDay,
    },
    /// Woke up, about to dispatch
    Firing { label: TimeOfDay },
    /// Sleeping the fixed backoff before recomputing
    Retrying,
}

/// Dispatch loop for a job with a DailyTimes trigger
pub struct WallClockLoop {
    job: JobSpec,
    times: Vec<TimeOfDay>,
    tz: Tz,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn Dispatcher>,
    config: LoopConfig,
}

impl WallClockLoop {
    pub fn new(
        job: JobSpec,
        times: Vec<TimeOfDay>,
        tz: Tz,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn Dispatcher>,
        config: LoopConfig,
    ) -> Self {
        Self {
            job,
            times,
            tz,
            clock,
            dispatcher,
            config,
        }
    }

    /// Perform exactly one state transition
    pub async fn step(&self, state: LoopState) -> LoopState {
        match state {
            LoopState::Idle => {
                let now = self.clock.now();
                match resolver::next_occurrence(now, &self.times, self.tz) {
                    Ok((fire_at, label)) => {
                        let remaining = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
                        info!(
                            endpoint = %self.job.endpoint,
                            fire_at = %fire_at.with_timezone(&self.tz).to_rfc3339(),
                            remaining_seconds = remaining.as_secs(),
                            label = %label,
                            "Next occurrence scheduled"
                        );
                        LoopState::Waiting { fire_at, label }
                    }
                    Err(e) => {
                        warn!(
                            endpoint = %self.job.endpoint,
                            error = %e,
                            "Failed to compute next occurrence, backing off"
                        );
                        LoopState::Retrying
                    }
                }
            }

            LoopState::Waiting { fire_at, label } => {
                let now = self.clock.now();
                // Negative remaining means the wake-up is already due
                let remaining = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
                if !remaining.is_zero() {
                    self.clock.sleep(remaining).await;
                }
                LoopState::Firing { label }
            }

            LoopState::Firing { label } => match self.dispatcher.dispatch(&self.job).await {
                Ok(event) => {
                    if event.is_success() {
                        info!(
                            endpoint = %event.endpoint,
                            status = event.status.as_u16(),
                            label = %label,
                            "Dispatch completed"
                        );
                        LoopState::Idle
                    } else {
                        warn!(
                            endpoint = %event.endpoint,
                            status = event.status.as_u16(),
                            label = %label,
                            "Dispatch completed with non-success status"
                        );
                        if self.config.retry_non_success {
                            LoopState::Retrying
                        } else {
                            LoopState::Idle
                        }
                    }
                }
                Err(e) => {
                    error!(
                        endpoint = %self.job.endpoint,
                        error = %e,
                        "Dispatch failed, backing off"
                    );
                    LoopState::Retrying
                }
            },

            LoopState::Retrying => {
                self.clock.sleep(self.config.retry_backoff).await;
                LoopState::Idle
            }
        }
    }

    /// Fold `step` forever
    pub async fn run(self) {
        let mut state = LoopState::Idle;
        loop {
            state = self.step(state).await;
        }
    }
}

/// One sub-loop of an IntervalWithOffsets job: sleep the initial delay,
/// then fire and sleep the interval, forever. Transport failures and
/// non-success statuses both log and proceed to the same interval sleep.
pub struct IntervalLoop {
    job: JobSpec,
    initial_delay: Duration,
    interval: Duration,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl IntervalLoop {
    pub fn new(
        job: JobSpec,
        initial_delay: Duration,
        interval: Duration,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            job,
            initial_delay,
            interval,
            clock,
            dispatcher,
        }
    }

    /// One dispatch cycle, outcome logged, never propagated
    pub async fn fire_once(&self) {
        match self.dispatcher.dispatch(&self.job).await {
            Ok(event) => {
                if event.is_success() {
                    info!(
                        endpoint = %event.endpoint,
                        status = event.status.as_u16(),
                        "Dispatch completed"
                    );
                } else {
                    warn!(
                        endpoint = %event.endpoint,
                        status = event.status.as_u16(),
                        "Dispatch completed with non-success status"
                    );
                }
            }
            Err(e) => {
                error!(
                    endpoint = %self.job.endpoint,
                    error = %e,
                    "Dispatch failed, will retry next interval"
                );
            }
        }
    }

    pub async fn run(self) {
        self.clock.sleep(self.initial_delay).await;
        loop {
            self.fire_once().await;
            self.clock.sleep(self.interval).await;
        }
    }
}

/// Spawn a loop under a watchdog: a panicked loop is logged and
/// restarted after a short delay instead of silently dying.
pub fn spawn_supervised<F, Fut>(name: String, factory: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match tokio::spawn(factory()).await {
                Ok(()) => {
                    // Loops never return; treat it like a fault
                    warn!(task = %name, "Dispatch loop returned unexpectedly, restarting");
                }
                Err(e) if e.is_panic() => {
                    error!(task = %name, "Dispatch loop panicked, restarting");
                }
                Err(_) => return, // cancelled during shutdown
            }
            tokio::time::sleep(RESTART_DELAY).await;
        }
    })
}

/// Launch every loop for the given registry. Returns one handle per
/// spawned watchdog; callers hold them for the life of the process.
pub fn spawn_all(
    jobs: &[JobSpec],
    tz: Tz,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn Dispatcher>,
    config: &LoopConfig,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    for job in jobs {
        match &job.trigger {
            TriggerPolicy::DailyTimes { times } => {
                let name = format!("daily:{}", job.endpoint);
                let job = job.clone();
                let times = times.clone();
                let clock = Arc::clone(&clock);
                let dispatcher = Arc::clone(&dispatcher);
                let config = config.clone();
                info!(
                    endpoint = %job.endpoint,
                    times = %times.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
                    zone = %tz,
                    "Starting wall-clock dispatch loop"
                );
                handles.push(spawn_supervised(name, move || {
                    WallClockLoop::new(
                        job.clone(),
                        times.clone(),
                        tz,
                        Arc::clone(&clock),
                        Arc::clone(&dispatcher),
                        config.clone(),
                    )
                    .run()
                }));
            }

            TriggerPolicy::IntervalWithOffsets {
                initial_delays,
                interval,
            } => {
                for (idx, delay) in initial_delays.iter().enumerate() {
                    let name = format!("interval:{}:{}", job.endpoint, idx);
                    let job = job.clone();
                    let delay = *delay;
                    let interval = *interval;
                    let clock = Arc::clone(&clock);
                    let dispatcher = Arc::clone(&dispatcher);
                    info!(
                        endpoint = %job.endpoint,
                        initial_delay_seconds = delay.as_secs(),
                        interval_seconds = interval.as_secs(),
                        "Starting interval dispatch loop"
                    );
                    handles.push(spawn_supervised(name, move || {
                        IntervalLoop::new(
                            job.clone(),
                            delay,
                            interval,
                            Arc::clone(&clock),
                            Arc::clone(&dispatcher),
                        )
                        .run()
                    }));
                }
            }
        }
    }

    handles
}
