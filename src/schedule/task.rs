//! Periodic task runtime
//!
//! Each monitor runs on its own tokio task driven by an interval timer.
//! Ticks within one task are strictly serialized; a tick that overruns the
//! interval delays (effectively skips) the next fire. Stop is a cooperative
//! request: it ends the wait loop but never interrupts an in-flight job body.

use super::{QuietHours, Schedule};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A job body invoked on each eligible tick.
#[async_trait]
pub trait Job: Send + 'static {
    /// Task name for logs
    fn name(&self) -> &str;

    /// One tick's work. Errors are logged and do not stop the task.
    async fn run(&mut self) -> anyhow::Result<()>;
}

/// Handle to a running periodic task.
///
/// Dropping the handle does not stop the task; call [`TaskHandle::stop`].
pub struct TaskHandle {
    name: String,
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request termination. Non-blocking; the current tick (if any) finishes.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Wait for the task loop to exit.
    pub async fn join(self) {
        let _ = self.join.await;
    }
}

/// Periodic scheduling kernel: owns the timer, the stop signal, and the
/// quiet-hours gate around the job body.
pub struct PeriodicTask;

impl PeriodicTask {
    /// Spawn `job` on its own tokio task, ticking every `schedule.interval`.
    pub fn spawn<J: Job>(schedule: Schedule, mut job: J) -> TaskHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let name = job.name().to_string();
        let task_name = name.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(schedule.interval);
            // First fire is immediate; ticks never pile up behind a slow body.
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let mut last_run = None;

            tracing::info!(
                task = %task_name,
                interval_secs = schedule.interval.as_secs(),
                "periodic task started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        if !schedule.quiet_hours.should_run(now, last_run, schedule.interval) {
                            tracing::debug!(task = %task_name, "tick skipped by quiet hours");
                            continue;
                        }

                        // Recorded before the body so throttle spacing is
                        // measured from run start even when the body is slow.
                        last_run = Some(now);

                        if let Err(e) = job.run().await {
                            tracing::warn!(task = %task_name, error = %e, "tick failed");
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            tracing::info!(task = %task_name, "periodic task stopped");
                            break;
                        }
                    }
                }
            }
        });

        TaskHandle {
            name,
            stop_tx,
            join,
        }
    }
}

/// Clamp a configured interval to a per-job floor.
///
/// Zero means "unset" in config; each job type supplies its own sane default
/// (60s for price jobs, 3600s for floor/prediction jobs, and so on).
pub fn interval_or_default(configured_secs: u64, default: Duration) -> Duration {
    if configured_secs == 0 {
        default
    } else {
        Duration::from_secs(configured_secs)
    }
}

impl Schedule {
    /// Schedule with the configured interval, falling back to `default` when
    /// the configured value is zero.
    pub fn new(configured_secs: u64, default: Duration, quiet_hours: QuietHours) -> Self {
        Self {
            interval: interval_or_default(configured_secs, default),
            quiet_hours,
        }
    }
}
