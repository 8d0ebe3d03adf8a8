//! Scheduling kernel
//!
//! Drives many independent periodic jobs on independent intervals, with a
//! quiet-hours policy that can pause or throttle each job without drifting
//! its schedule.

pub mod quiet_hours;
mod task;

pub use quiet_hours::{QuietBehavior, QuietHours};
pub use task::{interval_or_default, Job, PeriodicTask, TaskHandle};

use std::time::Duration;

/// Immutable schedule owned by one periodic task
#[derive(Debug, Clone)]
pub struct Schedule {
    pub interval: Duration,
    pub quiet_hours: QuietHours,
}
