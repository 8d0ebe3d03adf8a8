//! Quiet-hours policy
//!
//! Decides whether a scheduled task execution should run, pause, or be
//! throttled based on a configured wall-clock window. Hours are evaluated in
//! a fixed UTC+8 offset so behavior does not depend on the host timezone.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Display/evaluation timezone: fixed UTC+8.
pub fn fixed_offset() -> FixedOffset {
    // 8 * 3600 is always in range
    FixedOffset::east_opt(8 * 3600).unwrap()
}

/// What to do with ticks that land inside the quiet window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuietBehavior {
    /// Skip ticks entirely while inside the window
    #[default]
    Pause,
    /// Stretch the effective interval to `interval * throttle_multiplier`
    Throttle,
}

/// Quiet-hours window configuration, shared by every periodic task
#[derive(Debug, Clone, Deserialize)]
pub struct QuietHours {
    #[serde(default)]
    pub enabled: bool,
    /// Window start hour in UTC+8, `[0, 24)`
    #[serde(default)]
    pub start_hour: u32,
    /// Window end hour in UTC+8, `[0, 24)`; `start == end` disables the window
    #[serde(default)]
    pub end_hour: u32,
    #[serde(default)]
    pub behavior: QuietBehavior,
    /// Interval multiplier for [`QuietBehavior::Throttle`]
    #[serde(default)]
    pub throttle_multiplier: u32,
}

impl QuietHours {
    /// Always-run policy
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            start_hour: 0,
            end_hour: 0,
            behavior: QuietBehavior::Pause,
            throttle_multiplier: 0,
        }
    }

    /// Pause during `[start, end)` UTC+8
    pub fn pause(start_hour: u32, end_hour: u32) -> Self {
        Self {
            enabled: true,
            start_hour,
            end_hour,
            behavior: QuietBehavior::Pause,
            throttle_multiplier: 0,
        }
    }

    /// Throttle to `interval * multiplier` during `[start, end)` UTC+8
    pub fn throttle(start_hour: u32, end_hour: u32, multiplier: u32) -> Self {
        Self {
            enabled: true,
            start_hour,
            end_hour,
            behavior: QuietBehavior::Throttle,
            throttle_multiplier: multiplier,
        }
    }

    /// Whether `now` falls inside the quiet window.
    ///
    /// A window with `start < end` is the contiguous range `[start, end)`;
    /// `start > end` wraps through midnight; `start == end` never matches.
    fn in_window(&self, now: DateTime<Utc>) -> bool {
        let hour = now.with_timezone(&fixed_offset()).hour();
        if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else if self.start_hour > self.end_hour {
            hour >= self.start_hour || hour < self.end_hour
        } else {
            false
        }
    }

    /// Decide whether a tick at `now` should execute.
    ///
    /// `last_run` is the start time of the most recent executed tick (`None`
    /// before the first run, which counts as "long enough ago"). Pure so it
    /// can be tested by parameterizing `now` directly.
    pub fn should_run(
        &self,
        now: DateTime<Utc>,
        last_run: Option<DateTime<Utc>>,
        interval: Duration,
    ) -> bool {
        if !self.enabled {
            return true;
        }

        if !self.in_window(now) {
            return true;
        }

        match self.behavior {
            QuietBehavior::Pause => false,
            QuietBehavior::Throttle => {
                if self.throttle_multiplier <= 1 {
                    return true;
                }
                let stretched = interval * self.throttle_multiplier;
                match last_run {
                    None => true,
                    Some(last) => {
                        let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                        elapsed >= stretched
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Build a UTC instant whose UTC+8 wall-clock hour is `hour`.
    fn at_hour(hour: u32) -> DateTime<Utc> {
        fixed_offset()
            .with_ymd_and_hms(2025, 6, 1, hour, 30, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn disabled_always_runs() {
        let qh = QuietHours::disabled();
        for hour in 0..24 {
            assert!(qh.should_run(at_hour(hour), None, Duration::from_secs(60)));
        }
    }

    #[test]
    fn degenerate_window_always_runs() {
        let qh = QuietHours::pause(5, 5);
        for hour in 0..24 {
            assert!(qh.should_run(at_hour(hour), None, Duration::from_secs(60)));
        }
    }

    #[test]
    fn pause_inside_simple_window() {
        let qh = QuietHours::pause(0, 8);
        assert!(!qh.should_run(at_hour(0), None, Duration::from_secs(60)));
        assert!(!qh.should_run(at_hour(7), None, Duration::from_secs(60)));
        assert!(qh.should_run(at_hour(8), None, Duration::from_secs(60)));
        assert!(qh.should_run(at_hour(12), None, Duration::from_secs(60)));
    }

    #[test]
    fn wraparound_window() {
        let qh = QuietHours::pause(22, 6);
        assert!(!qh.should_run(at_hour(23), None, Duration::from_secs(60)));
        assert!(!qh.should_run(at_hour(2), None, Duration::from_secs(60)));
        assert!(qh.should_run(at_hour(10), None, Duration::from_secs(60)));
        assert!(qh.should_run(at_hour(6), None, Duration::from_secs(60)));
    }

    #[test]
    fn throttle_math_at_boundary() {
        let qh = QuietHours::throttle(0, 8, 5);
        let interval = Duration::from_secs(60);
        let now = at_hour(3);

        let last = now - chrono::Duration::seconds(299);
        assert!(!qh.should_run(now, Some(last), interval));

        let last = now - chrono::Duration::seconds(300);
        assert!(qh.should_run(now, Some(last), interval));
    }

    #[test]
    fn throttle_multiplier_of_one_runs_every_tick() {
        let qh = QuietHours::throttle(0, 8, 1);
        let now = at_hour(3);
        let last = now - chrono::Duration::seconds(1);
        assert!(qh.should_run(now, Some(last), Duration::from_secs(60)));
    }

    #[test]
    fn throttle_with_no_prior_run() {
        let qh = QuietHours::throttle(0, 8, 5);
        assert!(qh.should_run(at_hour(3), None, Duration::from_secs(60)));
    }

    #[test]
    fn throttle_outside_window_runs_normally() {
        let qh = QuietHours::throttle(0, 8, 5);
        let now = at_hour(12);
        let last = now - chrono::Duration::seconds(60);
        assert!(qh.should_run(now, Some(last), Duration::from_secs(60)));
    }
}
