//! Display formatting helpers
//!
//! All alert timestamps render in fixed UTC+8, matching the quiet-hours
//! evaluation zone.

use crate::schedule::quiet_hours::fixed_offset;
use chrono::{DateTime, Utc};

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS` in UTC+8.
pub fn display_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&fixed_offset())
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Adaptive price precision: two decimals at or above 1, four below.
pub fn price(value: f64) -> String {
    if value >= 1.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.4}", value)
    }
}

/// Display time plus a coarse "how long ago" suffix for recent instants.
pub fn relative_time(t: DateTime<Utc>) -> String {
    let base = display_time(t);
    let elapsed = Utc::now() - t;

    if elapsed < chrono::Duration::zero() {
        return base;
    }
    if elapsed < chrono::Duration::minutes(1) {
        format!("{} ({} s ago)", base, elapsed.num_seconds())
    } else if elapsed < chrono::Duration::hours(1) {
        format!("{} ({} min ago)", base, elapsed.num_minutes())
    } else if elapsed < chrono::Duration::hours(24) {
        format!("{} ({} hours ago)", base, elapsed.num_hours())
    } else {
        base
    }
}

/// Abbreviate a liquidity figure: `1.23B(1234567890)`.
pub fn liquidity(value: f64) -> String {
    let abbrev = if value >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{:.2}", value)
    };
    format!("{}({:.0})", abbrev, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn price_precision_switches_at_one() {
        assert_eq!(price(1234.5678), "1234.57");
        assert_eq!(price(1.0), "1.00");
        assert_eq!(price(0.12345), "0.1235");
        assert_eq!(price(0.0001), "0.0001");
    }

    #[test]
    fn display_time_is_utc_plus_8() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 16, 0, 0).unwrap();
        assert_eq!(display_time(t), "2025-06-02 00:00:00");
    }

    #[test]
    fn liquidity_abbreviations() {
        assert_eq!(liquidity(2_500_000_000.0), "2.50B(2500000000)");
        assert_eq!(liquidity(3_400_000.0), "3.40M(3400000)");
        assert_eq!(liquidity(12_000.0), "12.00K(12000)");
        assert_eq!(liquidity(950.0), "950.00(950)");
    }

    #[test]
    fn relative_time_recent() {
        let t = Utc::now() - chrono::Duration::seconds(30);
        assert!(relative_time(t).contains("s ago"));
        let t = Utc::now() - chrono::Duration::minutes(5);
        assert!(relative_time(t).contains("min ago"));
        let t = Utc::now() - chrono::Duration::days(2);
        assert!(!relative_time(t).contains("ago"));
    }
}
