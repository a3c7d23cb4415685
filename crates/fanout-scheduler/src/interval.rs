//! Interval specs.
//!
//! Schedules are entered as a count and a unit, e.g. `"30 minutes"`,
//! `"6 hours"` or `"1 day"`. Abbreviations `m`, `min`, `h`, `hr`, `d` are
//! accepted; the count may also be glued to the unit (`"6h"`).

use crate::{Result, SchedulerError};

const MINUTE_MS: u64 = 60 * 1_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Unit of a schedule interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl IntervalUnit {
    /// Milliseconds in one unit.
    pub fn millis(self) -> u64 {
        match self {
            IntervalUnit::Minutes => MINUTE_MS,
            IntervalUnit::Hours => HOUR_MS,
            IntervalUnit::Days => DAY_MS,
        }
    }

    /// Parse a unit name, singular, plural or abbreviated.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "m" | "min" | "mins" | "minute" | "minutes" => Some(IntervalUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(IntervalUnit::Hours),
            "d" | "day" | "days" => Some(IntervalUnit::Days),
            _ => None,
        }
    }
}

/// Interval in milliseconds for `count` units.
pub fn to_millis(count: u64, unit: IntervalUnit) -> Result<u64> {
    if count == 0 {
        return Err(SchedulerError::InvalidConfig(
            "interval must be positive".to_string(),
        ));
    }
    count
        .checked_mul(unit.millis())
        .ok_or_else(|| SchedulerError::InvalidConfig("interval too large".to_string()))
}

/// Parse an interval spec into milliseconds.
///
/// # Errors
///
/// - [`SchedulerError::InvalidConfig`] for a missing or zero count, an
///   unknown unit, or an overflowing interval
pub fn parse_interval(spec: &str) -> Result<u64> {
    let spec = spec.trim();
    let split = spec
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(spec.len());
    let (count, unit) = spec.split_at(split);

    let count: u64 = count
        .parse()
        .map_err(|_| SchedulerError::InvalidConfig(format!("missing interval count in {spec:?}")))?;
    let unit = IntervalUnit::parse(unit)
        .ok_or_else(|| SchedulerError::InvalidConfig(format!("unknown interval unit in {spec:?}")))?;
    to_millis(count, unit)
}

/// Human-readable form of an interval, using the largest whole unit.
pub fn format_interval(ms: u64) -> String {
    let (count, unit) = if ms >= DAY_MS && ms % DAY_MS == 0 {
        (ms / DAY_MS, "day")
    } else if ms >= HOUR_MS && ms % HOUR_MS == 0 {
        (ms / HOUR_MS, "hour")
    } else if ms >= MINUTE_MS && ms % MINUTE_MS == 0 {
        (ms / MINUTE_MS, "minute")
    } else {
        return format!("{ms} ms");
    };
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}
