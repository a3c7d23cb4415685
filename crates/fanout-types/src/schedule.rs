//! Recurring distribution job snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::recipient::{Address, AssetId};

/// Identifier of a schedule job (16 hex characters).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

/// A recurring distribution registered with the scheduler.
///
/// Snapshots of this record are handed out by the scheduler; the live
/// record is only mutated by the scheduler itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleJob {
    /// Registry key.
    pub id: JobId,
    /// Asset whose holders receive each run.
    pub asset_id: AssetId,
    /// Maximum number of holders per run. `None` distributes to all.
    pub holder_limit: Option<usize>,
    /// Interval between runs in milliseconds.
    pub interval_ms: u64,
    /// Share of the post-reserve balance each run distributes.
    pub distribution_fraction: f64,
    /// Public address of the signing credential the job uses.
    pub credentials_ref: Address,
    /// Unix time in milliseconds of the next run.
    pub next_run_at: u64,
    /// Runs finished so far, successful or not.
    pub runs_completed: u64,
    /// Cleared when the job is stopped.
    pub active: bool,
}

impl ScheduleJob {
    /// Whether the job should fire at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.active && now_ms >= self.next_run_at
    }

    /// Record a finished run and re-arm the job relative to `now_ms`.
    pub fn record_run(&mut self, now_ms: u64) {
        self.runs_completed += 1;
        self.next_run_at = now_ms.saturating_add(self.interval_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ScheduleJob {
        ScheduleJob {
            id: JobId::from("0011223344556677"),
            asset_id: AssetId::new("mint").expect("asset"),
            holder_limit: Some(10),
            interval_ms: 60_000,
            distribution_fraction: 0.5,
            credentials_ref: Address::new("signer").expect("address"),
            next_run_at: 60_000,
            runs_completed: 0,
            active: true,
        }
    }

    #[test]
    fn test_is_due() {
        let j = job();
        assert!(!j.is_due(59_999));
        assert!(j.is_due(60_000));
        assert!(j.is_due(61_000));
    }

    #[test]
    fn test_inactive_never_due() {
        let mut j = job();
        j.active = false;
        assert!(!j.is_due(u64::MAX));
    }

    #[test]
    fn test_record_run() {
        let mut j = job();
        j.record_run(60_250);
        assert_eq!(j.runs_completed, 1);
        assert_eq!(j.next_run_at, 120_250);
    }
}
