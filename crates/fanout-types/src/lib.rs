//! # fanout-types
//!
//! Shared domain types used across the fanout workspace: recipients and
//! budgets consumed by the distribution engine, the outcome records it
//! produces, and the schedule job snapshots exposed by the scheduler.

pub mod budget;
pub mod recipient;
pub mod report;
pub mod schedule;

pub use budget::{Budget, FeeReserve};
pub use recipient::{Address, AssetId, Holder, Recipient};
pub use report::{BatchStatus, DistributionReport, RunStatus, SubmissionOutcome};
pub use schedule::{JobId, ScheduleJob};

/// Smallest currency units per whole unit (1 whole = 1,000,000,000 units).
pub const UNITS_PER_WHOLE: u64 = 1_000_000_000;

/// Maximum recipients per atomic transfer set.
///
/// Fixed by the per-transaction transfer instruction limit of the ledger.
pub const MAX_BATCH_SIZE: usize = 20;

/// Allocations below this many units are not worth a transfer instruction.
pub const DUST_THRESHOLD_UNITS: u64 = 1_000;

/// Interactive runs above this many recipients require confirmation.
pub const LARGE_FANOUT_THRESHOLD: usize = 100;

/// Default share of the post-reserve balance distributed per run.
pub const DEFAULT_DISTRIBUTION_FRACTION: f64 = 0.9;

/// Tolerance when checking that explicit percentages sum to 100.
pub const PERCENT_TOLERANCE: f64 = 0.01;

/// Convert a unit amount to whole currency for display.
pub fn units_to_whole(units: u64) -> f64 {
    units as f64 / UNITS_PER_WHOLE as f64
}

/// Error types for domain value construction.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// Distribution fraction outside `(0, 1]`.
    #[error("distribution fraction must be in (0, 1], got {0}")]
    InvalidFraction(f64),

    /// Empty identifier string.
    #[error("empty {0}")]
    Empty(&'static str),
}

/// Convenience result type for type construction.
pub type Result<T> = std::result::Result<T, TypesError>;
