//! Per-batch outcomes and the aggregated distribution report.

use serde::{Deserialize, Serialize};

/// Result of submitting one batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    /// The transfer set was confirmed.
    Success {
        /// Ledger signature of the confirmed transfer set.
        signature: String,
    },
    /// Submission or confirmation failed.
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
    /// Nothing in the batch was transferable; no submission was made.
    Skipped,
}

/// Outcome of one batch submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// Zero-based batch position within the run.
    pub batch_index: usize,
    /// What happened to the batch.
    pub status: BatchStatus,
    /// Number of transfer instructions in the submitted set.
    pub recipients_included: usize,
    /// Units carried by those instructions.
    pub units_transferred: u64,
    /// Submission attempts made (0 for skipped batches).
    pub attempts: u32,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, BatchStatus::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, BatchStatus::Failed { .. })
    }
}

/// Overall verdict of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// At least one batch succeeded and none failed.
    Complete,
    /// Some batches succeeded, some failed.
    Partial,
    /// No batch succeeded.
    Failed,
    /// The confirmation gate was declined before any submission.
    Cancelled,
}

/// Aggregate of all batch outcomes for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReport {
    /// Outcomes in batch order.
    pub outcomes: Vec<SubmissionOutcome>,
    /// Units the run set out to distribute.
    pub spendable_units: u64,
    /// Whether the run was declined at the confirmation gate.
    pub cancelled: bool,
}

impl DistributionReport {
    /// A report for a run declined at the confirmation gate.
    pub fn cancelled(spendable_units: u64) -> Self {
        Self {
            outcomes: Vec::new(),
            spendable_units,
            cancelled: true,
        }
    }

    pub fn successful_batches(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed_batches(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn skipped_batches(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BatchStatus::Skipped))
            .count()
    }

    /// Recipients that received funds in confirmed batches.
    pub fn recipients_paid(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.recipients_included)
            .sum()
    }

    /// Units moved by confirmed batches.
    pub fn units_transferred(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.units_transferred)
            .sum()
    }

    /// Overall run status. A run is failed only when no batch succeeded.
    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            return RunStatus::Cancelled;
        }
        match (self.successful_batches(), self.failed_batches()) {
            (0, _) => RunStatus::Failed,
            (_, 0) => RunStatus::Complete,
            _ => RunStatus::Partial,
        }
    }
}
