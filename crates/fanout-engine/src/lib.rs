//! # fanout-engine
//!
//! The distribution engine: turns a spendable balance and a weighted
//! recipient list into proportional transfers, packs them into
//! capacity-bounded batches, and submits the batches one at a time
//! through a [`LedgerGateway`](gateway::LedgerGateway).
//!
//! ```text
//! Validate -> Allocate -> Partition -> ConfirmIfLarge -> SubmitBatches -> Report
//! ```
//!
//! ## Modules
//!
//! - [`allocation`] — Proportional and explicit-percentage allocation
//! - [`partition`] — Batch partitioning under the per-transaction cap
//! - [`submitter`] — Per-batch submission with retry and pacing
//! - [`coordinator`] — The end-to-end distribution run
//! - [`gateway`] — Ledger and holder-snapshot collaborator traits
//! - [`stats`] — Holder concentration statistics
//! - [`config`] — Engine tuning parameters

pub mod allocation;
pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod partition;
pub mod stats;
pub mod submitter;

pub use config::EngineConfig;
pub use coordinator::{ConfirmationGate, Coordinator, DistributionRequest, RunOrigin, Unattended};
pub use gateway::{GatewayError, HolderSnapshot, LedgerGateway, Transfer};

/// Error types for a distribution run.
///
/// Every variant aborts the run before any batch is submitted. Failures of
/// individual batches are recorded in the report instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed input: bad percentage, weight, fraction or batch size.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Empty recipient list or zero total weight.
    #[error("no eligible recipients")]
    NoEligibleRecipients,

    /// Nothing left to distribute after the fee reserve.
    #[error("insufficient budget: balance {balance_units} units, reserve {reserve_units} units")]
    InsufficientBudget {
        /// Signer balance in units.
        balance_units: u64,
        /// Units held back for fees.
        reserve_units: u64,
    },

    /// The ledger could not be queried during validation.
    #[error("ledger gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl From<fanout_types::TypesError> for EngineError {
    fn from(e: fanout_types::TypesError) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
