//! # fanout-scheduler
//!
//! Recurring distributions. A [`Scheduler`] owns a registry of
//! [`ScheduleJob`](fanout_types::ScheduleJob)s; each active job runs on its
//! own tokio task and re-enters the distribution engine every interval.
//!
//! ## Modules
//!
//! - [`scheduler`] — Job registry and per-job run loop
//! - [`interval`] — `"<n> minutes|hours|days"` interval parsing
//! - [`clock`] — Wall clock that follows tokio's paused test time
//! - [`events`] — Broadcast of job lifecycle events

pub mod clock;
pub mod events;
pub mod interval;
pub mod scheduler;

pub use clock::Clock;
pub use events::{EventBus, ScheduleEvent};
pub use scheduler::{ScheduleConfig, Scheduler};

use fanout_engine::{EngineError, GatewayError};

/// Error types for scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Interval, fraction, holder limit or interval spec is malformed.
    #[error("invalid schedule config: {0}")]
    InvalidConfig(String),

    /// The holder snapshot for the asset is empty.
    #[error("no holders found for asset {0}")]
    NoHolders(String),

    /// Another active job already signs with this credential.
    #[error("credential {address} already used by active job {job}")]
    CredentialInUse {
        /// Signer address.
        address: String,
        /// The job holding it.
        job: String,
    },

    /// The signer cannot fund a run.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Balance or snapshot lookup failed during creation.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Convenience result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
