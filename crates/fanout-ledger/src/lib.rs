//! # fanout-ledger
//!
//! Ledger and holder-snapshot collaborators for the distribution engine.
//!
//! The v1 ledger is an in-memory stub: balances live in a map, transfer
//! sets are applied atomically and signed with the submitter's key. It
//! lets the whole pipeline run without a network connection.
//!
//! ## Modules
//!
//! - [`stub`] — In-memory ledger implementing `LedgerGateway`
//! - [`snapshot`] — Static and TOML-file holder snapshots

pub mod snapshot;
pub mod stub;

pub use snapshot::{FileSnapshot, StaticSnapshot};
pub use stub::StubLedger;

/// Error types for loading ledger fixtures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Snapshot or genesis file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents are not valid TOML for the expected layout.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// An address in a fixture file failed validation.
    #[error("invalid address {address}: {reason}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Convenience result type for ledger fixtures.
pub type Result<T> = std::result::Result<T, LedgerError>;
