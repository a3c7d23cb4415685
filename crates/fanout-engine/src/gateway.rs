//! Collaborator traits for the ledger and the holder snapshot.
//!
//! The engine never talks to the network itself. Callers supply a
//! [`LedgerGateway`] for balances and transfer submission, and a
//! [`HolderSnapshot`] for the ranked holder list of an asset. This keeps
//! the distribution logic testable without a live ledger.

use std::future::Future;
use std::time::Duration;

use fanout_crypto::Credentials;
use fanout_types::{Address, AssetId, Holder};
use serde::{Deserialize, Serialize};

/// One transfer instruction inside an atomic transfer set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Receiving address.
    pub recipient: Address,
    /// Amount in units.
    pub units: u64,
}

/// Errors reported by the ledger or snapshot collaborators.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The gateway could not be reached; nothing was submitted.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The ledger rejected the transfer set.
    #[error("transfer set rejected: {0}")]
    Rejected(String),

    /// The transfer set was sent but not confirmed in time.
    #[error("confirmation timed out after {0:?}")]
    ConfirmationTimeout(Duration),

    /// The snapshot provider does not know the asset.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),
}

impl GatewayError {
    /// Whether resubmitting cannot double-pay.
    ///
    /// Only failures before the ledger accepted the set qualify; a
    /// rejected or unconfirmed set is never resubmitted.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

/// Ledger access consumed by the engine.
pub trait LedgerGateway: Send + Sync {
    /// Current balance of `owner` in units.
    fn balance(
        &self,
        owner: &Address,
    ) -> impl Future<Output = Result<u64, GatewayError>> + Send;

    /// Submit `transfers` as one atomic set signed by `signer` and wait for
    /// confirmation. Returns the ledger signature of the set.
    fn submit_transfer_set(
        &self,
        signer: &Credentials,
        transfers: &[Transfer],
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}

/// Ranked holder snapshot consumed by the engine and the scheduler.
pub trait HolderSnapshot: Send + Sync {
    /// Holders of `asset` ordered by weight descending, weight > 0 only,
    /// truncated to `limit` entries when given.
    fn holders(
        &self,
        asset: &AssetId,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Holder>, GatewayError>> + Send;
}
