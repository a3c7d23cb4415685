//! In-memory ledger for v1.
//!
//! Balances are kept in a map keyed by address. A transfer set is applied
//! all-or-nothing: the signer must cover every transfer plus the flat
//! per-set fee, otherwise the whole set is rejected and no balance moves.
//!
//! The returned signature is the signer's Ed25519 signature over a BLAKE3
//! digest of the set, base58-encoded, so it is unique per submission and
//! verifiable against the signer address.
//!
//! Failure injection ([`fail_next`](StubLedger::fail_next),
//! [`set_unavailable`](StubLedger::set_unavailable)) exists for exercising
//! the retry and partial-failure paths.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use fanout_crypto::blake3::{self, contexts};
use fanout_crypto::Credentials;
use fanout_engine::{GatewayError, LedgerGateway, Transfer};
use fanout_types::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{LedgerError, Result};

/// Default fee charged per transfer set, in units.
pub const DEFAULT_FEE_UNITS: u64 = 5_000;

/// A transfer set the stub accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedSet {
    /// Base58 signature returned to the submitter.
    pub signature: String,
    /// Signing address.
    pub signer: Address,
    /// Instructions in submission order.
    pub transfers: Vec<Transfer>,
    /// Fee debited from the signer.
    pub fee_units: u64,
}

/// Initial balances loaded from a TOML file.
///
/// ```toml
/// [balances]
/// "9xQe...address" = 5000000000
/// ```
#[derive(Debug, Default, Deserialize)]
struct Genesis {
    #[serde(default)]
    balances: HashMap<String, u64>,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<Address, u64>,
    history: Vec<SubmittedSet>,
    injected: VecDeque<GatewayError>,
    unavailable: bool,
}

/// An in-memory ledger implementing [`LedgerGateway`].
#[derive(Debug)]
pub struct StubLedger {
    fee_units: u64,
    state: Mutex<LedgerState>,
}

impl StubLedger {
    /// Create an empty ledger with the default per-set fee.
    pub fn new() -> Self {
        Self::with_fee(DEFAULT_FEE_UNITS)
    }

    /// Create an empty ledger with a custom per-set fee.
    pub fn with_fee(fee_units: u64) -> Self {
        Self {
            fee_units,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Create a ledger seeded from a genesis TOML file.
    pub fn from_genesis_file(path: &Path, fee_units: u64) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let genesis: Genesis = toml::from_str(&contents)?;

        let mut balances = HashMap::with_capacity(genesis.balances.len());
        for (raw, units) in genesis.balances {
            let address = Address::from(raw);
            fanout_crypto::address::validate(&address).map_err(|e| {
                LedgerError::InvalidAddress {
                    address: address.to_string(),
                    reason: e.to_string(),
                }
            })?;
            balances.insert(address, units);
        }

        tracing::info!(
            accounts = balances.len(),
            path = %path.display(),
            "stub ledger seeded from genesis"
        );

        Ok(Self {
            fee_units,
            state: Mutex::new(LedgerState {
                balances,
                ..LedgerState::default()
            }),
        })
    }

    /// Per-set fee in units.
    pub fn fee_units(&self) -> u64 {
        self.fee_units
    }

    /// Credit `units` to `owner` (development/testing only).
    pub async fn fund(&self, owner: &Address, units: u64) {
        let mut state = self.state.lock().await;
        let balance = state.balances.entry(owner.clone()).or_insert(0);
        *balance = balance.saturating_add(units);
        tracing::warn!(%owner, units, "stub ledger: account funded (dev only)");
    }

    /// Current balance of `owner`, zero when unknown.
    pub async fn balance_of(&self, owner: &Address) -> u64 {
        self.state
            .lock()
            .await
            .balances
            .get(owner)
            .copied()
            .unwrap_or(0)
    }

    /// Fail the next submission with `error`. Queued failures are consumed
    /// in order, one per submission.
    pub async fn fail_next(&self, error: GatewayError) {
        self.state.lock().await.injected.push_back(error);
    }

    /// Make every call fail with [`GatewayError::Unavailable`] until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Every accepted transfer set, oldest first.
    pub async fn history(&self) -> Vec<SubmittedSet> {
        self.state.lock().await.history.clone()
    }

    fn digest(signer: &Address, sequence: u64, transfers: &[Transfer]) -> [u8; 32] {
        let sequence = sequence.to_le_bytes();
        let amounts: Vec<[u8; 8]> = transfers.iter().map(|t| t.units.to_le_bytes()).collect();

        let mut fields: Vec<&[u8]> = Vec::with_capacity(2 + transfers.len() * 2);
        fields.push(signer.as_str().as_bytes());
        fields.push(&sequence);
        for (transfer, amount) in transfers.iter().zip(&amounts) {
            fields.push(transfer.recipient.as_str().as_bytes());
            fields.push(amount);
        }

        blake3::derive_key(
            contexts::TRANSFER_SET_DIGEST,
            &blake3::encode_multi_field(&fields),
        )
    }
}

impl Default for StubLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerGateway for StubLedger {
    async fn balance(&self, owner: &Address) -> std::result::Result<u64, GatewayError> {
        let state = self.state.lock().await;
        if state.unavailable {
            return Err(GatewayError::Unavailable("stub ledger offline".to_string()));
        }
        Ok(state.balances.get(owner).copied().unwrap_or(0))
    }

    async fn submit_transfer_set(
        &self,
        signer: &Credentials,
        transfers: &[Transfer],
    ) -> std::result::Result<String, GatewayError> {
        let mut state = self.state.lock().await;

        if let Some(error) = state.injected.pop_front() {
            tracing::debug!(%error, "stub ledger: injected failure");
            return Err(error);
        }
        if state.unavailable {
            return Err(GatewayError::Unavailable("stub ledger offline".to_string()));
        }
        if transfers.is_empty() {
            return Err(GatewayError::Rejected("empty transfer set".to_string()));
        }
        for transfer in transfers {
            if let Err(e) = fanout_crypto::address::validate(&transfer.recipient) {
                return Err(GatewayError::Rejected(format!(
                    "invalid recipient {}: {e}",
                    transfer.recipient
                )));
            }
        }

        let total = transfers
            .iter()
            .try_fold(self.fee_units, |acc, t| acc.checked_add(t.units))
            .ok_or_else(|| GatewayError::Rejected("transfer total overflows".to_string()))?;

        let from = signer.address();
        let available = state.balances.get(from).copied().unwrap_or(0);
        if available < total {
            return Err(GatewayError::Rejected(format!(
                "insufficient funds: need {total} units, have {available}"
            )));
        }

        state.balances.insert(from.clone(), available - total);
        for transfer in transfers {
            let balance = state.balances.entry(transfer.recipient.clone()).or_insert(0);
            *balance = balance.saturating_add(transfer.units);
        }

        let sequence = state.history.len() as u64;
        let digest = Self::digest(from, sequence, transfers);
        let signature = signer.sign(&digest).to_base58();

        tracing::debug!(
            signer = %from,
            transfers = transfers.len(),
            total,
            %signature,
            "stub ledger: transfer set applied"
        );

        state.history.push(SubmittedSet {
            signature: signature.clone(),
            signer: from.clone(),
            transfers: transfers.to_vec(),
            fee_units: self.fee_units,
        });

        Ok(signature)
    }
}
