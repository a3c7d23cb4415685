//! Holder and recipient types.
//!
//! A [`Holder`] is what the snapshot provider returns: an owner and the
//! weight it carries. A [`Recipient`] is a holder after the allocation
//! calculator has assigned it a share of the budget.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError, UNITS_PER_WHOLE};

/// A base58 ledger address.
///
/// Construction only checks the string is non-empty; decoding into key
/// bytes happens in `fanout-crypto`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap a trimmed address string.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty("address"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `n` characters, for compact log lines.
    pub fn short(&self, n: usize) -> &str {
        match self.0.char_indices().nth(n) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl From<String> for Address {
    /// Wrap an already-encoded address without trimming.
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the fungible asset whose holders drive a distribution.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Wrap a trimmed asset identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty("asset id"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AssetId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a holder snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holder {
    /// Owning address.
    pub owner: Address,
    /// Token balance (or assigned percentage in explicit mode).
    pub weight: f64,
}

impl Holder {
    pub fn new(owner: Address, weight: f64) -> Self {
        Self { owner, weight }
    }
}

/// A holder with its computed allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Owning address. Identity of the recipient.
    pub owner: Address,
    /// Input weight.
    pub weight: f64,
    /// Allocation in whole currency.
    pub allocated_amount: f64,
    /// Allocation in smallest units, `floor(allocated_amount * UNITS_PER_WHOLE)`.
    pub allocated_units: u64,
}

impl Recipient {
    /// A recipient with no allocation yet.
    pub fn unallocated(owner: Address, weight: f64) -> Self {
        Self {
            owner,
            weight,
            allocated_amount: 0.0,
            allocated_units: 0,
        }
    }

    /// Set the allocation from a unit amount.
    ///
    /// The whole-currency amount is the smallest `f64` whose floored unit
    /// value equals `units` exactly, so the two fields never disagree for
    /// amounts an `f64` can resolve to the unit.
    pub fn set_allocation(&mut self, units: u64) {
        self.allocated_units = units;
        self.allocated_amount = amount_for_units(units);
    }

    /// Whether the allocation is below the given dust threshold.
    pub fn is_dust(&self, threshold: u64) -> bool {
        self.allocated_units < threshold
    }
}

/// Adjustment steps tried before settling on the nearest amount.
const MAX_AMOUNT_STEPS: usize = 16;

fn amount_for_units(units: u64) -> f64 {
    let scale = UNITS_PER_WHOLE as f64;
    let mut amount = units as f64 / scale;
    for _ in 0..MAX_AMOUNT_STEPS {
        let back = (amount * scale).floor() as u64;
        match back.cmp(&units) {
            Ordering::Equal => break,
            Ordering::Less => amount = f64::from_bits(amount.to_bits() + 1),
            Ordering::Greater => amount = f64::from_bits(amount.to_bits() - 1),
        }
    }
    amount
}

impl From<Holder> for Recipient {
    fn from(holder: Holder) -> Self {
        Self::unallocated(holder.owner, holder.weight)
    }
}
