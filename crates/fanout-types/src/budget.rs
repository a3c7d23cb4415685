//! Distribution budget and fee reservation.
//!
//! ```text
//! spendable_units = floor(max(0, total_units - reserve_units) * distribution_fraction)
//! ```

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError, UNITS_PER_WHOLE};

/// Reserve per batch for holder distributions (0.01 whole).
pub const DEFAULT_PER_BATCH_RESERVE_UNITS: u64 = UNITS_PER_WHOLE / 100;

/// Flat reserve for manual distributions (0.001 whole).
pub const DEFAULT_FLAT_RESERVE_UNITS: u64 = UNITS_PER_WHOLE / 1_000;

/// How much of the balance is held back to pay transaction fees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeReserve {
    /// Fixed reserve regardless of batch count.
    pub flat_units: u64,
    /// Additional reserve per submitted batch.
    pub per_batch_units: u64,
}

impl FeeReserve {
    /// Reserve used for holder-snapshot distributions.
    pub const fn holder_distribution() -> Self {
        Self {
            flat_units: 0,
            per_batch_units: DEFAULT_PER_BATCH_RESERVE_UNITS,
        }
    }

    /// Reserve used for manually entered recipient lists.
    pub const fn manual() -> Self {
        Self {
            flat_units: DEFAULT_FLAT_RESERVE_UNITS,
            per_batch_units: 0,
        }
    }

    /// Total reserve for a run of `batch_count` batches.
    pub fn for_batches(&self, batch_count: usize) -> u64 {
        self.per_batch_units
            .saturating_mul(batch_count as u64)
            .saturating_add(self.flat_units)
    }
}

/// Fractions are applied in parts per billion.
const FRACTION_SCALE: u128 = 1_000_000_000;

/// The funds one distribution run may spend.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Current signer balance in units.
    pub total_units: u64,
    /// Units held back for fees.
    pub reserve_units: u64,
    /// Share of the post-reserve balance to distribute, in `(0, 1]`.
    pub distribution_fraction: f64,
}

impl Budget {
    /// Build a budget, rejecting fractions outside `(0, 1]`.
    pub fn new(total_units: u64, reserve_units: u64, distribution_fraction: f64) -> Result<Self> {
        validate_fraction(distribution_fraction)?;
        Ok(Self {
            total_units,
            reserve_units,
            distribution_fraction,
        })
    }

    /// Units available to recipients after reserve and fraction.
    ///
    /// The fraction is applied as parts per billion in `u128`, so the
    /// result is exact at any balance.
    pub fn spendable_units(&self) -> u64 {
        let available = self.total_units.saturating_sub(self.reserve_units);
        let ppb = (self.distribution_fraction * FRACTION_SCALE as f64).round() as u128;
        let spendable = u128::from(available) * ppb / FRACTION_SCALE;
        // ppb <= FRACTION_SCALE, so this never exceeds `available`.
        spendable as u64
    }
}

/// Check a distribution fraction lies in `(0, 1]`.
pub fn validate_fraction(fraction: f64) -> Result<()> {
    if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
        return Err(TypesError::InvalidFraction(fraction));
    }
    Ok(())
}

/// Convert a user-facing percentage (e.g. `90`) into a fraction.
pub fn fraction_from_percent(percent: f64) -> Result<f64> {
    let fraction = percent / 100.0;
    validate_fraction(fraction)?;
    Ok(fraction)
}
