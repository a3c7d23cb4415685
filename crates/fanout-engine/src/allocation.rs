//! Allocation calculator.
//!
//! Splits a budget's spendable units across recipients in proportion to
//! their weights:
//!
//! ```text
//! allocated_units = floor(spendable_units * weight / sum(weights))
//! ```
//!
//! The division runs in `u128` over weights quantized to fixed point, so
//! the total never exceeds the budget and falls short of it by less than
//! one unit per recipient at any balance. Rounding loss stays with the
//! sender; it is never redistributed.
//!
//! ## Modes
//!
//! - [`AllocationMode::Proportional`]: weight is the raw holding.
//! - [`AllocationMode::Explicit`]: weight is a user-assigned percentage in
//!   `(0, 100]`. Percentages that do not sum to 100 (within
//!   [`PERCENT_TOLERANCE`]) are rescaled to sum to 100 first.

use fanout_types::{Budget, Recipient, PERCENT_TOLERANCE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{EngineError, Result};

/// How recipient weights are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Weight is a token holding.
    Proportional,
    /// Weight is a percentage share.
    Explicit,
}

/// Populate each recipient's allocation from `budget`.
///
/// # Errors
///
/// - [`EngineError::NoEligibleRecipients`] if the list is empty or the
///   weights sum to zero
/// - [`EngineError::InvalidInput`] for negative or non-finite weights, or
///   explicit percentages outside `(0, 100]`
/// - [`EngineError::InsufficientBudget`] if nothing is spendable
pub fn allocate(
    budget: &Budget,
    mut recipients: Vec<Recipient>,
    mode: AllocationMode,
) -> Result<Vec<Recipient>> {
    validate_weights(&recipients, mode)?;

    if mode == AllocationMode::Explicit {
        normalize_percentages(&mut recipients);
    }

    let weights = quantize_weights(&recipients);
    let total_weight: u128 = weights.iter().sum();
    if total_weight == 0 {
        return Err(EngineError::NoEligibleRecipients);
    }

    let spendable = budget.spendable_units();
    if spendable == 0 {
        return Err(EngineError::InsufficientBudget {
            balance_units: budget.total_units,
            reserve_units: budget.reserve_units,
        });
    }

    let mut remaining = spendable;
    for (recipient, weight) in recipients.iter_mut().zip(weights) {
        // weight <= total_weight, so the share never exceeds spendable.
        let units = (u128::from(spendable) * weight / total_weight) as u64;
        remaining -= units;
        recipient.set_allocation(units);
    }

    debug!(
        recipients = recipients.len(),
        spendable,
        rounding_loss = remaining,
        "allocation computed"
    );

    Ok(recipients)
}

/// Rescale explicit percentages to sum to 100 when they are off by more
/// than [`PERCENT_TOLERANCE`]. Returns whether a rescale happened.
pub fn normalize_percentages(recipients: &mut [Recipient]) -> bool {
    let total: f64 = recipients.iter().map(|r| r.weight).sum();
    if total <= 0.0 || (total - 100.0).abs() <= PERCENT_TOLERANCE {
        return false;
    }

    warn!(total, "percentages do not sum to 100, normalizing");
    let scale = 100.0 / total;
    for recipient in recipients.iter_mut() {
        recipient.weight *= scale;
    }
    true
}

/// Check a single explicit percentage lies in `(0, 100]`.
pub fn validate_percentage(percent: f64) -> Result<()> {
    if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
        return Err(EngineError::InvalidInput(format!(
            "percentage must be in (0, 100], got {percent}"
        )));
    }
    Ok(())
}

/// Bits of precision given to the largest weight.
const WEIGHT_BITS: i32 = 62;

/// Scale weights by a power of two so the largest fills [`WEIGHT_BITS`]
/// bits, then round. Power-of-two scaling is exact, so integer and
/// dyadic weight ratios survive unchanged.
fn quantize_weights(recipients: &[Recipient]) -> Vec<u128> {
    let max = recipients.iter().map(|r| r.weight).fold(0.0, f64::max);
    if max <= 0.0 {
        return vec![0; recipients.len()];
    }
    let exponent = (WEIGHT_BITS - max.log2().ceil() as i32).clamp(-1_000, 1_000);
    let scale = 2f64.powi(exponent);
    recipients
        .iter()
        .map(|r| (r.weight * scale).round() as u128)
        .collect()
}

fn validate_weights(recipients: &[Recipient], mode: AllocationMode) -> Result<()> {
    if recipients.is_empty() {
        return Err(EngineError::NoEligibleRecipients);
    }
    for recipient in recipients {
        match mode {
            AllocationMode::Proportional => {
                if !recipient.weight.is_finite() || recipient.weight < 0.0 {
                    return Err(EngineError::InvalidInput(format!(
                        "weight for {} must be finite and non-negative, got {}",
                        recipient.owner, recipient.weight
                    )));
                }
            }
            AllocationMode::Explicit => validate_percentage(recipient.weight)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use fanout_types::Address;

    use super::*;

    fn recipients(weights: &[f64]) -> Vec<Recipient> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Recipient::unallocated(Address::from(format!("owner{i}")), *w))
            .collect()
    }

    fn budget(spendable: u64) -> Budget {
        Budget::new(spendable, 0, 1.0).expect("budget")
    }

    fn units(allocated: &[Recipient]) -> Vec<u64> {
        allocated.iter().map(|r| r.allocated_units).collect()
    }

    #[test]
    fn test_three_to_one_split_exact() {
        let allocated = allocate(
            &budget(1_000_000),
            recipients(&[3.0, 1.0]),
            AllocationMode::Proportional,
        )
        .expect("allocate");
        assert_eq!(units(&allocated), vec![750_000, 250_000]);
    }

    #[test]
    fn test_amount_matches_units() {
        let allocated = allocate(
            &budget(3_000_000_000),
            recipients(&[1.0, 1.0, 1.0]),
            AllocationMode::Proportional,
        )
        .expect("allocate");
        for r in &allocated {
            assert_eq!(r.allocated_units, 1_000_000_000);
            assert_eq!(r.allocated_amount, 1.0);
        }
    }

    #[test]
    fn test_rounding_loss_bounded_by_count() {
        let weights: Vec<f64> = (1..=37).map(|i| (i * 7919 % 1013) as f64 + 0.5).collect();
        for spendable in [1u64, 999, 1_000_003, 987_654_321, 12_345_678_901] {
            let allocated = allocate(
                &budget(spendable),
                recipients(&weights),
                AllocationMode::Proportional,
            )
            .expect("allocate");
            let total: u64 = allocated.iter().map(|r| r.allocated_units).sum();
            assert!(total <= spendable, "over-allocated {total} > {spendable}");
            assert!(
                spendable - total < allocated.len() as u64,
                "deficit {} not below {}",
                spendable - total,
                allocated.len()
            );
        }
    }

    #[test]
    fn test_rounding_loss_bounded_at_large_balances() {
        let weights = [3.0, 7.0, 11.0];
        for balance in [
            1u64 << 53,
            (1u64 << 53) + 1,
            9_000_000_000_000_000_000,
            9_223_372_036_854_775_783,
            u64::MAX,
        ] {
            for fraction in [1.0, 0.9, 0.333] {
                let budget = Budget::new(balance, 10_000_000, fraction).expect("budget");
                let spendable = budget.spendable_units();
                let allocated =
                    allocate(&budget, recipients(&weights), AllocationMode::Proportional)
                        .expect("allocate");
                let total: u64 = allocated.iter().map(|r| r.allocated_units).sum();
                assert!(total <= spendable);
                assert!(
                    spendable - total < 3,
                    "deficit {} at balance {balance}, fraction {fraction}",
                    spendable - total
                );
            }
        }
    }

    #[test]
    fn test_fractional_and_tiny_weights() {
        let allocated = allocate(
            &budget(1_000_000),
            recipients(&[0.75, 0.25, 1e-30]),
            AllocationMode::Proportional,
        )
        .expect("allocate");
        assert_eq!(units(&allocated), vec![750_000, 250_000, 0]);
    }

    #[test]
    fn test_rounding_loss_not_redistributed() {
        let allocated = allocate(
            &budget(10),
            recipients(&[1.0, 1.0, 1.0]),
            AllocationMode::Proportional,
        )
        .expect("allocate");
        assert_eq!(units(&allocated), vec![3, 3, 3]);
    }

    #[test]
    fn test_zero_total_weight_rejected() {
        let result = allocate(
            &budget(1_000),
            recipients(&[0.0, 0.0]),
            AllocationMode::Proportional,
        );
        assert!(matches!(result, Err(EngineError::NoEligibleRecipients)));
    }

    #[test]
    fn test_empty_list_rejected() {
        let result = allocate(&budget(1_000), Vec::new(), AllocationMode::Proportional);
        assert!(matches!(result, Err(EngineError::NoEligibleRecipients)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let result = allocate(
            &budget(1_000),
            recipients(&[5.0, -1.0]),
            AllocationMode::Proportional,
        );
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_spendable_rejected() {
        let empty = Budget::new(500, 1_000, 0.9).expect("budget");
        let result = allocate(&empty, recipients(&[1.0]), AllocationMode::Proportional);
        assert!(matches!(
            result,
            Err(EngineError::InsufficientBudget {
                balance_units: 500,
                reserve_units: 1_000
            })
        ));
    }

    #[test]
    fn test_explicit_percentages_summing_to_100_unchanged() {
        let mut list = recipients(&[60.0, 39.995]);
        assert!(!normalize_percentages(&mut list));
        assert_eq!(list[0].weight, 60.0);
        assert_eq!(list[1].weight, 39.995);
    }

    #[test]
    fn test_explicit_percentages_rescaled() {
        let mut list = recipients(&[90.0, 60.0]);
        assert!(normalize_percentages(&mut list));
        assert!((list[0].weight - 60.0).abs() < 1e-9);
        assert!((list[1].weight - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_allocation_after_rescale() {
        let allocated = allocate(
            &budget(1_000_000),
            recipients(&[100.0, 60.0, 40.0]),
            AllocationMode::Explicit,
        )
        .expect("allocate");
        assert_eq!(allocated[0].weight, 50.0);
        assert_eq!(allocated[1].weight, 30.0);
        assert_eq!(allocated[2].weight, 20.0);
        assert_eq!(units(&allocated), vec![500_000, 300_000, 200_000]);
    }

    #[test]
    fn test_explicit_percentage_out_of_range() {
        for bad in [0.0, -5.0, 100.5, f64::INFINITY] {
            let result = allocate(
                &budget(1_000),
                recipients(&[50.0, bad]),
                AllocationMode::Explicit,
            );
            assert!(matches!(result, Err(EngineError::InvalidInput(_))), "{bad}");
        }
    }

    #[test]
    fn test_order_preserved() {
        let allocated = allocate(
            &budget(600),
            recipients(&[3.0, 2.0, 1.0]),
            AllocationMode::Proportional,
        )
        .expect("allocate");
        let owners: Vec<&str> = allocated.iter().map(|r| r.owner.as_str()).collect();
        assert_eq!(owners, vec!["owner0", "owner1", "owner2"]);
        assert_eq!(units(&allocated), vec![300, 200, 100]);
    }
}
