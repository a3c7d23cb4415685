//! Holder concentration statistics for the "list holders" report.

use fanout_types::Holder;
use serde::{Deserialize, Serialize};

/// Number of holders listed individually in a report.
pub const DISPLAY_LIMIT: usize = 20;

/// Summary of a holder snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HolderStats {
    /// Holders with a non-zero balance.
    pub holder_count: usize,
    /// Sum of all weights (circulating supply held).
    pub total_weight: f64,
    /// Size of the top decile, at least one holder.
    pub top_decile_count: usize,
    /// Share of supply held by the top decile, in percent.
    pub top_decile_share_pct: f64,
}

impl HolderStats {
    /// Compute statistics over holders ordered by weight descending.
    ///
    /// Returns `None` for an empty snapshot.
    pub fn compute(holders: &[Holder]) -> Option<Self> {
        if holders.is_empty() {
            return None;
        }

        let total_weight: f64 = holders.iter().map(|h| h.weight).sum();
        let top_decile_count = holders.len().div_ceil(10).max(1);
        let top_weight: f64 = holders[..top_decile_count].iter().map(|h| h.weight).sum();

        Some(Self {
            holder_count: holders.len(),
            total_weight,
            top_decile_count,
            top_decile_share_pct: percent_of(top_weight, total_weight),
        })
    }

    /// Share of supply held by a single holder, in percent.
    pub fn share_pct(&self, holder: &Holder) -> f64 {
        percent_of(holder.weight, self.total_weight)
    }
}

fn percent_of(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}
