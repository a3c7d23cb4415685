//! Engine tuning parameters.
//!
//! Embedded in the binary's TOML configuration under `[engine]`; every
//! field has a default so partial files are accepted.

use std::time::Duration;

use fanout_types::{
    FeeReserve, DUST_THRESHOLD_UNITS, LARGE_FANOUT_THRESHOLD, MAX_BATCH_SIZE,
};
use serde::{Deserialize, Serialize};

/// Tuning for allocation, batching and submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum recipients per transfer set.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Allocations below this are kept in the batch but not transferred.
    #[serde(default = "default_dust_threshold")]
    pub dust_threshold_units: u64,
    /// Interactive runs above this many recipients must be confirmed.
    #[serde(default = "default_large_fanout_threshold")]
    pub large_fanout_threshold: usize,
    /// Confirm every interactive run, not only large ones.
    #[serde(default)]
    pub confirm_all_interactive: bool,
    /// Upper bound on waiting for a transfer set to confirm.
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    /// Pause after a confirmed batch before the next one.
    #[serde(default = "default_success_delay_ms")]
    pub success_delay_ms: u64,
    /// Pause after a failed batch before the next one.
    #[serde(default = "default_failure_delay_ms")]
    pub failure_delay_ms: u64,
    /// Retry policy for retryable gateway errors.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Fee reserves per distribution kind.
    #[serde(default)]
    pub fees: FeeConfig,
}

/// Retry policy applied to each batch submission.
///
/// `backoff_ms[i]` is the wait after failed attempt `i + 1`; the last entry
/// repeats when there are more attempts than entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 behave as 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff schedule in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,
}

/// Fee reserves per distribution kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Reserve for holder-snapshot distributions.
    #[serde(default = "FeeReserve::holder_distribution")]
    pub holders: FeeReserve,
    /// Reserve for manually entered recipients.
    #[serde(default = "FeeReserve::manual")]
    pub manual: FeeReserve,
}

// Default value functions

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_dust_threshold() -> u64 {
    DUST_THRESHOLD_UNITS
}

fn default_large_fanout_threshold() -> usize {
    LARGE_FANOUT_THRESHOLD
}

fn default_confirm_timeout_ms() -> u64 {
    60_000
}

fn default_success_delay_ms() -> u64 {
    2_000
}

fn default_failure_delay_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> Vec<u64> {
    vec![500, 1_500]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            dust_threshold_units: default_dust_threshold(),
            large_fanout_threshold: default_large_fanout_threshold(),
            confirm_all_interactive: false,
            confirm_timeout_ms: default_confirm_timeout_ms(),
            success_delay_ms: default_success_delay_ms(),
            failure_delay_ms: default_failure_delay_ms(),
            retry: RetryPolicy::default(),
            fees: FeeConfig::default(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            holders: FeeReserve::holder_distribution(),
            manual: FeeReserve::manual(),
        }
    }
}

impl EngineConfig {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn success_delay(&self) -> Duration {
        Duration::from_millis(self.success_delay_ms)
    }

    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.failure_delay_ms)
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: Vec::new(),
        }
    }

    /// Effective attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after the given failed attempt (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let idx = (attempt.saturating_sub(1) as usize).min(self.backoff_ms.len().saturating_sub(1));
        let ms = self.backoff_ms.get(idx).copied().unwrap_or(0);
        Duration::from_millis(ms)
    }
}
