//! Batch submitter.
//!
//! Turns one [`Batch`] into one atomic transfer set and submits it through
//! the ledger gateway, waiting for confirmation.
//!
//! ## Instruction filtering
//!
//! - Dust recipients (below the configured threshold) contribute no
//!   instruction.
//! - Recipients whose address does not decode are skipped with a warning;
//!   the rest of the batch still goes out.
//! - A batch left with no instruction is reported as skipped and never
//!   reaches the gateway.
//!
//! ## Failure handling
//!
//! Each submission is bounded by the confirmation timeout. Retryable
//! gateway errors are retried according to the [`RetryPolicy`]; anything
//! else fails the batch. A failed batch never aborts the run.

use fanout_crypto::Credentials;
use fanout_types::{BatchStatus, SubmissionOutcome};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, RetryPolicy};
use crate::gateway::{GatewayError, LedgerGateway, Transfer};
use crate::partition::Batch;

/// Submits batches through a ledger gateway.
pub struct BatchSubmitter<'a, L> {
    ledger: &'a L,
    config: &'a EngineConfig,
}

impl<'a, L: LedgerGateway> BatchSubmitter<'a, L> {
    pub fn new(ledger: &'a L, config: &'a EngineConfig) -> Self {
        Self { ledger, config }
    }

    fn retry(&self) -> &RetryPolicy {
        &self.config.retry
    }

    /// Transfer instructions for the non-dust, valid-address members.
    pub fn build_transfers(&self, batch: &Batch) -> Vec<Transfer> {
        let mut transfers = Vec::with_capacity(batch.len());
        for recipient in &batch.recipients {
            if recipient.is_dust(self.config.dust_threshold_units) {
                debug!(
                    batch = batch.index,
                    owner = %recipient.owner,
                    units = recipient.allocated_units,
                    "dust allocation left out of transfer set"
                );
                continue;
            }
            if let Err(e) = fanout_crypto::address::validate(&recipient.owner) {
                warn!(
                    batch = batch.index,
                    owner = %recipient.owner,
                    error = %e,
                    "invalid recipient address, skipping"
                );
                continue;
            }
            transfers.push(Transfer {
                recipient: recipient.owner.clone(),
                units: recipient.allocated_units,
            });
        }
        transfers
    }

    /// Submit one batch and report what happened.
    pub async fn submit(&self, batch: &Batch, signer: &Credentials) -> SubmissionOutcome {
        let transfers = self.build_transfers(batch);
        if transfers.is_empty() {
            info!(batch = batch.index, "no transferable recipients in batch, skipping");
            return SubmissionOutcome {
                batch_index: batch.index,
                status: BatchStatus::Skipped,
                recipients_included: 0,
                units_transferred: 0,
                attempts: 0,
            };
        }

        let units: u64 = transfers.iter().map(|t| t.units).sum();
        let max_attempts = self.retry().attempts();
        let timeout = self.config.confirm_timeout();

        info!(
            batch = batch.index,
            transfers = transfers.len(),
            units,
            "submitting transfer set"
        );

        let mut attempt = 0u32;
        let status = loop {
            attempt += 1;
            let result = match tokio::time::timeout(
                timeout,
                self.ledger.submit_transfer_set(signer, &transfers),
            )
            .await
            {
                Ok(result) => result,
                Err(_elapsed) => Err(GatewayError::ConfirmationTimeout(timeout)),
            };

            match result {
                Ok(signature) => {
                    info!(batch = batch.index, attempt, %signature, "batch confirmed");
                    break BatchStatus::Success { signature };
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = self.retry().backoff_after(attempt);
                    warn!(
                        batch = batch.index,
                        attempt,
                        max_attempts,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "batch submission failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!(batch = batch.index, attempt, error = %e, "batch failed");
                    break BatchStatus::Failed {
                        reason: e.to_string(),
                    };
                }
            }
        };

        SubmissionOutcome {
            batch_index: batch.index,
            status,
            recipients_included: transfers.len(),
            units_transferred: units,
            attempts: attempt,
        }
    }

    /// Pause before the next batch to respect gateway rate limits.
    ///
    /// Callers skip this after the final batch. Skipped batches made no
    /// gateway call and need no pause.
    pub async fn cooldown(&self, outcome: &SubmissionOutcome) {
        let delay = match outcome.status {
            BatchStatus::Success { .. } => self.config.success_delay(),
            BatchStatus::Failed { .. } => self.config.failure_delay(),
            BatchStatus::Skipped => return,
        };
        debug!(delay_ms = delay.as_millis() as u64, "waiting before next batch");
        tokio::time::sleep(delay).await;
    }
}
