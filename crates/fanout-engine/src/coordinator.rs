//! Distribution coordinator.
//!
//! Drives one distribution run end to end:
//!
//! ```text
//! Validate -> Allocate -> Partition -> ConfirmIfLarge -> SubmitBatches -> Report
//! ```
//!
//! Any error before `SubmitBatches` aborts the run with no ledger change.
//! Once submission starts, batch failures are recorded and the run keeps
//! going; the [`DistributionReport`] carries the partial-success outcome.

use std::future::{self, Future};
use std::sync::Arc;

use fanout_crypto::Credentials;
use fanout_types::budget::validate_fraction;
use fanout_types::{
    units_to_whole, Budget, DistributionReport, FeeReserve, Holder, Recipient, MAX_BATCH_SIZE,
};
use tracing::{info, warn};

use crate::allocation::{allocate, AllocationMode};
use crate::config::EngineConfig;
use crate::gateway::LedgerGateway;
use crate::partition::{batch_count, partition, Batch};
use crate::submitter::BatchSubmitter;
use crate::{EngineError, Result};

/// Number of recipients shown in the pre-submission preview.
pub const PREVIEW_LEN: usize = 20;

/// Who started a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOrigin {
    /// A user at the prompt; large runs need confirmation.
    Interactive,
    /// The recurrence scheduler; never prompts.
    Scheduled,
}

/// Input to one distribution run.
#[derive(Clone, Debug)]
pub struct DistributionRequest {
    /// Recipients ordered by weight descending.
    pub recipients: Vec<Holder>,
    /// How the weights are read.
    pub mode: AllocationMode,
    /// Share of the post-reserve balance to distribute, in `(0, 1]`.
    pub distribution_fraction: f64,
    /// Fee reserve held back from the balance.
    pub reserve: FeeReserve,
}

impl DistributionRequest {
    /// Proportional distribution to token holders.
    pub fn holders(recipients: Vec<Holder>, distribution_fraction: f64, reserve: FeeReserve) -> Self {
        Self {
            recipients,
            mode: AllocationMode::Proportional,
            distribution_fraction,
            reserve,
        }
    }

    /// Distribution to hand-picked recipients with percentage weights.
    pub fn manual(recipients: Vec<Holder>, distribution_fraction: f64, reserve: FeeReserve) -> Self {
        Self {
            recipients,
            mode: AllocationMode::Explicit,
            distribution_fraction,
            reserve,
        }
    }
}

/// What a confirmation gate is shown before submission starts.
#[derive(Debug)]
pub struct DistributionPreview<'a> {
    /// Partitioned, allocated recipients in submission order.
    pub batches: &'a [Batch],
    /// Number of recipients across all batches.
    pub recipient_count: usize,
    /// Budget the allocation was computed from.
    pub budget: Budget,
    /// Units the run sets out to distribute.
    pub spendable_units: u64,
}

impl<'a> DistributionPreview<'a> {
    /// Number of transfer sets the run will submit.
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Every recipient in submission order.
    pub fn recipients(&self) -> impl Iterator<Item = &'a Recipient> + 'a {
        let batches = self.batches;
        batches.iter().flat_map(|batch| batch.recipients.iter())
    }

    /// The first `n` recipients.
    pub fn top(&self, n: usize) -> impl Iterator<Item = &'a Recipient> + 'a {
        self.recipients().take(n)
    }
}

/// Confirmation hook consulted before large interactive runs.
pub trait ConfirmationGate: Send + Sync {
    /// Whether the run was started interactively.
    fn origin(&self) -> RunOrigin;

    /// Ask whether to proceed. `false` cancels the run.
    fn confirm(&self, preview: &DistributionPreview<'_>) -> impl Future<Output = bool> + Send;
}

/// Gate for runs nobody is watching: scheduled origin, always proceeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unattended;

impl ConfirmationGate for Unattended {
    fn origin(&self) -> RunOrigin {
        RunOrigin::Scheduled
    }

    fn confirm(&self, _preview: &DistributionPreview<'_>) -> impl Future<Output = bool> + Send {
        future::ready(true)
    }
}

/// Runs distributions against one ledger.
pub struct Coordinator<L> {
    ledger: Arc<L>,
    config: EngineConfig,
}

impl<L> Clone for Coordinator<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            config: self.config.clone(),
        }
    }
}

impl<L: LedgerGateway> Coordinator<L> {
    pub fn new(ledger: Arc<L>, config: EngineConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one distribution run signed by `signer`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoEligibleRecipients`] for an empty or zero-weight
    ///   recipient list
    /// - [`EngineError::InvalidInput`] for a bad fraction, batch size, weight or
    ///   percentage
    /// - [`EngineError::InsufficientBudget`] if the balance does not cover
    ///   the reserve
    /// - [`EngineError::Gateway`] if the balance cannot be read
    pub async fn run<G: ConfirmationGate>(
        &self,
        signer: &Credentials,
        request: DistributionRequest,
        gate: &G,
    ) -> Result<DistributionReport> {
        let DistributionRequest {
            recipients,
            mode,
            distribution_fraction,
            reserve,
        } = request;

        // Validate
        if recipients.is_empty() {
            return Err(EngineError::NoEligibleRecipients);
        }
        validate_fraction(distribution_fraction)?;
        let max_batch_size = self.config.max_batch_size;
        if max_batch_size == 0 || max_batch_size > MAX_BATCH_SIZE {
            return Err(EngineError::InvalidInput(format!(
                "max batch size must be between 1 and {MAX_BATCH_SIZE}, got {max_batch_size}"
            )));
        }

        let batches_needed = batch_count(recipients.len(), max_batch_size);
        let reserve_units = reserve.for_batches(batches_needed);

        let balance = self.ledger.balance(signer.address()).await?;
        if balance == 0 {
            return Err(EngineError::InsufficientBudget {
                balance_units: 0,
                reserve_units,
            });
        }

        // Allocate
        let budget = Budget::new(balance, reserve_units, distribution_fraction)?;
        let recipients: Vec<Recipient> = recipients.into_iter().map(Recipient::from).collect();
        let allocated = allocate(&budget, recipients, mode)?;
        let recipient_count = allocated.len();
        let spendable = budget.spendable_units();

        info!(
            signer = %signer.address(),
            recipients = recipient_count,
            batches = batches_needed,
            balance = units_to_whole(balance),
            reserve = units_to_whole(reserve_units),
            spendable = units_to_whole(spendable),
            "distribution planned"
        );

        // Partition
        let batches = partition(allocated, max_batch_size)?;

        // ConfirmIfLarge
        let preview = DistributionPreview {
            batches: &batches,
            recipient_count,
            budget,
            spendable_units: spendable,
        };
        for (rank, recipient) in preview.top(PREVIEW_LEN).enumerate() {
            info!(
                rank = rank + 1,
                owner = %recipient.owner,
                weight = recipient.weight,
                amount = recipient.allocated_amount,
                "planned transfer"
            );
        }
        if recipient_count > PREVIEW_LEN {
            info!(more = recipient_count - PREVIEW_LEN, "further recipients not shown");
        }

        if self.needs_confirmation(gate.origin(), recipient_count) && !gate.confirm(&preview).await {
            info!("distribution cancelled at confirmation");
            return Ok(DistributionReport::cancelled(spendable));
        }

        // SubmitBatches
        let submitter = BatchSubmitter::new(self.ledger.as_ref(), &self.config);
        let total = batches.len();
        let mut report = DistributionReport {
            outcomes: Vec::with_capacity(total),
            spendable_units: spendable,
            cancelled: false,
        };
        for batch in &batches {
            info!(batch = batch.index + 1, of = total, members = batch.len(), "processing batch");
            let outcome = submitter.submit(batch, signer).await;
            let is_last = batch.index + 1 == total;
            if !is_last {
                submitter.cooldown(&outcome).await;
            }
            report.outcomes.push(outcome);
        }

        // Report
        let status = report.status();
        info!(
            ?status,
            successful = report.successful_batches(),
            failed = report.failed_batches(),
            skipped = report.skipped_batches(),
            recipients_paid = report.recipients_paid(),
            distributed = units_to_whole(report.units_transferred()),
            "distribution finished"
        );
        if report.failed_batches() > 0 {
            warn!(
                failed = report.failed_batches(),
                "some batches failed; their recipients were not paid"
            );
        }

        Ok(report)
    }

    fn needs_confirmation(&self, origin: RunOrigin, recipient_count: usize) -> bool {
        origin == RunOrigin::Interactive
            && (recipient_count > self.config.large_fanout_threshold
                || self.config.confirm_all_interactive)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fanout_types::{BatchStatus, RunStatus, UNITS_PER_WHOLE};

    use super::*;
    use crate::gateway::GatewayError;
    use crate::submitter::tests::{valid_address, ScriptedLedger};

    struct ScriptedGate {
        origin: RunOrigin,
        answer: bool,
        asked: AtomicUsize,
        shown_batches: AtomicUsize,
    }

    impl ScriptedGate {
        fn interactive(answer: bool) -> Self {
            Self {
                origin: RunOrigin::Interactive,
                answer,
                asked: AtomicUsize::new(0),
                shown_batches: AtomicUsize::new(0),
            }
        }

        fn asked(&self) -> usize {
            self.asked.load(Ordering::SeqCst)
        }
    }

    impl ConfirmationGate for ScriptedGate {
        fn origin(&self) -> RunOrigin {
            self.origin
        }

        async fn confirm(&self, preview: &DistributionPreview<'_>) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.shown_batches
                .store(preview.batch_count(), Ordering::SeqCst);
            self.answer
        }
    }

    fn holders(n: usize) -> Vec<Holder> {
        (0..n)
            .map(|i| Holder::new(valid_address(i as u8), (n - i) as f64))
            .collect()
    }

    fn coordinator(ledger: ScriptedLedger) -> Coordinator<ScriptedLedger> {
        Coordinator::new(Arc::new(ledger), EngineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_complete() {
        let coord = coordinator(ScriptedLedger::new(10 * UNITS_PER_WHOLE));
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(45), 0.9, FeeReserve::holder_distribution());

        let report = coord.run(&signer, request, &Unattended).await.expect("run");
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.status(), RunStatus::Complete);
        assert_eq!(report.recipients_paid(), 45);
        assert!(report.units_transferred() <= report.spendable_units);

        // 10 whole minus 3 batches x 0.01 reserve, times 0.9.
        let expected = (10 * UNITS_PER_WHOLE - 3 * UNITS_PER_WHOLE / 100) / 10 * 9;
        assert_eq!(report.spendable_units, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_batch_does_not_stop_run() {
        let ledger = ScriptedLedger::with_script(
            10 * UNITS_PER_WHOLE,
            vec![
                Ok("first".into()),
                Err(GatewayError::Rejected("blockhash expired".into())),
                Ok("third".into()),
            ],
        );
        let coord = coordinator(ledger);
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(45), 0.9, FeeReserve::holder_distribution());

        let report = coord.run(&signer, request, &Unattended).await.expect("run");
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].is_success());
        assert!(report.outcomes[1].is_failed());
        assert!(report.outcomes[2].is_success());
        assert_eq!(report.failed_batches(), 1);
        assert_eq!(report.recipients_paid(), 25);
        assert_eq!(report.status(), RunStatus::Partial);
        assert_eq!(coord.ledger().submission_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_batches_failed() {
        let ledger = ScriptedLedger::with_script(
            10 * UNITS_PER_WHOLE,
            vec![
                Err(GatewayError::Rejected("no".into())),
                Err(GatewayError::Rejected("no".into())),
            ],
        );
        let coord = coordinator(ledger);
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(30), 0.9, FeeReserve::holder_distribution());

        let report = coord.run(&signer, request, &Unattended).await.expect("run");
        assert_eq!(report.failed_batches(), 2);
        assert_eq!(report.status(), RunStatus::Failed);
        assert_eq!(report.units_transferred(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_between_batches_only() {
        let ledger = ScriptedLedger::with_script(
            10 * UNITS_PER_WHOLE,
            vec![Ok("a".into()), Err(GatewayError::Rejected("no".into())), Ok("c".into())],
        );
        let coord = coordinator(ledger);
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(45), 0.9, FeeReserve::holder_distribution());

        let start = tokio::time::Instant::now();
        coord.run(&signer, request, &Unattended).await.expect("run");
        // 2 s after the success, 5 s after the failure, nothing after the last.
        let elapsed = start.elapsed().as_millis();
        assert!((7_000..7_100).contains(&elapsed), "elapsed {elapsed} ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_interactive_run_declined() {
        let coord = coordinator(ScriptedLedger::new(10 * UNITS_PER_WHOLE));
        let signer = Credentials::generate();
        let gate = ScriptedGate::interactive(false);
        let request = DistributionRequest::holders(holders(150), 0.9, FeeReserve::holder_distribution());

        let report = coord.run(&signer, request, &gate).await.expect("run");
        assert_eq!(gate.asked(), 1);
        // The gate sees the partitioned plan: 150 recipients in 8 sets.
        assert_eq!(gate.shown_batches.load(Ordering::SeqCst), 8);
        assert_eq!(report.status(), RunStatus::Cancelled);
        assert!(report.outcomes.is_empty());
        assert_eq!(coord.ledger().submission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_interactive_run_not_gated() {
        let coord = coordinator(ScriptedLedger::new(10 * UNITS_PER_WHOLE));
        let signer = Credentials::generate();
        let gate = ScriptedGate::interactive(false);
        let request = DistributionRequest::holders(holders(100), 0.9, FeeReserve::holder_distribution());

        let report = coord.run(&signer, request, &gate).await.expect("run");
        assert_eq!(gate.asked(), 0);
        assert_eq!(report.status(), RunStatus::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_all_interactive() {
        let config = EngineConfig {
            confirm_all_interactive: true,
            ..EngineConfig::default()
        };
        let coord = Coordinator::new(Arc::new(ScriptedLedger::new(UNITS_PER_WHOLE)), config);
        let signer = Credentials::generate();
        let gate = ScriptedGate::interactive(true);
        let request = DistributionRequest::manual(
            vec![Holder::new(valid_address(1), 50.0), Holder::new(valid_address(2), 50.0)],
            0.9,
            FeeReserve::manual(),
        );

        let report = coord.run(&signer, request, &gate).await.expect("run");
        assert_eq!(gate.asked(), 1);
        assert_eq!(report.status(), RunStatus::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_run_bypasses_gate() {
        let coord = coordinator(ScriptedLedger::new(10 * UNITS_PER_WHOLE));
        let signer = Credentials::generate();
        let gate = ScriptedGate {
            origin: RunOrigin::Scheduled,
            answer: false,
            asked: AtomicUsize::new(0),
            shown_batches: AtomicUsize::new(0),
        };
        let request = DistributionRequest::holders(holders(150), 0.9, FeeReserve::holder_distribution());

        let report = coord.run(&signer, request, &gate).await.expect("run");
        assert_eq!(gate.asked(), 0);
        assert_eq!(report.outcomes.len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_weight_rejected_before_submission() {
        let coord = coordinator(ScriptedLedger::new(10 * UNITS_PER_WHOLE));
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(
            vec![Holder::new(valid_address(1), 0.0), Holder::new(valid_address(2), 0.0)],
            0.9,
            FeeReserve::holder_distribution(),
        );

        let result = coord.run(&signer, request, &Unattended).await;
        assert!(matches!(result, Err(EngineError::NoEligibleRecipients)));
        assert_eq!(coord.ledger().submission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_recipients_rejected() {
        let coord = coordinator(ScriptedLedger::new(10 * UNITS_PER_WHOLE));
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(Vec::new(), 0.9, FeeReserve::holder_distribution());

        let result = coord.run(&signer, request, &Unattended).await;
        assert!(matches!(result, Err(EngineError::NoEligibleRecipients)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_balance_rejected() {
        let coord = coordinator(ScriptedLedger::new(0));
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(3), 0.9, FeeReserve::holder_distribution());

        let result = coord.run(&signer, request, &Unattended).await;
        assert!(matches!(
            result,
            Err(EngineError::InsufficientBudget { balance_units: 0, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_below_reserve_rejected() {
        let coord = coordinator(ScriptedLedger::new(UNITS_PER_WHOLE / 200));
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(3), 0.9, FeeReserve::holder_distribution());

        let result = coord.run(&signer, request, &Unattended).await;
        assert!(matches!(result, Err(EngineError::InsufficientBudget { .. })));
        assert_eq!(coord.ledger().submission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_lookup_failure() {
        let mut ledger = ScriptedLedger::new(0);
        ledger.balance_error = Some(GatewayError::Unavailable("rpc down".into()));
        let coord = coordinator(ledger);
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(3), 0.9, FeeReserve::holder_distribution());

        let result = coord.run(&signer, request, &Unattended).await;
        assert!(matches!(result, Err(EngineError::Gateway(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_fraction_rejected() {
        let coord = coordinator(ScriptedLedger::new(UNITS_PER_WHOLE));
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(3), 1.5, FeeReserve::holder_distribution());

        let result = coord.run(&signer, request, &Unattended).await;
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dust_only_batch_skipped() {
        // Budget so small every share falls under the dust threshold.
        let coord = coordinator(ScriptedLedger::new(UNITS_PER_WHOLE / 1_000 + 10_000));
        let signer = Credentials::generate();
        let request = DistributionRequest::manual(
            (0..20).map(|i| Holder::new(valid_address(i), 5.0)).collect(),
            1.0,
            FeeReserve::manual(),
        );

        let report = coord.run(&signer, request, &Unattended).await.expect("run");
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].status, BatchStatus::Skipped);
        assert_eq!(report.status(), RunStatus::Failed);
        assert_eq!(coord.ledger().submission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_size_above_cap_rejected() {
        for max_batch_size in [0, MAX_BATCH_SIZE + 1, 50] {
            let config = EngineConfig {
                max_batch_size,
                ..EngineConfig::default()
            };
            let coord = Coordinator::new(Arc::new(ScriptedLedger::new(10 * UNITS_PER_WHOLE)), config);
            let signer = Credentials::generate();
            let gate = ScriptedGate::interactive(true);
            let request =
                DistributionRequest::holders(holders(150), 0.9, FeeReserve::holder_distribution());

            let result = coord.run(&signer, request, &gate).await;
            assert!(
                matches!(result, Err(EngineError::InvalidInput(_))),
                "max_batch_size {max_batch_size}"
            );
            assert_eq!(gate.asked(), 0);
            assert_eq!(coord.ledger().submission_count(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_smaller_batch_size_respected() {
        let config = EngineConfig {
            max_batch_size: 7,
            ..EngineConfig::default()
        };
        let coord = Coordinator::new(Arc::new(ScriptedLedger::new(10 * UNITS_PER_WHOLE)), config);
        let signer = Credentials::generate();
        let request = DistributionRequest::holders(holders(45), 0.9, FeeReserve::holder_distribution());

        let report = coord.run(&signer, request, &Unattended).await.expect("run");
        let sizes: Vec<usize> = report.outcomes.iter().map(|o| o.recipients_included).collect();
        assert_eq!(sizes, vec![7, 7, 7, 7, 7, 7, 3]);
    }
}
