//! Job registry and per-job run loop.
//!
//! ## Job lifecycle
//!
//! 1. [`Scheduler::create`] validates the config, verifies the signer can
//!    fund a run and the asset has holders, then registers the job with
//!    `next_run_at = now + interval` and spawns its task.
//! 2. The task sleeps until `next_run_at`, re-checks `active`, fetches a
//!    fresh holder snapshot and runs the coordinator unattended.
//! 3. Whatever the outcome, the run is recorded: `runs_completed` goes up
//!    and `next_run_at` moves to `fired_at + interval`.
//! 4. [`Scheduler::stop`] clears `active` and wakes the task, which exits
//!    without re-arming. A run already in progress is not interrupted.

use std::collections::HashMap;
use std::sync::Arc;

use fanout_crypto::blake3::{self, contexts};
use fanout_crypto::Credentials;
use fanout_engine::coordinator::{Coordinator, DistributionRequest, Unattended};
use fanout_engine::{EngineError, HolderSnapshot, LedgerGateway};
use fanout_types::budget::validate_fraction;
use fanout_types::{Address, AssetId, FeeReserve, JobId, ScheduleJob};
use rand::RngCore;
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::events::{EventBus, ScheduleEvent};
use crate::{Result, SchedulerError};

/// Parameters of a new recurring distribution.
#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    /// Asset whose holders receive each run.
    pub asset_id: AssetId,
    /// Distribute to the top N holders only.
    pub holder_limit: Option<usize>,
    /// Interval between runs in milliseconds.
    pub interval_ms: u64,
    /// Share of the post-reserve balance each run distributes, in `(0, 1]`.
    pub distribution_fraction: f64,
    /// Signing credential; one active job per credential.
    pub signer: Credentials,
}

#[derive(Default)]
struct Registry {
    jobs: HashMap<JobId, ScheduleJob>,
    stops: HashMap<JobId, Arc<Notify>>,
}

impl Registry {
    fn active_job_for(&self, signer: &Address) -> Option<&JobId> {
        self.jobs
            .values()
            .find(|job| job.active && &job.credentials_ref == signer)
            .map(|job| &job.id)
    }
}

/// Registry of recurring distribution jobs.
pub struct Scheduler<L, S> {
    coordinator: Coordinator<L>,
    snapshot: Arc<S>,
    reserve: FeeReserve,
    registry: Arc<Mutex<Registry>>,
    clock: Clock,
    events: EventBus,
}

impl<L, S> Clone for Scheduler<L, S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            snapshot: Arc::clone(&self.snapshot),
            reserve: self.reserve,
            registry: Arc::clone(&self.registry),
            clock: self.clock,
            events: self.events.clone(),
        }
    }
}

impl<L, S> Scheduler<L, S>
where
    L: LedgerGateway + 'static,
    S: HolderSnapshot + 'static,
{
    /// Create a scheduler whose runs reserve `reserve` for fees.
    pub fn new(coordinator: Coordinator<L>, snapshot: Arc<S>, reserve: FeeReserve) -> Self {
        Self {
            coordinator,
            snapshot,
            reserve,
            registry: Arc::new(Mutex::new(Registry::default())),
            clock: Clock::system(),
            events: EventBus::default(),
        }
    }

    /// Replace the clock, e.g. to start at unix time zero in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Register and start a recurring distribution.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::InvalidConfig`] for a zero interval, a zero
    ///   holder limit or a fraction outside `(0, 1]`
    /// - [`SchedulerError::CredentialInUse`] if an active job already uses
    ///   the signer
    /// - [`SchedulerError::Engine`] if the signer balance is zero
    /// - [`SchedulerError::NoHolders`] if the asset has no holders
    /// - [`SchedulerError::Gateway`] if balance or snapshot lookup fails
    pub async fn create(&self, config: ScheduleConfig) -> Result<JobId> {
        let ScheduleConfig {
            asset_id,
            holder_limit,
            interval_ms,
            distribution_fraction,
            signer,
        } = config;

        if interval_ms == 0 {
            return Err(SchedulerError::InvalidConfig(
                "interval must be positive".to_string(),
            ));
        }
        if holder_limit == Some(0) {
            return Err(SchedulerError::InvalidConfig(
                "holder limit must be at least 1".to_string(),
            ));
        }
        validate_fraction(distribution_fraction)
            .map_err(|e| SchedulerError::InvalidConfig(e.to_string()))?;

        let address = signer.address().clone();
        self.ensure_signer_free(&address).await?;

        let balance = self.coordinator.ledger().balance(&address).await?;
        if balance == 0 {
            return Err(EngineError::InsufficientBudget {
                balance_units: 0,
                reserve_units: self.reserve.for_batches(1),
            }
            .into());
        }

        let holders = self.snapshot.holders(&asset_id, holder_limit).await?;
        if holders.is_empty() {
            return Err(SchedulerError::NoHolders(asset_id.to_string()));
        }

        let now = self.clock.now_ms();
        let id = new_job_id(&address, now);
        let job = ScheduleJob {
            id: id.clone(),
            asset_id,
            holder_limit,
            interval_ms,
            distribution_fraction,
            credentials_ref: address.clone(),
            next_run_at: now.saturating_add(interval_ms),
            runs_completed: 0,
            active: true,
        };
        let stop = Arc::new(Notify::new());

        {
            let mut registry = self.registry.lock().await;
            // Re-check under the lock; another create may have raced us.
            if let Some(existing) = registry.active_job_for(&address) {
                return Err(SchedulerError::CredentialInUse {
                    address: address.to_string(),
                    job: existing.to_string(),
                });
            }
            registry.jobs.insert(id.clone(), job.clone());
            registry.stops.insert(id.clone(), Arc::clone(&stop));
        }

        info!(
            job = %id,
            asset = %job.asset_id,
            holders = holders.len(),
            interval_ms,
            fraction = distribution_fraction,
            next_run_at = job.next_run_at,
            "scheduled distribution created"
        );
        self.events.emit(ScheduleEvent::JobCreated { job });

        let runner = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move { runner.drive(task_id, signer, stop).await });

        Ok(id)
    }

    /// Stop a job. Returns `false` if it is unknown or already stopped.
    ///
    /// A run in progress finishes; the job is removed from the registry
    /// once its task exits.
    pub async fn stop(&self, id: &JobId) -> bool {
        let mut registry = self.registry.lock().await;
        let Some(job) = registry.jobs.get_mut(id) else {
            return false;
        };
        if !job.active {
            return false;
        }
        job.active = false;
        if let Some(stop) = registry.stops.get(id) {
            stop.notify_one();
        }
        drop(registry);

        info!(job = %id, "scheduled distribution stopped");
        self.events.emit(ScheduleEvent::JobStopped { id: id.clone() });
        true
    }

    /// Stop every active job. Returns how many were stopped.
    pub async fn stop_all(&self) -> usize {
        let mut registry = self.registry.lock().await;
        let mut stopped = Vec::new();
        for job in registry.jobs.values_mut().filter(|job| job.active) {
            job.active = false;
            stopped.push(job.id.clone());
        }
        for id in &stopped {
            if let Some(stop) = registry.stops.get(id) {
                stop.notify_one();
            }
        }
        drop(registry);

        for id in &stopped {
            self.events.emit(ScheduleEvent::JobStopped { id: id.clone() });
        }
        info!(count = stopped.len(), "all scheduled distributions stopped");
        stopped.len()
    }

    /// Snapshot of every job, soonest next run first.
    pub async fn list(&self) -> Vec<ScheduleJob> {
        let mut jobs: Vec<ScheduleJob> = self.registry.lock().await.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| {
            b.active
                .cmp(&a.active)
                .then(a.next_run_at.cmp(&b.next_run_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs
    }

    pub async fn get(&self, id: &JobId) -> Option<ScheduleJob> {
        self.registry.lock().await.jobs.get(id).cloned()
    }

    pub async fn active_count(&self) -> usize {
        self.registry
            .lock()
            .await
            .jobs
            .values()
            .filter(|job| job.active)
            .count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.events.subscribe()
    }

    async fn ensure_signer_free(&self, address: &Address) -> Result<()> {
        let registry = self.registry.lock().await;
        match registry.active_job_for(address) {
            Some(existing) => Err(SchedulerError::CredentialInUse {
                address: address.to_string(),
                job: existing.to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn drive(self, id: JobId, signer: Credentials, stop: Arc<Notify>) {
        loop {
            let next_run_at = match self.registry.lock().await.jobs.get(&id) {
                Some(job) if job.active => job.next_run_at,
                _ => break,
            };

            tokio::select! {
                _ = tokio::time::sleep_until(self.clock.instant_at(next_run_at)) => {}
                _ = stop.notified() => {}
            }

            let job = {
                let registry = self.registry.lock().await;
                match registry.jobs.get(&id) {
                    Some(job) if job.active => job.clone(),
                    _ => break,
                }
            };
            let fired_at = self.clock.now_ms();
            if !job.is_due(fired_at) {
                continue;
            }

            let event = self.fire(&job, &signer).await;
            let finished_at = self.clock.now_ms();

            {
                let mut registry = self.registry.lock().await;
                let Some(live) = registry.jobs.get_mut(&id) else {
                    break;
                };
                live.record_run(finished_at);
                debug!(
                    job = %id,
                    runs_completed = live.runs_completed,
                    next_run_at = live.next_run_at,
                    "run recorded"
                );
            }
            self.events.emit(event);
        }

        let mut registry = self.registry.lock().await;
        registry.stops.remove(&id);
        registry.jobs.remove(&id);
        debug!(job = %id, "job task exited, job removed");
    }

    async fn fire(&self, job: &ScheduleJob, signer: &Credentials) -> ScheduleEvent {
        let id = job.id.clone();
        let run = job.runs_completed + 1;
        info!(job = %id, run, asset = %job.asset_id, "scheduled run starting");
        self.events.emit(ScheduleEvent::RunStarted {
            id: id.clone(),
            run,
        });

        let holders = match self.snapshot.holders(&job.asset_id, job.holder_limit).await {
            Ok(holders) => holders,
            Err(e) => {
                warn!(job = %id, run, error = %e, "holder snapshot failed");
                return ScheduleEvent::RunFailed {
                    id,
                    run,
                    error: e.to_string(),
                };
            }
        };
        if holders.is_empty() {
            warn!(job = %id, run, "no holders found, skipping run");
            return ScheduleEvent::RunSkipped {
                id,
                run,
                reason: "no holders found".to_string(),
            };
        }

        let request = DistributionRequest::holders(holders, job.distribution_fraction, self.reserve);
        match self.coordinator.run(signer, request, &Unattended).await {
            Ok(report) => ScheduleEvent::RunFinished {
                id,
                run,
                status: report.status(),
                recipients_paid: report.recipients_paid(),
                units_transferred: report.units_transferred(),
                failed_batches: report.failed_batches(),
            },
            Err(e) => {
                warn!(job = %id, run, error = %e, "scheduled run aborted");
                ScheduleEvent::RunFailed {
                    id,
                    run,
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Random job id: 16 hex chars of a BLAKE3 digest over signer, time and a
/// random nonce.
fn new_job_id(signer: &Address, now_ms: u64) -> JobId {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    let material =
        blake3::encode_multi_field(&[signer.as_str().as_bytes(), &now_ms.to_le_bytes(), &nonce]);
    let digest = blake3::derive_key(contexts::JOB_ID, &material);
    JobId(hex::encode(&digest[..8]))
}
