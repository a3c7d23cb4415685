//! Recurring distribution management: create, list, stop, stop all.

use fanout_scheduler::interval::{format_interval, parse_interval};
use fanout_scheduler::{ScheduleConfig, ScheduleEvent};
use fanout_types::{JobId, ScheduleJob};
use tokio::sync::broadcast;

use crate::commands::{ask_asset, ask_fraction, ask_limit, ask_signer, whole};
use crate::AppState;

pub async fn menu(state: &AppState) -> anyhow::Result<()> {
    println!();
    println!("=== Scheduled Distributions ===");
    println!("1. Create a new schedule");
    println!("2. List schedules");
    println!("3. Stop a schedule");
    println!("4. Stop all schedules");
    println!("5. Back");

    match state.console.ask("Select an option (1-5): ").await?.as_str() {
        "1" => create(state).await,
        "2" => {
            list(state).await;
            Ok(())
        }
        "3" => stop(state).await,
        "4" => {
            let stopped = state.scheduler.stop_all().await;
            println!("Stopped {stopped} schedule(s).");
            Ok(())
        }
        "5" | "" => Ok(()),
        other => {
            println!("Invalid option: {other}");
            Ok(())
        }
    }
}

async fn create(state: &AppState) -> anyhow::Result<()> {
    let Some(asset_id) = ask_asset(state).await? else {
        return Ok(());
    };
    let Some(signer) = ask_signer(state).await? else {
        return Ok(());
    };
    let Some(holder_limit) = ask_limit(state, "Distribute to top N holders (blank = all): ").await?
    else {
        return Ok(());
    };

    let raw = state
        .console
        .ask("Run every (e.g. \"30 minutes\", \"6 hours\", \"1 day\"): ")
        .await?;
    let interval_ms = match parse_interval(&raw) {
        Ok(ms) => ms,
        Err(e) => {
            println!("{e}");
            return Ok(());
        }
    };

    let Some(distribution_fraction) = ask_fraction(
        state,
        "Percentage of balance to distribute each time (1-100): ",
    )
    .await?
    else {
        return Ok(());
    };

    let config = ScheduleConfig {
        asset_id,
        holder_limit,
        interval_ms,
        distribution_fraction,
        signer,
    };
    println!("Verifying holders...");
    match state.scheduler.create(config).await {
        Ok(id) => {
            if let Some(job) = state.scheduler.get(&id).await {
                println!();
                println!("Schedule {id} created.");
                describe(state, &job);
            }
        }
        Err(e) => println!("Could not create schedule: {e}"),
    }
    Ok(())
}

async fn list(state: &AppState) {
    let jobs = state.scheduler.list().await;
    if jobs.is_empty() {
        println!("No schedules.");
        return;
    }
    for job in &jobs {
        println!();
        describe(state, job);
    }
}

async fn stop(state: &AppState) -> anyhow::Result<()> {
    let raw = state.console.ask("Schedule id to stop: ").await?;
    let id = JobId::from(raw.as_str());
    if state.scheduler.stop(&id).await {
        println!("Schedule {id} stopped.");
    } else {
        println!("No active schedule with id {id}.");
    }
    Ok(())
}

fn describe(state: &AppState, job: &ScheduleJob) {
    let now = state.scheduler.clock().now_ms();
    let holders = job
        .holder_limit
        .map_or_else(|| "all".to_string(), |n| format!("top {n}"));
    println!(
        "[{}] {} ({})",
        job.id,
        job.asset_id,
        if job.active { "active" } else { "stopped" }
    );
    println!("   Signer:       {}", job.credentials_ref);
    println!(
        "   Distribution: {:.0}% to {holders} holders every {}",
        job.distribution_fraction * 100.0,
        format_interval(job.interval_ms)
    );
    println!("   Runs so far:  {}", job.runs_completed);
    if job.active {
        let secs = job.next_run_at.saturating_sub(now) / 1_000;
        println!("   Next run in:  {}m {}s", secs / 60, secs % 60);
    }
}

/// Print scheduler events as they arrive until the bus closes.
pub async fn print_events(mut rx: broadcast::Receiver<ScheduleEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "schedule event printer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match event {
            ScheduleEvent::JobCreated { .. } | ScheduleEvent::JobStopped { .. } => {}
            ScheduleEvent::RunStarted { id, run } => {
                println!("\n[schedule {id}] run #{run} starting");
            }
            ScheduleEvent::RunFinished {
                id,
                run,
                status,
                recipients_paid,
                units_transferred,
                failed_batches,
            } => {
                println!(
                    "\n[schedule {id}] run #{run} {status:?}: {} to {recipients_paid} recipients, {failed_batches} failed batch(es)",
                    whole(units_transferred)
                );
            }
            ScheduleEvent::RunSkipped { id, run, reason } => {
                println!("\n[schedule {id}] run #{run} skipped: {reason}");
            }
            ScheduleEvent::RunFailed { id, run, error } => {
                println!("\n[schedule {id}] run #{run} failed: {error}");
            }
        }
    }
}
