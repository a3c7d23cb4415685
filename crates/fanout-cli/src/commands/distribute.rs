//! Interactive distributions: to all holders, to the top N holders, or to
//! hand-entered recipients with percentage shares.

use fanout_engine::allocation::validate_percentage;
use fanout_engine::coordinator::DistributionRequest;
use fanout_engine::{EngineError, HolderSnapshot};
use fanout_types::{Address, BatchStatus, DistributionReport, Holder, RunStatus};

use crate::commands::{ask_asset, ask_fraction, ask_signer, whole};
use crate::console::ConsoleGate;
use crate::AppState;

const FRACTION_PROMPT: &str = "Percentage of balance to distribute (1-100, blank = 90): ";

/// Distribute to holders of an asset, optionally only the top `limit`.
pub async fn to_holders(state: &AppState, limit: Option<usize>) -> anyhow::Result<()> {
    let Some(asset) = ask_asset(state).await? else {
        return Ok(());
    };
    let Some(signer) = ask_signer(state).await? else {
        return Ok(());
    };
    let Some(fraction) = ask_fraction(state, FRACTION_PROMPT).await? else {
        return Ok(());
    };

    let holders = match state.snapshot.holders(&asset, limit).await {
        Ok(holders) => holders,
        Err(e) => {
            println!("Could not load holders: {e}");
            return Ok(());
        }
    };
    if holders.is_empty() {
        println!("Could not find any token holders. Operation cancelled.");
        return Ok(());
    }
    println!("Found {} holders. Preparing distribution...", holders.len());

    let request =
        DistributionRequest::holders(holders, fraction, state.config.engine.fees.holders);
    let result = state
        .coordinator
        .run(&signer, request, &ConsoleGate::new(&state.console))
        .await;
    report_result(result);
    Ok(())
}

/// Distribute to the top N holders.
pub async fn to_top_holders(state: &AppState) -> anyhow::Result<()> {
    let raw = state.console.ask("How many top holders? ").await?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => to_holders(state, Some(n)).await,
        _ => {
            println!("Invalid number: {raw}");
            Ok(())
        }
    }
}

/// Distribute to hand-entered addresses with percentage shares.
pub async fn manual(state: &AppState) -> anyhow::Result<()> {
    let Some(signer) = ask_signer(state).await? else {
        return Ok(());
    };

    println!();
    println!("Enter recipient addresses one per line. Type \"done\" when finished.");
    let mut recipients: Vec<Holder> = Vec::new();
    loop {
        let raw = state.console.ask("Address (or \"done\"): ").await?;
        if raw.eq_ignore_ascii_case("done") {
            break;
        }
        let address = match Address::new(&raw) {
            Ok(address) => address,
            Err(e) => {
                println!("Invalid address ({e}). Please try again.");
                continue;
            }
        };
        if let Err(e) = fanout_crypto::address::validate(&address) {
            println!("Invalid address format ({e}). Please try again.");
            continue;
        }

        let raw = state
            .console
            .ask(&format!("Percentage for {address} (1-100): "))
            .await?;
        let percent = match raw.trim_end_matches('%').parse::<f64>() {
            Ok(p) if validate_percentage(p).is_ok() => p,
            _ => {
                println!("Invalid percentage. Must be between 1 and 100. Skipping this address.");
                continue;
            }
        };

        println!("Added recipient: {address} with {percent}%");
        recipients.push(Holder::new(address, percent));
    }

    if recipients.is_empty() {
        println!("No valid recipients added. Operation cancelled.");
        return Ok(());
    }

    let Some(fraction) = ask_fraction(state, FRACTION_PROMPT).await? else {
        return Ok(());
    };

    let request =
        DistributionRequest::manual(recipients, fraction, state.config.engine.fees.manual);
    let result = state
        .coordinator
        .run(&signer, request, &ConsoleGate::new(&state.console))
        .await;
    report_result(result);
    Ok(())
}

fn report_result(result: Result<DistributionReport, EngineError>) {
    match result {
        Ok(report) => print_report(&report),
        Err(EngineError::InsufficientBudget {
            balance_units,
            reserve_units,
        }) => println!(
            "Not enough to distribute after reserving for fees (balance {}, reserve {}).",
            whole(balance_units),
            whole(reserve_units)
        ),
        Err(e) => println!("Distribution aborted: {e}"),
    }
}

pub(crate) fn print_report(report: &DistributionReport) {
    if report.status() == RunStatus::Cancelled {
        println!("Distribution cancelled.");
        return;
    }

    for outcome in &report.outcomes {
        let n = outcome.batch_index + 1;
        match &outcome.status {
            BatchStatus::Success { signature } => println!(
                "Batch {n}: sent {} to {} recipients ({signature})",
                whole(outcome.units_transferred),
                outcome.recipients_included
            ),
            BatchStatus::Failed { reason } => {
                println!("Batch {n}: FAILED after {} attempt(s): {reason}", outcome.attempts)
            }
            BatchStatus::Skipped => println!("Batch {n}: skipped, nothing above dust"),
        }
    }

    println!();
    println!("Distribution summary ({:?}):", report.status());
    println!("  Successful batches: {}", report.successful_batches());
    println!("  Failed batches:     {}", report.failed_batches());
    if report.skipped_batches() > 0 {
        println!("  Skipped batches:    {}", report.skipped_batches());
    }
    println!("  Recipients paid:    {}", report.recipients_paid());
    println!("  Total distributed:  {}", whole(report.units_transferred()));
    if report.failed_batches() > 0 {
        println!("Some batches failed. Their recipients were not paid.");
    }
}
