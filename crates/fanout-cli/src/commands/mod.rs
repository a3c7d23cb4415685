//! Menu command handlers.
//!
//! Each submodule implements the commands behind one menu entry. Handlers
//! report operational problems to the user and return `Ok`; only console
//! failures and unexpected errors propagate.

pub mod distribute;
pub mod holders;
pub mod schedule;

use fanout_crypto::Credentials;
use fanout_engine::LedgerGateway;
use fanout_types::budget::fraction_from_percent;
use fanout_types::{units_to_whole, AssetId, DEFAULT_DISTRIBUTION_FRACTION};

use crate::console::ConsoleError;
use crate::AppState;

/// Ask for the asset whose holders drive the command.
pub(crate) async fn ask_asset(state: &AppState) -> Result<Option<AssetId>, ConsoleError> {
    let raw = state.console.ask("Enter token address: ").await?;
    match AssetId::new(&raw) {
        Ok(asset) => Ok(Some(asset)),
        Err(e) => {
            println!("Invalid token address: {e}");
            Ok(None)
        }
    }
}

/// Ask for and decode the sender's secret key, then show its balance.
pub(crate) async fn ask_signer(state: &AppState) -> anyhow::Result<Option<Credentials>> {
    let raw = state
        .console
        .ask("Enter your wallet private key to send from: ")
        .await?;
    let signer = match Credentials::from_base58(&raw) {
        Ok(signer) => signer,
        Err(e) => {
            println!("Invalid private key format ({e}). Please check your private key.");
            return Ok(None);
        }
    };
    println!("Sender wallet: {}", signer.address());

    let airdrop = state.config.ledger.airdrop_units;
    if airdrop > 0 && state.ledger.balance_of(signer.address()).await == 0 {
        state.ledger.fund(signer.address(), airdrop).await;
    }

    let balance = state.ledger.balance(signer.address()).await?;
    println!("Current balance: {:.6}", units_to_whole(balance));
    Ok(Some(signer))
}

/// Ask for the percentage of the balance to distribute. Blank keeps the
/// default of 90%.
pub(crate) async fn ask_fraction(state: &AppState, question: &str) -> anyhow::Result<Option<f64>> {
    let raw = state.console.ask(question).await?;
    if raw.is_empty() {
        return Ok(Some(DEFAULT_DISTRIBUTION_FRACTION));
    }
    let parsed = raw
        .trim_end_matches('%')
        .parse::<f64>()
        .ok()
        .and_then(|pct| fraction_from_percent(pct).ok());
    if parsed.is_none() {
        println!("Invalid percentage. Must be between 1 and 100.");
    }
    Ok(parsed)
}

/// Ask for an optional positive count. Blank means no limit.
pub(crate) async fn ask_limit(state: &AppState, question: &str) -> anyhow::Result<Option<Option<usize>>> {
    let raw = state.console.ask(question).await?;
    if raw.is_empty() {
        return Ok(Some(None));
    }
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(Some(n))),
        _ => {
            println!("Invalid number: {raw}");
            Ok(None)
        }
    }
}

/// Format units as whole currency with six decimals.
pub(crate) fn whole(units: u64) -> String {
    format!("{:.6}", units_to_whole(units))
}
