//! fanout: proportional distributions to token holders.
//!
//! Interactive shell over the distribution engine. Holder snapshots come
//! from a TOML file and transfers go to the in-memory stub ledger; both
//! locations are set in `config.toml`.

mod commands;
mod config;
mod console;

use std::sync::Arc;

use fanout_engine::Coordinator;
use fanout_ledger::{FileSnapshot, StubLedger};
use fanout_scheduler::Scheduler;
use tracing::{error, info, warn};

use crate::config::FanoutConfig;
use crate::console::{Console, ConsoleError};

/// Shell-wide shared state.
pub struct AppState {
    /// Configuration.
    pub config: FanoutConfig,
    /// Ledger the signer's funds live on.
    pub ledger: Arc<StubLedger>,
    /// Holder snapshot source.
    pub snapshot: Arc<FileSnapshot>,
    /// Runs interactive distributions.
    pub coordinator: Coordinator<StubLedger>,
    /// Recurring distributions.
    pub scheduler: Scheduler<StubLedger, FileSnapshot>,
    /// Prompt reader.
    pub console: Console,
}

/// How the shell loop ended.
enum Exit {
    /// The user chose "Exit".
    Requested,
    /// Stdin closed.
    InputClosed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = FanoutConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("fanout={}", config.logging.log_level).parse()?),
        )
        .init();

    info!("fanout starting");

    // 3. Open ledger and snapshot
    let genesis = config.genesis_path();
    let ledger = if genesis.exists() {
        StubLedger::from_genesis_file(&genesis, config.ledger.fee_units)?
    } else {
        warn!(path = %genesis.display(), "no genesis file, stub ledger starts empty");
        StubLedger::with_fee(config.ledger.fee_units)
    };
    let ledger = Arc::new(ledger);
    let snapshot = Arc::new(FileSnapshot::new(config.snapshot_path()));
    info!(path = %snapshot.path().display(), "holder snapshot source");

    // 4. Build engine and scheduler
    let coordinator = Coordinator::new(Arc::clone(&ledger), config.engine.clone());
    let scheduler = Scheduler::new(
        coordinator.clone(),
        Arc::clone(&snapshot),
        config.engine.fees.holders,
    );
    tokio::spawn(commands::schedule::print_events(scheduler.subscribe()));

    let state = AppState {
        config,
        ledger,
        snapshot,
        coordinator,
        scheduler,
        console: Console::stdin(),
    };

    // 5. Run the shell until exit or Ctrl-C
    tokio::select! {
        exit = shell(&state) => {
            if let Exit::InputClosed = exit {
                let active = state.scheduler.active_count().await;
                if active > 0 {
                    info!(active, "input closed; scheduled distributions keep running until Ctrl-C");
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Ctrl-C handler error: {}", e);
                    }
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    let stopped = state.scheduler.stop_all().await;
    if stopped > 0 {
        info!(stopped, "scheduled distributions stopped");
    }
    println!("Exiting program. Goodbye!");
    Ok(())
}

async fn shell(state: &AppState) -> Exit {
    loop {
        println!();
        println!("=== fanout ===");
        println!("1. List token holders");
        println!("2. Distribute to ALL token holders");
        println!("3. Distribute to top N token holders");
        println!("4. Send to specific addresses by percentage");
        println!("5. Scheduled distributions");
        println!("6. Exit");

        let choice = match state.console.ask("\nSelect an option (1-6): ").await {
            Ok(choice) => choice,
            Err(ConsoleError::Eof) => return Exit::InputClosed,
            Err(e) => {
                error!("console error: {}", e);
                return Exit::InputClosed;
            }
        };

        let result = match choice.as_str() {
            "1" => commands::holders::list(state).await,
            "2" => commands::distribute::to_holders(state, None).await,
            "3" => commands::distribute::to_top_holders(state).await,
            "4" => commands::distribute::manual(state).await,
            "5" => commands::schedule::menu(state).await,
            "6" => return Exit::Requested,
            _ => {
                println!("Invalid option. Please try again.");
                continue;
            }
        };

        if let Err(e) = result {
            if let Some(ConsoleError::Eof) = e.downcast_ref::<ConsoleError>() {
                return Exit::InputClosed;
            }
            println!("Error: {e:#}");
        }
    }
}
