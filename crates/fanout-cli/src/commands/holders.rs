//! List holders of an asset with concentration statistics.

use fanout_engine::stats::{HolderStats, DISPLAY_LIMIT};
use fanout_engine::HolderSnapshot;

use crate::commands::ask_asset;
use crate::AppState;

pub async fn list(state: &AppState) -> anyhow::Result<()> {
    let Some(asset) = ask_asset(state).await? else {
        return Ok(());
    };

    let holders = match state.snapshot.holders(&asset, None).await {
        Ok(holders) => holders,
        Err(e) => {
            println!("Could not load holders: {e}");
            return Ok(());
        }
    };
    let Some(stats) = HolderStats::compute(&holders) else {
        println!("No holders found for {asset}.");
        return Ok(());
    };

    println!();
    println!("Found {} token holders", stats.holder_count);
    println!("Total supply held: {}", stats.total_weight);
    println!();
    for (i, holder) in holders.iter().take(DISPLAY_LIMIT).enumerate() {
        println!("{:>3}. {}", i + 1, holder.owner);
        println!(
            "     Balance: {} tokens ({:.6}%)",
            holder.weight,
            stats.share_pct(holder)
        );
    }
    if holders.len() > DISPLAY_LIMIT {
        println!("     ... and {} more", holders.len() - DISPLAY_LIMIT);
    }
    println!();
    println!(
        "Top 10% of holders ({}) own {:.2}% of supply",
        stats.top_decile_count, stats.top_decile_share_pct
    );
    Ok(())
}
