use anyhow::{Context, Result};
use std::path::Path;

use super::load_engine;
use crate::emission::format_coin;
use crate::tag::MinerTag;

/// Print the subsidy a coinbase tag may claim
pub fn run(
    config_path: &Path,
    chain_path: &Path,
    tag_hex: &str,
    height: Option<u64>,
) -> Result<()> {
    let tag =
        MinerTag::from_hex(tag_hex).with_context(|| format!("Invalid miner tag '{tag_hex}'"))?;
    let loaded = load_engine(config_path, chain_path)?;
    let engine = &loaded.engine;

    // Default to the next block to be mined
    let height =
        height.unwrap_or_else(|| loaded.tip_height().map_or(0, |tip| tip.saturating_add(1)));

    let allowed = engine.allowed_subsidy(&tag, height);
    let limit = engine.subsidy_limit(&tag, height);

    println!("Tag {tag} at height {height}:");
    println!("  Points: {}", engine.ledger().points(&tag));
    println!("  Allowed subsidy: {} ({allowed})", format_coin(allowed));
    if limit != allowed {
        println!("  Enforced limit: {} ({limit})", format_coin(limit));
    }

    Ok(())
}
