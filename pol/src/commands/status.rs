use anyhow::{Context, Result};
use std::path::Path;

use super::load_engine;
use crate::emission::format_coin;
use crate::level::level_label;
use crate::tag::{tag_from_address, MinerTag};

/// How the user named the miner
pub enum TagTarget {
    /// Payout address (a `.worker` suffix is ignored)
    Address(String),
    /// Coinbase tag in hex
    Tag(String),
}

impl TagTarget {
    pub fn resolve(&self) -> Result<MinerTag> {
        match self {
            TagTarget::Address(address) => Ok(tag_from_address(address)),
            TagTarget::Tag(hex) => {
                MinerTag::from_hex(hex).with_context(|| format!("Invalid miner tag '{hex}'"))
            }
        }
    }
}

/// Show loyalty status and subsidy split for one miner
pub fn run(
    config_path: &Path,
    chain_path: &Path,
    target: TagTarget,
    height: Option<u64>,
) -> Result<()> {
    let tag = target.resolve()?;
    let loaded = load_engine(config_path, chain_path)?;
    let engine = &loaded.engine;

    let height = height.unwrap_or_else(|| loaded.tip_height().unwrap_or(0));
    let status = engine.status_or_default(&tag);
    let split = engine.split(&tag, height);

    println!();
    println!("=== Miner Loyalty ===");
    println!();
    if let TagTarget::Address(address) = &target {
        println!("  Address: {address}");
    }
    println!("  Tag: {} ({} bytes, u32 {})", tag, tag.len(), tag.prefix_u32());
    println!();

    if status.seen {
        println!("  Points: {}", status.points);
        println!("  Level: {}", level_label(status.level()));
        println!("  Blocks seen: {}", status.blocks_seen);
        if let (Some(first), Some(last)) = (status.first_seen_height, status.last_seen_height) {
            println!("  First seen: height {first}");
            println!("  Last seen: height {last} (time {})", status.last_seen_time);
        }
        if let Some(period) = status.last_seen_period {
            println!("  Last active period: {period}");
        }
    } else {
        println!("  (Tag has not been seen on this chain)");
    }

    println!();
    println!("Subsidy at height {height}:");
    println!("  Schedule: {}", format_coin(split.full));
    println!("  Base: {}", format_coin(split.base));
    println!("  Bonus: {}", format_coin(split.bonus));
    println!("  Allowed: {}", format_coin(split.allowed));
    if height < engine.enforce_height() {
        println!(
            "  (Not enforced below height {}; limit is the full schedule)",
            engine.enforce_height()
        );
    }
    println!();

    Ok(())
}
