use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

use super::load_engine;
use crate::level::level_label;

/// Rebuild loyalty state from a chain file and print every tracked tag
pub fn run(config_path: &Path, chain_path: &Path, as_json: bool) -> Result<()> {
    let loaded = load_engine(config_path, chain_path)?;
    let summary = &loaded.summary;

    let mut tags: Vec<_> = loaded.engine.ledger().snapshot().into_iter().collect();
    // Most loyal first, ties broken by tag so output is stable
    tags.sort_by(|(a_tag, a), (b_tag, b)| b.points.cmp(&a.points).then_with(|| a_tag.cmp(b_tag)));

    if as_json {
        let tags: Vec<_> = tags
            .iter()
            .map(|(tag, status)| {
                json!({
                    "minerTagHex": tag.to_hex(),
                    "level": status.level(),
                    "status": status,
                })
            })
            .collect();
        let output = json!({ "summary": summary, "tags": tags });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to encode scan output")?
        );
        return Ok(());
    }

    println!();
    println!("=== Loyalty Scan ===");
    println!();
    match summary.tip_height {
        Some(tip) => println!("  Heights: {}..={}", summary.start_height, tip),
        None => println!("  Heights: (empty chain)"),
    }
    println!("  Blocks scanned: {}", summary.blocks_scanned);
    println!("  Blocks skipped: {}", summary.blocks_skipped);
    println!("  Tags tracked: {}", summary.tags);
    println!();

    if tags.is_empty() {
        println!("  (No tagged blocks found)");
        return Ok(());
    }

    println!(
        "  {:<26} {:>6} {:>6} {:>10} {:>10}  {}",
        "TAG", "POINTS", "BLOCKS", "FIRST", "LAST", "LEVEL"
    );
    for (tag, status) in &tags {
        println!(
            "  {:<26} {:>6} {:>6} {:>10} {:>10}  {}",
            tag.to_hex(),
            status.points,
            status.blocks_seen,
            status.first_seen_height.map_or("-".to_string(), |h| h.to_string()),
            status.last_seen_height.map_or("-".to_string(), |h| h.to_string()),
            level_label(status.level()),
        );
    }
    println!();

    Ok(())
}
