use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;

/// Print the effective configuration, optionally writing defaults to disk
pub fn run(config_path: &Path, init: bool) -> Result<()> {
    if init {
        if Config::exists(config_path) {
            anyhow::bail!("Config already exists at {}", config_path.display());
        }
        Config::default().save(config_path)?;
        println!("Wrote default config to {}", config_path.display());
        println!();
    }

    let config = Config::load_or_default(config_path)?;
    let source = if Config::exists(config_path) {
        config_path.display().to_string()
    } else {
        "built-in defaults".to_string()
    };

    println!("# Effective configuration ({source})");
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );

    let loyalty = &config.loyalty;
    println!();
    println!("# Resolved values");
    match loyalty.period_blocks() {
        Some(blocks) => println!("# period length: {blocks} blocks"),
        None => println!("# period length: unbounded (single period)"),
    }
    println!("# extranonce1 size: {} bytes", loyalty.extranonce1_size());

    Ok(())
}
