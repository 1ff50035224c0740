//! CLI command implementations.
//!
//! These modules implement the user-facing CLI commands and legitimately
//! use stdout for output.

pub mod allowed;
pub mod config;
pub mod extract;
pub mod query;
pub mod scan;
pub mod status;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::engine::Engine;
use crate::rebuild::{BlockSource, MemoryChain, RebuildSummary};

/// Engine with its ledger rebuilt from a chain file.
pub struct LoadedChain {
    pub engine: Engine,
    pub chain: MemoryChain,
    pub summary: RebuildSummary,
}

impl LoadedChain {
    pub fn tip_height(&self) -> Option<u64> {
        self.chain.tip_height()
    }
}

/// Read the chain file
pub fn load_chain(chain_path: &Path) -> Result<MemoryChain> {
    MemoryChain::load(chain_path)
        .with_context(|| format!("Failed to load chain from {}", chain_path.display()))
}

/// Load config and chain, then rebuild loyalty state from the chain.
pub fn load_engine(config_path: &Path, chain_path: &Path) -> Result<LoadedChain> {
    let config = Config::load_or_default(config_path)?;
    let chain = load_chain(chain_path)?;

    let engine = Engine::new(config);
    let summary = engine.rebuild(&chain);

    Ok(LoadedChain {
        engine,
        chain,
        summary,
    })
}
