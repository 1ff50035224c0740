// Copyright (c) 2024 Botho Foundation

//! Rebuild loyalty state from the stored chain.
//!
//! The ledger lives in memory only. On restart, blocks already on disk are not
//! re-connected, so the table is reconstructed by replaying every stored block
//! through the same connection path the live node uses.

use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::block::Block;
use crate::ledger::LoyaltyLedger;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Block at height {0} not found")]
    MissingBlock(u64),

    #[error("Block at height {height} unreadable: {reason}")]
    Unreadable { height: u64, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chain decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read access to the stored chain.
pub trait BlockSource: Send + Sync {
    /// Height of the best block, `None` for an empty chain.
    fn tip_height(&self) -> Option<u64>;

    /// Read the block stored at `height`.
    fn read_block(&self, height: u64) -> Result<Block, ChainError>;
}

/// Chain held in memory, indexed by height.
///
/// A `None` slot stands for a block that exists but cannot be read.
#[derive(Debug, Clone, Default)]
pub struct MemoryChain {
    blocks: Vec<Option<Block>>,
}

impl MemoryChain {
    pub fn new(blocks: Vec<Option<Block>>) -> Self {
        Self { blocks }
    }

    /// Load a chain from a JSON array of blocks (`null` for an unreadable one).
    pub fn load(path: &Path) -> Result<Self, ChainError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockSource for MemoryChain {
    fn tip_height(&self) -> Option<u64> {
        self.blocks.len().checked_sub(1).map(|tip| tip as u64)
    }

    fn read_block(&self, height: u64) -> Result<Block, ChainError> {
        let slot = usize::try_from(height)
            .ok()
            .and_then(|index| self.blocks.get(index))
            .ok_or(ChainError::MissingBlock(height))?;

        slot.clone().ok_or_else(|| ChainError::Unreadable {
            height,
            reason: "block data unavailable".to_string(),
        })
    }
}

/// Outcome of a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub start_height: u64,
    pub tip_height: Option<u64>,
    /// Blocks read and connected
    pub blocks_scanned: u64,
    /// Blocks that could not be read
    pub blocks_skipped: u64,
    /// Distinct tags in the ledger afterwards
    pub tags: usize,
}

/// Clear `ledger` and replay `start_height..=tip` from `source`.
///
/// Unreadable blocks are logged and skipped. An empty chain leaves the ledger
/// as it was.
pub fn rebuild(
    ledger: &LoyaltyLedger,
    source: &dyn BlockSource,
    start_height: u64,
) -> RebuildSummary {
    let mut summary = RebuildSummary {
        start_height,
        ..Default::default()
    };

    let Some(tip) = source.tip_height() else {
        info!("Chain is empty, nothing to rebuild");
        summary.tags = ledger.len();
        return summary;
    };
    summary.tip_height = Some(tip);

    ledger.clear();
    info!(start_height, tip, "Rebuilding loyalty state");

    for height in start_height..=tip {
        let block = match source.read_block(height) {
            Ok(block) => block,
            Err(e) => {
                warn!(height, error = %e, "Skipping unreadable block during rebuild");
                summary.blocks_skipped += 1;
                if let Some(metrics) = ledger.metrics() {
                    metrics.rebuild_skipped.inc();
                }
                continue;
            }
        };

        if let Err(e) = ledger.connect_block(&block, height, block.timestamp()) {
            warn!(height, error = %e, "Skipping block rejected by ledger");
            summary.blocks_skipped += 1;
            continue;
        }
        summary.blocks_scanned += 1;
    }

    summary.tags = ledger.len();
    info!(
        tip,
        scanned = summary.blocks_scanned,
        skipped = summary.blocks_skipped,
        tags = summary.tags,
        "Loyalty state rebuilt"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Transaction, TxOutput};
    use crate::config::LoyaltyConfig;
    use crate::metrics::LoyaltyMetrics;
    use crate::tag::MinerTag;
    use std::sync::Arc;

    fn config() -> LoyaltyConfig {
        LoyaltyConfig {
            start_height: 0,
            period_blocks: 10,
            ..Default::default()
        }
    }

    fn tagged(byte: u8, time: u64) -> Block {
        let tag = MinerTag::from_bytes(&[byte; 8]).unwrap();
        Block::new(
            time,
            vec![Transaction::new(vec![TxOutput::new(0, tag.marker_script())])],
        )
    }

    #[test]
    fn test_memory_chain_reads() {
        let chain = MemoryChain::new(vec![Some(tagged(1, 0)), None]);
        assert_eq!(chain.tip_height(), Some(1));
        assert!(chain.read_block(0).is_ok());
        assert!(matches!(
            chain.read_block(1),
            Err(ChainError::Unreadable { height: 1, .. })
        ));
        assert!(matches!(chain.read_block(2), Err(ChainError::MissingBlock(2))));
        assert_eq!(MemoryChain::default().tip_height(), None);
    }

    #[test]
    fn test_rebuild_matches_live() {
        let blocks: Vec<Block> = (0..40).map(|h| tagged((h % 3) as u8, 1000 + h)).collect();

        let live = LoyaltyLedger::new(config());
        for (height, block) in blocks.iter().enumerate() {
            live.connect_block(block, height as u64, block.timestamp()).unwrap();
        }

        let chain = MemoryChain::new(blocks.into_iter().map(Some).collect());
        let rebuilt = LoyaltyLedger::new(config());
        let summary = rebuild(&rebuilt, &chain, 0);

        assert_eq!(summary.blocks_scanned, 40);
        assert_eq!(summary.blocks_skipped, 0);
        assert_eq!(summary.tags, 3);
        assert_eq!(rebuilt.snapshot(), live.snapshot());
        assert_eq!(rebuilt.last_connected_height(), Some(39));
    }

    #[test]
    fn test_rebuild_skips_unreadable() {
        let chain = MemoryChain::new(vec![Some(tagged(1, 0)), None, Some(tagged(1, 2))]);
        let metrics = Arc::new(LoyaltyMetrics::new());
        let ledger = LoyaltyLedger::with_metrics(config(), metrics.clone());

        let summary = rebuild(&ledger, &chain, 0);

        assert_eq!(summary.blocks_scanned, 2);
        assert_eq!(summary.blocks_skipped, 1);
        assert_eq!(metrics.rebuild_skipped.get(), 1);
        let tag = MinerTag::from_bytes(&[1; 8]).unwrap();
        assert_eq!(ledger.status(&tag).unwrap().blocks_seen, 2);
    }

    #[test]
    fn test_rebuild_clears_previous_state() {
        let ledger = LoyaltyLedger::new(config());
        ledger.connect_block(&tagged(7, 0), 500, 0).unwrap();

        let chain = MemoryChain::new(vec![Some(tagged(1, 0))]);
        rebuild(&ledger, &chain, 0);

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.status(&MinerTag::from_bytes(&[7; 8]).unwrap()), None);
    }

    #[test]
    fn test_rebuild_empty_chain_untouched() {
        let ledger = LoyaltyLedger::new(config());
        ledger.connect_block(&tagged(7, 0), 5, 0).unwrap();

        let summary = rebuild(&ledger, &MemoryChain::default(), 0);
        assert_eq!(summary.tip_height, None);
        assert_eq!(summary.tags, 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_rebuild_start_height() {
        let chain = MemoryChain::new((0..5).map(|h| Some(tagged(1, h))).collect());
        let ledger = LoyaltyLedger::new(config());

        let summary = rebuild(&ledger, &chain, 3);
        assert_eq!(summary.blocks_scanned, 2);
        let tag = MinerTag::from_bytes(&[1; 8]).unwrap();
        assert_eq!(ledger.status(&tag).unwrap().first_seen_height, Some(3));
    }

    #[test]
    fn test_chain_from_json() {
        let json = r#"[
            {"header": {"timestamp": 10}, "transactions": []},
            null
        ]"#;
        let chain = MemoryChain::from_json(json).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.read_block(0).unwrap().timestamp(), 10);
        assert!(chain.read_block(1).is_err());

        assert!(matches!(
            MemoryChain::from_json("{"),
            Err(ChainError::Decode(_))
        ));
    }
}
