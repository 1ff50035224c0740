// Copyright (c) 2024 Botho Foundation

//! The loyalty engine as the node sees it.
//!
//! [`Engine`] bundles the ledger, the emission schedule it splits, and the
//! metrics registry. It is cheap to clone; clones share the same ledger.

use std::sync::Arc;

use crate::block::Block;
use crate::config::{Config, LoyaltyConfig};
use crate::emission::EmissionSchedule;
use crate::ledger::{LedgerError, LoyaltyLedger, TagStatus};
use crate::metrics::LoyaltyMetrics;
use crate::rebuild::{self, BlockSource, RebuildSummary};
use crate::subsidy::{self, SubsidySplit};
use crate::tag::{self, MinerTag};

#[derive(Clone)]
pub struct Engine {
    ledger: Arc<LoyaltyLedger>,
    schedule: Arc<dyn EmissionSchedule>,
    metrics: Arc<LoyaltyMetrics>,
}

impl Engine {
    /// Engine over the halving schedule named in `config`.
    pub fn new(config: Config) -> Self {
        let schedule = Arc::new(config.emission);
        Self::with_schedule(config.loyalty, schedule)
    }

    /// Engine over an arbitrary emission schedule.
    pub fn with_schedule(config: LoyaltyConfig, schedule: Arc<dyn EmissionSchedule>) -> Self {
        let metrics = Arc::new(LoyaltyMetrics::new());
        let ledger = Arc::new(LoyaltyLedger::with_metrics(config, metrics.clone()));
        Self {
            ledger,
            schedule,
            metrics,
        }
    }

    pub fn ledger(&self) -> &Arc<LoyaltyLedger> {
        &self.ledger
    }

    pub fn metrics(&self) -> &Arc<LoyaltyMetrics> {
        &self.metrics
    }

    pub fn schedule(&self) -> &dyn EmissionSchedule {
        self.schedule.as_ref()
    }

    pub fn config(&self) -> &LoyaltyConfig {
        self.ledger.config()
    }

    /// Hook for every block the node connects, in height order.
    pub fn on_connect_block(
        &self,
        block: &Block,
        height: u64,
        block_time: u64,
    ) -> Result<Option<MinerTag>, LedgerError> {
        self.ledger.connect_block(block, height, block_time)
    }

    /// Replay the stored chain from the configured start height.
    pub fn rebuild(&self, source: &dyn BlockSource) -> RebuildSummary {
        rebuild::rebuild(&self.ledger, source, self.start_height())
    }

    pub fn status(&self, tag: &MinerTag) -> Option<TagStatus> {
        self.ledger.status(tag)
    }

    /// Status of `tag`, the unseen default if it was never credited.
    pub fn status_or_default(&self, tag: &MinerTag) -> TagStatus {
        self.status(tag).unwrap_or_default()
    }

    pub fn extract_tag(&self, block: &Block) -> Option<MinerTag> {
        tag::extract_tag(block)
    }

    /// Full schedule value at `height`.
    pub fn block_subsidy(&self, height: u64) -> u64 {
        self.schedule.block_subsidy(height)
    }

    pub fn base_subsidy(&self, height: u64) -> u64 {
        subsidy::base_subsidy(self.schedule.as_ref(), height)
    }

    /// Subsidy the holder of `tag` may claim at `height`.
    pub fn allowed_subsidy(&self, tag: &MinerTag, height: u64) -> u64 {
        self.split(tag, height).allowed
    }

    /// Subsidy split for `tag` at `height`.
    pub fn split(&self, tag: &MinerTag, height: u64) -> SubsidySplit {
        SubsidySplit::new(self.block_subsidy(height), self.ledger.points(tag))
    }

    /// Largest coinbase subsidy a block at `height` may pay to `tag`.
    ///
    /// Below the enforcement height this is the unmodified schedule value.
    pub fn subsidy_limit(&self, tag: &MinerTag, height: u64) -> u64 {
        if height < self.enforce_height() {
            self.block_subsidy(height)
        } else {
            self.allowed_subsidy(tag, height)
        }
    }

    pub fn start_height(&self) -> u64 {
        self.config().start_height()
    }

    pub fn enforce_height(&self) -> u64 {
        self.config().enforce_height()
    }

    pub fn period_blocks(&self) -> Option<u64> {
        self.config().period_blocks()
    }

    pub fn extranonce1_size(&self) -> usize {
        self.config().extranonce1_size()
    }
}
