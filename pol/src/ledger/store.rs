// Copyright (c) 2024 Botho Foundation

//! Thread-safe loyalty table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{LedgerError, TagStatus};
use crate::block::Block;
use crate::config::LoyaltyConfig;
use crate::metrics::LoyaltyMetrics;
use crate::tag::{extract_tag, MinerTag};

#[derive(Default)]
struct LedgerState {
    tags: HashMap<MinerTag, TagStatus>,
    /// Height of the last block passed in, tagged or not
    last_connected: Option<u64>,
}

/// Loyalty state for every miner tag seen since the start height.
///
/// One writer connects blocks in strictly increasing height order while any
/// number of readers query it. The whole table sits behind a single lock, so
/// a reader sees each entry either before or after an update, never halfway.
pub struct LoyaltyLedger {
    config: LoyaltyConfig,
    state: RwLock<LedgerState>,
    metrics: Option<Arc<LoyaltyMetrics>>,
}

impl LoyaltyLedger {
    pub fn new(config: LoyaltyConfig) -> Self {
        Self {
            config,
            state: RwLock::new(LedgerState::default()),
            metrics: None,
        }
    }

    /// Create a ledger that reports into `metrics`.
    pub fn with_metrics(config: LoyaltyConfig, metrics: Arc<LoyaltyMetrics>) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &LoyaltyConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&LoyaltyMetrics> {
        self.metrics.as_deref()
    }

    /// Connect a block to the ledger.
    ///
    /// Blocks below the start height are recorded as connected but otherwise
    /// ignored. Returns the tag credited, if any.
    pub fn connect_block(
        &self,
        block: &Block,
        height: u64,
        block_time: u64,
    ) -> Result<Option<MinerTag>, LedgerError> {
        let tag = if height >= self.config.start_height() {
            extract_tag(block)
        } else {
            None
        };

        let mut state = self.state.write();
        check_order(&state, height)?;
        state.last_connected = Some(height);

        if let Some(metrics) = &self.metrics {
            metrics.blocks_connected.inc();
        }

        if let Some(tag) = &tag {
            self.apply(&mut state, tag, height, block_time);
        }
        Ok(tag)
    }

    /// Credit `tag` with a block at `height`.
    ///
    /// This is the accrual step of [`connect_block`](Self::connect_block) for
    /// callers that extracted the tag themselves. The height must still be
    /// above every height connected so far.
    pub fn update(
        &self,
        tag: &MinerTag,
        height: u64,
        block_time: u64,
    ) -> Result<TagStatus, LedgerError> {
        let mut state = self.state.write();
        check_order(&state, height)?;
        state.last_connected = Some(height);

        if let Some(metrics) = &self.metrics {
            metrics.blocks_connected.inc();
        }

        Ok(self.apply(&mut state, tag, height, block_time))
    }

    fn apply(
        &self,
        state: &mut LedgerState,
        tag: &MinerTag,
        height: u64,
        block_time: u64,
    ) -> TagStatus {
        let period = self.config.period_index(height);
        let status = state.tags.entry(tag.clone()).or_default();
        status.record_sighting(height, period, block_time);
        let status = status.clone();

        debug!(
            height,
            tag = %tag,
            len = tag.len(),
            points = status.points,
            period,
            "Credited miner tag"
        );

        if let Some(metrics) = &self.metrics {
            metrics.tagged_blocks.inc();
            metrics.tags_tracked.set(state.tags.len() as i64);
        }
        status
    }

    /// Snapshot of a tag's status, `None` if it has never been seen.
    pub fn status(&self, tag: &MinerTag) -> Option<TagStatus> {
        self.state.read().tags.get(tag).cloned()
    }

    /// Points held by `tag`, 0 if unseen.
    pub fn points(&self, tag: &MinerTag) -> u8 {
        self.state
            .read()
            .tags
            .get(tag)
            .map(|status| status.points)
            .unwrap_or(0)
    }

    /// Number of distinct tags tracked
    pub fn len(&self) -> usize {
        self.state.read().tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().tags.is_empty()
    }

    /// Height of the last connected block
    pub fn last_connected_height(&self) -> Option<u64> {
        self.state.read().last_connected
    }

    /// Copy of the whole table.
    pub fn snapshot(&self) -> HashMap<MinerTag, TagStatus> {
        self.state.read().tags.clone()
    }

    /// Drop every entry and forget the last connected height.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.tags.clear();
        state.last_connected = None;

        if let Some(metrics) = &self.metrics {
            metrics.tags_tracked.set(0);
        }
    }
}

fn check_order(state: &LedgerState, height: u64) -> Result<(), LedgerError> {
    match state.last_connected {
        Some(last) if height <= last => Err(LedgerError::OutOfOrder { height, last }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Transaction, TxOutput};
    use crate::ledger::MAX_POINTS;
    use crate::script::Script;

    fn config(period_blocks: i64) -> LoyaltyConfig {
        LoyaltyConfig {
            period_blocks,
            ..Default::default()
        }
    }

    fn tag(byte: u8) -> MinerTag {
        MinerTag::from_bytes(&[byte; 12]).unwrap()
    }

    fn tagged_block(tag: &MinerTag, time: u64) -> Block {
        let coinbase = Transaction::new(vec![
            TxOutput::new(50, Script::new(vec![0x51])),
            TxOutput::new(0, tag.marker_script()),
        ]);
        Block::new(time, vec![coinbase])
    }

    #[test]
    fn test_first_update_gives_two_points() {
        let ledger = LoyaltyLedger::new(config(10));
        let status = ledger.update(&tag(1), 5, 100).unwrap();

        assert!(status.seen);
        assert_eq!(status.points, 2);
        assert_eq!(ledger.status(&tag(1)), Some(status));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_missed_period_case() {
        let ledger = LoyaltyLedger::new(config(10));
        ledger.update(&tag(1), 5, 0).unwrap();
        let status = ledger.update(&tag(1), 25, 0).unwrap();
        assert_eq!(status.points, 3);
    }

    #[test]
    fn test_same_period_no_points() {
        let ledger = LoyaltyLedger::new(config(10));
        for height in 10..20 {
            ledger.update(&tag(1), height, height).unwrap();
        }
        let status = ledger.status(&tag(1)).unwrap();
        assert_eq!(status.points, 2);
        assert_eq!(status.blocks_seen, 10);
        assert_eq!(status.last_seen_time, 19);
    }

    #[test]
    fn test_points_stay_in_range() {
        let ledger = LoyaltyLedger::new(config(1));
        for height in (1..200).step_by(3) {
            let status = ledger.update(&tag(1), height, 0).unwrap();
            assert!(status.points <= MAX_POINTS);
        }
    }

    #[test]
    fn test_out_of_order_rejected() {
        let ledger = LoyaltyLedger::new(config(10));
        ledger.update(&tag(1), 7, 0).unwrap();

        assert_eq!(
            ledger.update(&tag(1), 7, 0),
            Err(LedgerError::OutOfOrder { height: 7, last: 7 })
        );
        assert_eq!(
            ledger.connect_block(&Block::default(), 3, 0),
            Err(LedgerError::OutOfOrder { height: 3, last: 7 })
        );
        assert_eq!(ledger.status(&tag(1)).unwrap().blocks_seen, 1);
    }

    #[test]
    fn test_connect_block_extracts_tag() {
        let ledger = LoyaltyLedger::new(config(10));
        let credited = ledger.connect_block(&tagged_block(&tag(9), 42), 3, 42).unwrap();

        assert_eq!(credited, Some(tag(9)));
        assert_eq!(ledger.status(&tag(9)).unwrap().last_seen_time, 42);
        assert_eq!(ledger.last_connected_height(), Some(3));
    }

    #[test]
    fn test_untagged_block_advances_height_only() {
        let ledger = LoyaltyLedger::new(config(10));
        assert_eq!(ledger.connect_block(&Block::default(), 4, 0).unwrap(), None);
        assert!(ledger.is_empty());
        assert_eq!(ledger.last_connected_height(), Some(4));
    }

    #[test]
    fn test_inert_below_start_height() {
        let ledger = LoyaltyLedger::new(LoyaltyConfig {
            start_height: 100,
            ..Default::default()
        });

        let block = tagged_block(&tag(2), 0);
        assert_eq!(ledger.connect_block(&block, 99, 0).unwrap(), None);
        assert!(ledger.is_empty());

        assert_eq!(ledger.connect_block(&block, 100, 0).unwrap(), Some(tag(2)));
        assert_eq!(ledger.points(&tag(2)), 2);
    }

    #[test]
    fn test_clear_resets_order() {
        let ledger = LoyaltyLedger::new(config(10));
        ledger.update(&tag(1), 50, 0).unwrap();
        ledger.clear();

        assert!(ledger.is_empty());
        assert_eq!(ledger.last_connected_height(), None);
        assert!(ledger.update(&tag(1), 1, 0).is_ok());
    }

    #[test]
    fn test_unseen_tag() {
        let ledger = LoyaltyLedger::new(config(10));
        assert_eq!(ledger.status(&tag(5)), None);
        assert_eq!(ledger.points(&tag(5)), 0);
    }

    #[test]
    fn test_metrics_follow_ledger() {
        let metrics = Arc::new(LoyaltyMetrics::new());
        let ledger = LoyaltyLedger::with_metrics(config(10), metrics.clone());

        ledger.connect_block(&Block::default(), 1, 0).unwrap();
        ledger.connect_block(&tagged_block(&tag(1), 0), 2, 0).unwrap();
        ledger.connect_block(&tagged_block(&tag(2), 0), 3, 0).unwrap();

        assert_eq!(metrics.blocks_connected.get(), 3);
        assert_eq!(metrics.tagged_blocks.get(), 2);
        assert_eq!(metrics.tags_tracked.get(), 2);

        ledger.clear();
        assert_eq!(metrics.tags_tracked.get(), 0);
    }
}
