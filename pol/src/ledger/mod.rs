//! Per-tag loyalty accrual state.

mod store;

pub use store::LoyaltyLedger;

use serde::Serialize;
use thiserror::Error;

use crate::level;

/// Upper bound of the point score.
pub const MAX_POINTS: u8 = 24;

/// Points granted for the first block of an active period.
pub const ACTIVE_PERIOD_POINTS: i64 = 2;

/// Points removed for each whole period without a block.
pub const MISSED_PERIOD_PENALTY: i64 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Block at height {height} connected out of order (last connected height {last})")]
    OutOfOrder { height: u64, last: u64 },
}

/// Accrual state of one miner tag.
///
/// An unseen status has every field at its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagStatus {
    pub seen: bool,

    /// Height of the first block carrying the tag
    pub first_seen_height: Option<u64>,

    /// Height of the latest block carrying the tag
    pub last_seen_height: Option<u64>,

    /// Number of blocks carrying the tag
    pub blocks_seen: u64,

    /// Timestamp of the latest block carrying the tag (unix seconds)
    pub last_seen_time: u64,

    /// Loyalty score, always within `0..=MAX_POINTS`
    pub points: u8,

    /// Accrual period of the latest block carrying the tag
    pub last_seen_period: Option<u64>,
}

impl TagStatus {
    /// Display level for this status.
    pub fn level(&self) -> u8 {
        level::level(self.seen, self.points)
    }

    /// Apply one block sighting. This is the only way a status changes.
    ///
    /// The first block of a period is worth [`ACTIVE_PERIOD_POINTS`]; every
    /// period skipped since the last active one costs
    /// [`MISSED_PERIOD_PENALTY`]. Further blocks inside the same period only
    /// move the height, time and block counters.
    fn record_sighting(&mut self, height: u64, period: u64, block_time: u64) {
        if !self.seen {
            self.seen = true;
            self.first_seen_height = Some(height);
            self.last_seen_period = Some(period);
            self.points = clamp_points(i64::from(self.points) + ACTIVE_PERIOD_POINTS);
        } else if let Some(last) = self.last_seen_period.filter(|last| period > *last) {
            let missed = i64::try_from(period - last - 1).unwrap_or(i64::MAX);
            let points = i64::from(self.points)
                .saturating_sub(missed.saturating_mul(MISSED_PERIOD_PENALTY))
                .saturating_add(ACTIVE_PERIOD_POINTS);
            self.points = clamp_points(points);
            self.last_seen_period = Some(period);
        }

        self.last_seen_height = Some(height);
        self.last_seen_time = block_time;
        self.blocks_seen += 1;
    }
}

fn clamp_points(points: i64) -> u8 {
    points.clamp(0, i64::from(MAX_POINTS)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sighting() {
        let mut status = TagStatus::default();
        status.record_sighting(5, 0, 1000);

        assert_eq!(
            status,
            TagStatus {
                seen: true,
                first_seen_height: Some(5),
                last_seen_height: Some(5),
                blocks_seen: 1,
                last_seen_time: 1000,
                points: 2,
                last_seen_period: Some(0),
            }
        );
        assert_eq!(status.level(), 1);
    }

    #[test]
    fn test_same_period_adds_nothing() {
        let mut status = TagStatus::default();
        status.record_sighting(1, 0, 10);
        status.record_sighting(2, 0, 20);
        status.record_sighting(3, 0, 30);

        assert_eq!(status.points, 2);
        assert_eq!(status.blocks_seen, 3);
        assert_eq!(status.first_seen_height, Some(1));
        assert_eq!(status.last_seen_height, Some(3));
        assert_eq!(status.last_seen_time, 30);
    }

    #[test]
    fn test_consecutive_periods() {
        let mut status = TagStatus::default();
        for period in 0..5 {
            status.record_sighting(period * 10, period, 0);
        }
        assert_eq!(status.points, 10);
    }

    #[test]
    fn test_missed_period_penalty() {
        let mut status = TagStatus::default();
        status.record_sighting(5, 0, 0);
        status.record_sighting(25, 2, 0);
        assert_eq!(status.points, 3);
        assert_eq!(status.last_seen_period, Some(2));
    }

    #[test]
    fn test_long_absence_floors_at_zero() {
        let mut status = TagStatus::default();
        status.record_sighting(0, 0, 0);
        status.record_sighting(1, 10, 0);
        assert_eq!(status.points, 0);

        // Far-future period must not overflow
        status.record_sighting(2, u64::MAX, 0);
        assert_eq!(status.points, 0);
    }

    #[test]
    fn test_points_cap_at_max() {
        let mut status = TagStatus::default();
        for period in 0..40 {
            status.record_sighting(period, period, 0);
            assert!(status.points <= MAX_POINTS);
        }
        assert_eq!(status.points, MAX_POINTS);
        assert_eq!(status.level(), 12);
    }

    #[test]
    fn test_unseen_default_level() {
        assert_eq!(TagStatus::default().level(), 0);
    }
}
