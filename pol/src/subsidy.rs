// Copyright (c) 2024 Botho Foundation

//! Loyalty-weighted subsidy split.
//!
//! Every block subsidy `S` is split into two halves:
//!
//! ```text
//! base       = S / 2            (truncating)
//! loyal_half = S - base         (gets the odd unit)
//! allowed    = base + floor(loyal_half * points / 24)
//! ```
//!
//! A miner with no loyalty points may claim only `base`; a miner at the
//! maximum of 24 points may claim the full `S`. The order above (truncate the
//! base first, give the remainder to the loyalty half) is consensus-relevant:
//! computing `loyal_half` as `S / 2` instead would lose a unit on odd
//! subsidies at full loyalty.

use serde::Serialize;

use crate::emission::EmissionSchedule;
use crate::ledger::MAX_POINTS;

/// How a height's subsidy is divided for a given point score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubsidySplit {
    /// Unmodified schedule value
    pub full: u64,
    /// Half every miner may claim
    pub base: u64,
    /// Half unlocked by loyalty
    pub loyal_half: u64,
    /// Portion of `loyal_half` unlocked by the points
    pub bonus: u64,
    /// `base + bonus`
    pub allowed: u64,
}

impl SubsidySplit {
    /// Split `full` for a score of `points` (values above 24 count as 24).
    pub fn new(full: u64, points: u8) -> Self {
        let base = full / 2;
        let loyal_half = full - base;
        let points = points.min(MAX_POINTS);
        let bonus = (loyal_half as u128 * points as u128 / MAX_POINTS as u128) as u64;

        Self {
            full,
            base,
            loyal_half,
            bonus,
            allowed: base + bonus,
        }
    }
}

/// Half of the schedule value at `height`, truncating.
pub fn base_subsidy<S>(schedule: &S, height: u64) -> u64
where
    S: EmissionSchedule + ?Sized,
{
    schedule.block_subsidy(height) / 2
}

/// Subsidy a miner holding `points` may claim at `height`.
pub fn allowed_subsidy<S>(schedule: &S, height: u64, points: u8) -> u64
where
    S: EmissionSchedule + ?Sized,
{
    SubsidySplit::new(schedule.block_subsidy(height), points).allowed
}
