// Copyright (c) 2024 Botho Foundation

//! Base emission schedule.
//!
//! The loyalty engine never decides how much a height emits; it only splits
//! whatever the chain's schedule returns. The schedule is therefore a trait,
//! with a Bitcoin-style halving implementation for the node's own chain
//! parameters and a blanket impl so tests can pass a closure.

use serde::{Deserialize, Serialize};

/// Base units per whole coin.
pub const COIN: u64 = 100_000_000;

/// After this many halvings the shifted reward is zero.
pub const MAX_HALVINGS: u64 = 64;

/// The unmodified per-height block reward.
pub trait EmissionSchedule: Send + Sync {
    /// Full block subsidy at `height`, in base units.
    fn block_subsidy(&self, height: u64) -> u64;
}

impl<F> EmissionSchedule for F
where
    F: Fn(u64) -> u64 + Send + Sync,
{
    fn block_subsidy(&self, height: u64) -> u64 {
        self(height)
    }
}

/// Reward halves every `halving_interval` blocks until it reaches zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalvingSchedule {
    /// Reward at height 0, in base units
    #[serde(default = "default_initial_reward")]
    pub initial_reward: u64,

    /// Blocks between halvings
    #[serde(default = "default_halving_interval")]
    pub halving_interval: u64,
}

fn default_initial_reward() -> u64 {
    25 * COIN
}

fn default_halving_interval() -> u64 {
    210_000
}

impl Default for HalvingSchedule {
    fn default() -> Self {
        Self {
            initial_reward: default_initial_reward(),
            halving_interval: default_halving_interval(),
        }
    }
}

impl HalvingSchedule {
    pub fn new(initial_reward: u64, halving_interval: u64) -> Self {
        Self {
            initial_reward,
            halving_interval,
        }
    }

    /// Number of halvings that have happened by `height`.
    ///
    /// A zero interval means the reward never halves.
    pub fn halvings(&self, height: u64) -> u64 {
        if self.halving_interval == 0 {
            return 0;
        }
        height / self.halving_interval
    }
}

impl EmissionSchedule for HalvingSchedule {
    fn block_subsidy(&self, height: u64) -> u64 {
        let halvings = self.halvings(height);
        if halvings >= MAX_HALVINGS {
            return 0;
        }
        self.initial_reward >> halvings
    }
}

/// Render base units as a decimal coin amount with eight places.
pub fn format_coin(amount: u64) -> String {
    format!("{}.{:08}", amount / COIN, amount % COIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halving_schedule() {
        let schedule = HalvingSchedule::default();
        assert_eq!(schedule.block_subsidy(0), 25 * COIN);
        assert_eq!(schedule.block_subsidy(209_999), 25 * COIN);
        assert_eq!(schedule.block_subsidy(210_000), 25 * COIN / 2);
        assert_eq!(schedule.block_subsidy(420_000), 25 * COIN / 4);
    }

    #[test]
    fn test_halving_schedule_runs_out() {
        let schedule = HalvingSchedule::new(50 * COIN, 10);
        assert_eq!(schedule.block_subsidy(10 * 63), (50 * COIN) >> 63);
        assert_eq!(schedule.block_subsidy(10 * 64), 0);
        assert_eq!(schedule.block_subsidy(u64::MAX), 0);
    }

    #[test]
    fn test_zero_interval_never_halves() {
        let schedule = HalvingSchedule::new(1000, 0);
        assert_eq!(schedule.block_subsidy(u64::MAX), 1000);
    }

    #[test]
    fn test_closure_schedule() {
        let schedule = |height: u64| height * 2;
        assert_eq!(schedule.block_subsidy(21), 42);
    }

    #[test]
    fn test_format_coin() {
        assert_eq!(format_coin(0), "0.00000000");
        assert_eq!(format_coin(25 * COIN), "25.00000000");
        assert_eq!(format_coin(1_250_000_001), "12.50000001");
    }
}
