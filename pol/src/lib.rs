// Copyright (c) 2024 Botho Foundation

//! Proof-of-Loyalty subsidy engine.
//!
//! Miners announce a short tag in an `OP_RETURN` output of their coinbase.
//! The engine tracks, per tag, how consistently it has produced blocks across
//! fixed-length accrual periods and scales the block subsidy that tag may
//! claim: half of the subsidy is always available, the other half unlocks
//! with loyalty points.
//!
//! The entry point for a node is [`Engine`]: call
//! [`Engine::rebuild`] once at startup, [`Engine::on_connect_block`] for every
//! connected block, and the subsidy and status queries from anywhere.

#![deny(clippy::print_stdout)]

pub mod block;
pub mod config;
pub mod emission;
pub mod engine;
pub mod ledger;
pub mod level;
pub mod metrics;
pub mod rebuild;
pub mod rpc;
pub mod script;
pub mod subsidy;
pub mod tag;
pub mod telemetry;

// Re-export commands module for CLI binary
#[allow(clippy::print_stdout)]
pub mod commands;

pub use block::{Block, BlockHeader, Transaction, TxOutput};
pub use config::{Config, LoyaltyConfig};
pub use emission::{EmissionSchedule, HalvingSchedule, COIN};
pub use engine::Engine;
pub use ledger::{LedgerError, LoyaltyLedger, TagStatus, MAX_POINTS};
pub use rebuild::{rebuild, BlockSource, ChainError, MemoryChain, RebuildSummary};
pub use script::Script;
pub use subsidy::{allowed_subsidy, base_subsidy, SubsidySplit};
pub use tag::{extract_tag, tag_from_address, tag_from_script, MinerTag};
