// Copyright (c) 2024 Botho Foundation

//! The slice of block structure the loyalty engine reads.
//!
//! Full validation lives in the node. Here a block is a header carrying its
//! timestamp plus an ordered list of transactions, the first of which is the
//! coinbase.

use serde::{Deserialize, Serialize};

use crate::script::Script;

/// A transaction output: value in base units and its locking script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount in base units
    pub value: u64,

    /// Locking script (`scriptPubKey`)
    pub script_pubkey: Script,
}

impl TxOutput {
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }
}

/// A transaction as seen by the loyalty engine (outputs only).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(outputs: Vec<TxOutput>) -> Self {
        Self { outputs }
    }
}

/// Block header fields the engine depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block timestamp (unix seconds)
    pub timestamp: u64,
}

/// A connected block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,

    /// Transactions in block order; index 0 is the coinbase
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(timestamp: u64, transactions: Vec<Transaction>) -> Self {
        Self {
            header: BlockHeader { timestamp },
            transactions,
        }
    }

    /// The coinbase transaction, if the block has any transactions.
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    /// Recorded block time (unix seconds)
    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }
}
