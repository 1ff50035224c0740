// Copyright (c) 2024 Botho Foundation

//! Locking scripts and a non-executing opcode reader.
//!
//! The loyalty engine never evaluates scripts. It only needs to walk the
//! opcode stream of a coinbase output far enough to recognise a null-data
//! marker, and to hash raw script bytes when attributing payouts. Anything
//! that does not decode cleanly is reported as a [`ScriptError`] instead of
//! panicking, since scripts arrive straight from block data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Empty push.
pub const OP_0: u8 = 0x00;
/// Largest opcode that pushes its own value as a byte count.
pub const OP_PUSHBYTES_75: u8 = 0x4b;
/// Next byte holds the push length.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Next two bytes (little-endian) hold the push length.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Next four bytes (little-endian) hold the push length.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Marks an output as provably unspendable (null data carrier).
pub const OP_RETURN: u8 = 0x6a;

/// Scripts above this size can never be spent.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("opcode 0x{opcode:02x} at offset {offset} is missing its length bytes")]
    TruncatedLength { opcode: u8, offset: usize },

    #[error("push of {len} bytes at offset {offset} runs past the end of the script")]
    TruncatedPush { offset: usize, len: usize },
}

/// Raw locking script bytes (a `scriptPubKey`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script(#[serde(with = "hex_bytes")] Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Build an `OP_RETURN <payload>` null-data script using the smallest
    /// push encoding for the payload.
    pub fn null_data(payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + 3);
        bytes.push(OP_RETURN);
        push_slice(&mut bytes, payload);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if no spend can ever satisfy this script.
    pub fn is_unspendable(&self) -> bool {
        self.0.first() == Some(&OP_RETURN) || self.0.len() > MAX_SCRIPT_SIZE
    }

    /// Iterate over the opcodes and pushes of this script.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            bytes: &self.0,
            pos: 0,
            done: false,
        }
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// A single decoded script element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// A data push (including the empty push `OP_0`).
    Push(&'a [u8]),
    /// Any non-push opcode.
    Op(u8),
}

/// Iterator over script instructions.
///
/// Yields a single `Err` on the first malformed element and then stops.
pub struct Instructions<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Instructions<'a> {
    fn read_len(&mut self, opcode: u8, width: usize) -> Result<usize, ScriptError> {
        let offset = self.pos - 1;
        let raw = self
            .bytes
            .get(self.pos..self.pos + width)
            .ok_or(ScriptError::TruncatedLength { opcode, offset })?;
        self.pos += width;

        let mut buf = [0u8; 4];
        buf[..width].copy_from_slice(raw);
        Ok(u32::from_le_bytes(buf) as usize)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ScriptError> {
        let offset = self.pos;
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ScriptError::TruncatedPush { offset, len })?;
        self.pos = end;
        Ok(&self.bytes[offset..end])
    }

    fn next_instruction(&mut self, opcode: u8) -> Result<Instruction<'a>, ScriptError> {
        let len = match opcode {
            OP_0 => return Ok(Instruction::Push(&[])),
            0x01..=OP_PUSHBYTES_75 => opcode as usize,
            OP_PUSHDATA1 => self.read_len(opcode, 1)?,
            OP_PUSHDATA2 => self.read_len(opcode, 2)?,
            OP_PUSHDATA4 => self.read_len(opcode, 4)?,
            _ => return Ok(Instruction::Op(opcode)),
        };
        self.take(len).map(Instruction::Push)
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(&opcode) = self.bytes.get(self.pos) else {
            self.done = true;
            return None;
        };
        self.pos += 1;

        let item = self.next_instruction(opcode);
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

/// Append `data` to `script` as a minimally encoded push.
pub fn push_slice(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len <= OP_PUSHBYTES_75 as usize {
        script.push(len as u8);
    } else if len <= u8::MAX as usize {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= u16::MAX as usize {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// Serialize byte vectors as lowercase hex strings.
pub(crate) mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(D::Error::custom)
    }
}
