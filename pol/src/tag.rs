// Copyright (c) 2024 Botho Foundation

//! Miner identity tags.
//!
//! A miner tag is the pseudonymous identity loyalty points accrue to. Pool
//! software embeds it in the coinbase as
//!
//! ```text
//! OP_RETURN <push: "MFLEXID" || tag>
//! ```
//!
//! where the tag is 4, 8 or 12 bytes. The canonical form is 12 bytes: the
//! first 12 bytes of SHA-256 over the miner's payout address string (with any
//! `.worker` suffix removed). The same truncated hash over a raw output script
//! attributes coinbase value to a tag.

use std::fmt;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::block::Block;
use crate::script::{Instruction, Script, OP_RETURN};

/// Canonical tag length in bytes.
pub const TAG_LEN: usize = 12;

/// ASCII marker that precedes the tag inside the null-data push.
pub const TAG_MARKER: [u8; 7] = *b"MFLEXID";

/// Separator between a payout address and a worker name (`addr.rig01`).
pub const WORKER_SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("miner tag must be 4, 8 or 12 bytes, got {0}")]
    InvalidLength(usize),

    #[error("miner tag must be 8, 16 or 24 hex chars, got {0}")]
    InvalidHexLength(usize),

    #[error("miner tag must be hex: {0}")]
    InvalidHex(String),
}

/// A miner identity tag (4, 8 or 12 bytes). Equality is byte-exact.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinerTag(Vec<u8>);

impl MinerTag {
    /// Accepted tag lengths, short legacy forms first.
    pub const VALID_LENGTHS: [usize; 3] = [4, 8, TAG_LEN];

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TagError> {
        if !Self::VALID_LENGTHS.contains(&bytes.len()) {
            return Err(TagError::InvalidLength(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Parse a tag from 8, 16 or 24 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, TagError> {
        if !matches!(s.len(), 8 | 16 | 24) {
            return Err(TagError::InvalidHexLength(s.len()));
        }
        let bytes = hex::decode(s).map_err(|e| TagError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
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

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Little-endian u32 of the first four bytes.
    ///
    /// Stratum servers use this as the extranonce1 value for the miner.
    pub fn prefix_u32(&self) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.0[..4]);
        u32::from_le_bytes(buf)
    }

    /// The `OP_RETURN` marker script that announces this tag in a coinbase.
    pub fn marker_script(&self) -> Script {
        let mut payload = Vec::with_capacity(TAG_MARKER.len() + self.0.len());
        payload.extend_from_slice(&TAG_MARKER);
        payload.extend_from_slice(&self.0);
        Script::null_data(&payload)
    }

    fn from_digest(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(hash[..TAG_LEN].to_vec())
    }
}

impl fmt::Display for MinerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for MinerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MinerTag({})", self.to_hex())
    }
}

impl Serialize for MinerTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for MinerTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        MinerTag::from_hex(&s).map_err(D::Error::custom)
    }
}

/// Find the miner tag announced in a block's coinbase.
///
/// Returns the first output whose script is `OP_RETURN` followed by a push of
/// `MFLEXID` and a 4, 8 or 12 byte tag. Malformed scripts are skipped.
pub fn extract_tag(block: &Block) -> Option<MinerTag> {
    block
        .coinbase()?
        .outputs
        .iter()
        .find_map(|out| tag_from_marker(&out.script_pubkey))
}

fn tag_from_marker(script: &Script) -> Option<MinerTag> {
    let mut ops = script.instructions();

    if ops.next()? != Ok(Instruction::Op(OP_RETURN)) {
        return None;
    }
    let Ok(Instruction::Push(payload)) = ops.next()? else {
        return None;
    };

    let tag = payload.strip_prefix(&TAG_MARKER[..])?;
    MinerTag::from_bytes(tag).ok()
}

/// Strip a `.worker` suffix from a stratum username.
pub fn strip_worker_suffix(address: &str) -> &str {
    match address.find(WORKER_SEPARATOR) {
        Some(pos) => &address[..pos],
        None => address,
    }
}

/// Canonical tag for a payout address: `SHA256(address)[..12]`.
///
/// Anything from the first `.` on is a worker name and is ignored.
pub fn tag_from_address(address: &str) -> MinerTag {
    MinerTag::from_digest(strip_worker_suffix(address).as_bytes())
}

/// Tag for a locking script: `SHA256(script bytes)[..12]`.
pub fn tag_from_script(script: &Script) -> MinerTag {
    MinerTag::from_digest(script.as_bytes())
}

/// Total coinbase value paid to spendable scripts that hash to `tag`.
pub fn coinbase_value_to_tag(block: &Block, tag: &MinerTag) -> u64 {
    let Some(coinbase) = block.coinbase() else {
        return 0;
    };

    coinbase
        .outputs
        .iter()
        .filter(|out| out.value > 0 && !out.script_pubkey.is_unspendable())
        .filter(|out| tag_from_script(&out.script_pubkey) == *tag)
        .fold(0u64, |acc, out| acc.saturating_add(out.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Transaction, TxOutput};
    use crate::script::{OP_PUSHDATA1, OP_RETURN};

    fn coinbase_block(scripts: Vec<Script>) -> Block {
        let outputs = scripts.into_iter().map(|s| TxOutput::new(0, s)).collect();
        Block::new(0, vec![Transaction::new(outputs)])
    }

    fn marker(tag: &[u8]) -> Script {
        let mut payload = TAG_MARKER.to_vec();
        payload.extend_from_slice(tag);
        Script::null_data(&payload)
    }

    #[test]
    fn test_extract_twelve_byte_tag() {
        let tag = [0xabu8; 12];
        let block = coinbase_block(vec![Script::new(vec![0x51]), marker(&tag)]);
        assert_eq!(extract_tag(&block).unwrap().as_bytes(), &tag);
    }

    #[test]
    fn test_extract_short_tags() {
        for len in [4usize, 8] {
            let tag = vec![0x11u8; len];
            let block = coinbase_block(vec![marker(&tag)]);
            assert_eq!(extract_tag(&block).unwrap().len(), len);
        }
    }

    #[test]
    fn test_extract_returns_first_match() {
        let block = coinbase_block(vec![marker(&[1u8; 4]), marker(&[2u8; 12])]);
        assert_eq!(extract_tag(&block).unwrap().as_bytes(), &[1u8; 4]);
    }

    #[test]
    fn test_extract_rejects_bad_lengths() {
        for len in [0usize, 3, 5, 11, 13, 16] {
            let block = coinbase_block(vec![marker(&vec![9u8; len])]);
            assert!(extract_tag(&block).is_none(), "len {len} must be rejected");
        }
    }

    #[test]
    fn test_extract_rejects_wrong_prefix() {
        let mut payload = b"MFLEXIX".to_vec();
        payload.extend_from_slice(&[1u8; 12]);
        let block = coinbase_block(vec![Script::null_data(&payload)]);
        assert!(extract_tag(&block).is_none());
    }

    #[test]
    fn test_extract_rejects_wrong_opcode() {
        let mut script = marker(&[1u8; 12]).as_bytes().to_vec();
        script[0] = 0x51;
        assert!(extract_tag(&coinbase_block(vec![Script::new(script)])).is_none());
    }

    #[test]
    fn test_extract_survives_truncated_scripts() {
        let truncated = vec![
            Script::new(vec![OP_RETURN]),
            Script::new(vec![OP_RETURN, 19, b'M', b'F']),
            Script::new(vec![OP_RETURN, OP_PUSHDATA1]),
            Script::default(),
        ];
        assert!(extract_tag(&coinbase_block(truncated)).is_none());
    }

    #[test]
    fn test_extract_skips_malformed_then_finds_valid() {
        let block = coinbase_block(vec![
            Script::new(vec![OP_RETURN, 40, 1]),
            marker(&[5u8; 8]),
        ]);
        assert_eq!(extract_tag(&block).unwrap().as_bytes(), &[5u8; 8]);
    }

    #[test]
    fn test_extract_empty_block_and_coinbase() {
        assert!(extract_tag(&Block::default()).is_none());
        assert!(extract_tag(&Block::new(0, vec![Transaction::default()])).is_none());
    }

    #[test]
    fn test_extract_ignores_non_coinbase() {
        let coinbase = Transaction::new(vec![TxOutput::new(50, Script::new(vec![0x51]))]);
        let spend = Transaction::new(vec![TxOutput::new(0, marker(&[3u8; 12]))]);
        assert!(extract_tag(&Block::new(0, vec![coinbase, spend])).is_none());
    }

    #[test]
    fn test_marker_script_extracts_back() {
        let tag = tag_from_address("mflex1qexampleaddress");
        let block = coinbase_block(vec![tag.marker_script()]);
        assert_eq!(extract_tag(&block), Some(tag));
    }

    #[test]
    fn test_tag_from_address_strips_worker() {
        let plain = tag_from_address("mflex1qminer");
        assert_eq!(plain, tag_from_address("mflex1qminer.rig01"));
        assert_eq!(plain, tag_from_address("mflex1qminer.a.b"));
        assert_ne!(plain, tag_from_address("mflex1qminer2"));
        assert_eq!(plain.len(), TAG_LEN);
    }

    #[test]
    fn test_tag_from_address_known_vector() {
        // SHA256("abc") = ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad
        assert_eq!(tag_from_address("abc").to_hex(), "ba7816bf8f01cfea414140de");
        assert_eq!(tag_from_address("abc.worker").to_hex(), "ba7816bf8f01cfea414140de");
    }

    #[test]
    fn test_tag_from_script_hashes_raw_bytes() {
        let script = Script::new(b"abc".to_vec());
        assert_eq!(tag_from_script(&script).to_hex(), "ba7816bf8f01cfea414140de");
    }

    #[test]
    fn test_hex_parsing() {
        let tag = MinerTag::from_hex("714b9f7144591e13fb75d4d5").unwrap();
        assert_eq!(tag.len(), 12);
        assert_eq!(tag.to_string(), "714b9f7144591e13fb75d4d5");
        assert_eq!(MinerTag::from_hex("deadbeef").unwrap().len(), 4);

        assert_eq!(MinerTag::from_hex("abc"), Err(TagError::InvalidHexLength(3)));
        assert!(matches!(
            MinerTag::from_hex("zzzzzzzz"),
            Err(TagError::InvalidHex(_))
        ));
        assert_eq!(
            MinerTag::from_bytes(&[0u8; 5]),
            Err(TagError::InvalidLength(5))
        );
    }

    #[test]
    fn test_prefix_u32_little_endian() {
        let tag = MinerTag::from_hex("01020304").unwrap();
        assert_eq!(tag.prefix_u32(), 0x0403_0201);
    }

    #[test]
    fn test_short_tag_never_equals_canonical() {
        let long = MinerTag::from_hex("0102030405060708090a0b0c").unwrap();
        let short = MinerTag::from_hex("01020304").unwrap();
        assert_ne!(long, short);
    }

    #[test]
    fn test_coinbase_value_to_tag() {
        let payout = Script::new(vec![0x00, 0x14, 1, 2, 3]);
        let tag = tag_from_script(&payout);
        let other = Script::new(vec![0x51]);

        let coinbase = Transaction::new(vec![
            TxOutput::new(30, payout.clone()),
            TxOutput::new(0, payout.clone()),
            TxOutput::new(20, payout.clone()),
            TxOutput::new(7, other),
            TxOutput::new(99, tag.marker_script()),
        ]);
        let block = Block::new(0, vec![coinbase]);

        assert_eq!(coinbase_value_to_tag(&block, &tag), 50);
        assert_eq!(coinbase_value_to_tag(&Block::default(), &tag), 0);
    }

    #[test]
    fn test_unspendable_output_not_attributed() {
        let script = Script::null_data(b"payout");
        let tag = tag_from_script(&script);
        let block = Block::new(0, vec![Transaction::new(vec![TxOutput::new(10, script)])]);
        assert_eq!(coinbase_value_to_tag(&block, &tag), 0);
    }
}
