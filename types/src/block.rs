//! Blocks, entries and the chain tip.
//!
//! Field names on the wire are kept short and stable (`T`, `created`,
//! `miner`, `prevId`) because a block's identifier is the hash of exactly
//! this serialized shape.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::digest::parse_hex32;
use crate::{BlockId, Digest, Timestamp, TypesError};

/// Discriminator carried in every block as `"type": "block"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[default]
    #[serde(rename = "block")]
    Block,
}

/// A key/hash assertion anchored by a block. Equality is by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    pub key: String,
    pub hash: Digest,
}

impl Entry {
    pub fn new(key: impl Into<String>, hash: Digest) -> Self {
        Self {
            key: key.into(),
            hash,
        }
    }
}

/// Proof-of-work nonce: 256 bits, always rendered as 64 zero-padded hex chars.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Nonce([u8; 32]);

impl Nonce {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Big-endian increment, wrapping at 2^256.
    pub fn increment(&mut self) {
        self.advance(1);
    }

    /// Big-endian addition of `step`, wrapping at 2^256.
    pub fn advance(&mut self, step: u64) {
        let mut carry = step as u128;
        for byte in self.0.iter_mut().rev() {
            if carry == 0 {
                break;
            }
            let sum = *byte as u128 + (carry & 0xff);
            *byte = sum as u8;
            carry = (carry >> 8) + (sum >> 8);
        }
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", self)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Nonce {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex32(s).map(Self)
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A block of the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Proof-of-work threshold: the block id must sort strictly below it.
    #[serde(rename = "T")]
    pub target: Digest,
    #[serde(rename = "created")]
    pub created_at: Timestamp,
    #[serde(rename = "miner", default, skip_serializing_if = "Option::is_none")]
    pub miner_tag: Option<String>,
    pub nonce: Nonce,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub height: u64,
    #[serde(rename = "prevId", default)]
    pub prev_id: Option<BlockId>,
    pub entries: Vec<Entry>,
}

impl Block {
    pub fn is_genesis_shaped(&self) -> bool {
        self.prev_id.is_none()
    }

    pub fn contains_entry(&self, entry: &Entry) -> bool {
        self.entries.iter().any(|e| e == entry)
    }
}

/// The head of the locally adopted chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    #[serde(rename = "blockId")]
    pub block_id: BlockId,
    pub height: u64,
}

impl ChainTip {
    pub fn new(block_id: BlockId, height: u64) -> Self {
        Self { block_id, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            kind: BlockKind::Block,
            target: Digest::MAX,
            created_at: Timestamp::from_millis(1000),
            miner_tag: None,
            nonce: Nonce::default(),
            note: None,
            height: 1,
            prev_id: Some(Digest::new([7u8; 32])),
            entries: vec![Entry::new("k", Digest::new([9u8; 32]))],
        }
    }

    #[test]
    fn nonce_increment_carries() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0xff;
        bytes[30] = 0xff;
        let mut nonce = Nonce::new(bytes);
        nonce.increment();
        let s = nonce.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.ends_with("010000"));
    }

    #[test]
    fn nonce_wraps_at_max() {
        let mut nonce = Nonce::new([0xff; 32]);
        nonce.increment();
        assert_eq!(nonce, Nonce::default());
    }

    #[test]
    fn nonce_advance_matches_repeated_increment() {
        let mut a = Nonce::new([0x12; 32]);
        let mut b = a;
        a.advance(300);
        for _ in 0..300 {
            b.increment();
        }
        assert_eq!(a, b);
    }

    #[test]
    fn block_wire_field_names() {
        let json = serde_json::to_value(sample_block()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["type"], "block");
        assert!(obj.contains_key("T"));
        assert!(obj.contains_key("created"));
        assert!(obj.contains_key("prevId"));
        assert!(!obj.contains_key("miner"));
        assert!(!obj.contains_key("note"));
    }

    #[test]
    fn genesis_serializes_null_prev_id() {
        let mut block = sample_block();
        block.prev_id = None;
        let json = serde_json::to_value(&block).unwrap();
        assert!(json["prevId"].is_null());
        assert!(block.is_genesis_shaped());
    }

    #[test]
    fn rejects_unknown_fields_and_wrong_kind() {
        let mut json = serde_json::to_value(sample_block()).unwrap();
        json["extra"] = serde_json::json!(1);
        assert!(serde_json::from_value::<Block>(json).is_err());

        let mut json = serde_json::to_value(sample_block()).unwrap();
        json["type"] = serde_json::json!("chainTip");
        assert!(serde_json::from_value::<Block>(json).is_err());
    }

    #[test]
    fn entry_equality_is_by_value() {
        let a = Entry::new("key", Digest::new([1u8; 32]));
        let b = Entry::new(String::from("key"), Digest::new([1u8; 32]));
        assert_eq!(a, b);
        assert!(sample_block().contains_entry(&Entry::new("k", Digest::new([9u8; 32]))));
    }
}
