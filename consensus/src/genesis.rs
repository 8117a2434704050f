//! The well-known first block.
//!
//! Genesis is installed as trusted at start-up and is never run through
//! validation. Its id depends on the network's proof-of-work target, so
//! it is computed rather than hard-coded.

use valchain_crypto::{block_id, CodecError};
use valchain_types::{Block, BlockId, BlockKind, ConsensusParams, Nonce, Timestamp};

pub const GENESIS_CREATED: u64 = 1_624_219_079;
pub const GENESIS_MINER: &str = "Stanford";
pub const GENESIS_NOTE: &str =
    "The Economist 2021-06-20: Crypto-miners are probably to blame for the graphics-chip shortage";
const GENESIS_NONCE: [u8; 32] = [
    0xa2, 0x6d, 0x92, 0x80, 0x0c, 0xf5, 0x8e, 0x88, 0xa5, 0xec, 0xf3, 0x71, 0x56, 0xc0, 0x31, 0xa4,
    0x14, 0x7c, 0x21, 0x28, 0xbe, 0xea, 0xf1, 0xcc, 0xa2, 0x78, 0x5c, 0x93, 0x24, 0x2a, 0x5c, 0xb4,
];

pub fn genesis_block(params: &ConsensusParams) -> Block {
    Block {
        kind: BlockKind::Block,
        target: params.pow_target,
        created_at: Timestamp::from_millis(GENESIS_CREATED),
        miner_tag: Some(GENESIS_MINER.to_string()),
        nonce: Nonce::new(GENESIS_NONCE),
        note: Some(GENESIS_NOTE.to_string()),
        height: 0,
        prev_id: None,
        entries: Vec::new(),
    }
}

pub fn genesis_id(params: &ConsensusParams) -> Result<BlockId, CodecError> {
    block_id(&genesis_block(params))
}
