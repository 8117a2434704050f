use thiserror::Error;
use valchain_crypto::CodecError;
use valchain_store::StoreError;
use valchain_types::{BlockId, Digest, Timestamp};

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("invalid proof of work target {0}")]
    InvalidTarget(Digest),

    #[error("proof of work is not valid for block {0}")]
    InvalidProofOfWork(BlockId),

    #[error("invalid block height: expected {expected}, got {actual}")]
    InvalidHeight { expected: u64, actual: u64 },

    #[error("invalid block timestamp {created} (previous {previous}, now {now})")]
    InvalidTimestamp {
        created: Timestamp,
        previous: Timestamp,
        now: Timestamp,
    },

    #[error("invalid genesis block {0}")]
    InvalidGenesis(BlockId),

    #[error("entry for key {key} and hash {hash} not found")]
    UnknownEntry { key: String, hash: Digest },

    #[error("block {0} not found")]
    PrevBlockMissing(BlockId),

    #[error("reorg failed: {0}")]
    ReorgInconsistency(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ConsensusError {
    /// Whether the error is a verdict on the block rather than a local
    /// failure. Rejections are reported back to the sending peer.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Codec(_))
    }
}
