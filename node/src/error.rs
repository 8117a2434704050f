use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] valchain_consensus::ConsensusError),

    #[error("message error: {0}")]
    Message(#[from] valchain_messages::MessageError),

    #[error("store error: {0}")]
    Store(#[from] valchain_store::StoreError),

    #[error("storage backend error: {0}")]
    Lmdb(#[from] valchain_store_lmdb::LmdbError),

    #[error("work error: {0}")]
    Work(#[from] valchain_work::WorkError),

    #[error("codec error: {0}")]
    Codec(#[from] valchain_crypto::CodecError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("assertion rejected: {0}")]
    Rejected(String),

    #[error("operation not available on a light node")]
    LightNode,

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("node is shutting down")]
    ShuttingDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
