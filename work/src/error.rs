use thiserror::Error;
use valchain_crypto::CodecError;

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("work generation cancelled")]
    Cancelled,

    #[error("could not hash candidate: {0}")]
    Codec(#[from] CodecError),

    #[error("could not build worker pool: {0}")]
    ThreadPool(String),
}
