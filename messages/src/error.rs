use thiserror::Error;
use valchain_crypto::CodecError;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message too large: {size} > {max}")]
    TooLarge { size: usize, max: usize },

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("unsupported message type received: {0}")]
    UnsupportedType(String),

    #[error("encoding failed: {0}")]
    Encode(#[from] CodecError),

    #[error("transport error: {0}")]
    Transport(String),
}
