use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("random source unavailable: {0}")]
    Random(String),
}
