use valchain_types::Nonce;

use crate::CodecError;

/// A uniformly random starting nonce for a mining candidate.
pub fn random_nonce() -> Result<Nonce, CodecError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|e| CodecError::Random(e.to_string()))?;
    Ok(Nonce::new(bytes))
}
