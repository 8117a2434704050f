//! SHA-256 over canonical JSON.

use serde::Serialize;
use sha2::{Digest as _, Sha256};
use valchain_types::{Block, BlockId, Digest, Entry};

use crate::{canonicalize, CodecError};

/// SHA-256 of raw bytes.
pub fn sha256(data: &[u8]) -> Digest {
    let result = Sha256::digest(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    Digest::new(output)
}

/// SHA-256 of raw bytes as 64 lowercase hex characters.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash any serializable value through its canonical rendering.
pub fn hash_object<T: Serialize + ?Sized>(value: &T) -> Result<Digest, CodecError> {
    let canonical = canonicalize(value)?;
    Ok(sha256(canonical.as_bytes()))
}

/// The identifier of a block.
pub fn block_id(block: &Block) -> Result<BlockId, CodecError> {
    hash_object(block)
}

#[derive(Serialize)]
struct KeyValue<'a, V: ?Sized> {
    key: &'a str,
    value: &'a V,
}

/// Hash of the assertion `{key, value}`, the value an `Entry` carries.
pub fn entry_hash<V: Serialize + ?Sized>(key: &str, value: &V) -> Result<Digest, CodecError> {
    hash_object(&KeyValue { key, value })
}

/// Canonical `{hash, key}` string used as the entry-existence key.
pub fn entry_fingerprint(entry: &Entry) -> Result<String, CodecError> {
    canonicalize(entry)
}
