//! Hashing for the valchain protocol.
//!
//! - **Canonical JSON** (sorted keys, no whitespace) so that semantically
//!   equal values serialize to identical bytes
//! - **SHA-256** over the canonical bytes, rendered as lowercase hex
//! - Block ids, entry hashes and entry fingerprints built on the two above

pub mod canonical;
pub mod error;
pub mod hash;
pub mod random;

pub use canonical::{canonicalize, canonicalize_value};
pub use error::CodecError;
pub use hash::{block_id, entry_fingerprint, entry_hash, hash_object, sha256, sha256_hex};
pub use random::random_nonce;
