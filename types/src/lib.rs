//! Fundamental types for the valchain consensus engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! digests, blocks and entries, the chain tip, timestamps and consensus parameters.

pub mod block;
pub mod digest;
pub mod error;
pub mod params;
pub mod time;

pub use block::{Block, BlockKind, ChainTip, Entry, Nonce};
pub use digest::{BlockId, Digest};
pub use error::TypesError;
pub use params::ConsensusParams;
pub use time::{Clock, SystemClock, Timestamp};
