//! LMDB storage backend for the valchain consensus engine.
//!
//! Implements all storage traits from `valchain-store` using the `heed` LMDB
//! bindings. Each logical store maps to one named database within a single
//! environment.

pub mod block;
pub mod chain;
pub mod confirmed;
pub mod entry;
pub mod environment;
pub mod error;
pub mod validated;

pub use chain::LmdbChainStore;
pub use environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
pub use error::LmdbError;
