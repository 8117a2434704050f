//! Abstract storage traits for the valchain consensus engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The engine depends only on the traits, through the [`ChainStore`]
//! bundle.

pub mod block;
pub mod confirmed;
pub mod entry;
pub mod error;
pub mod validated;

pub use block::BlockStore;
pub use confirmed::{ConfirmedRef, ConfirmedStore};
pub use entry::EntryStore;
pub use error::StoreError;
pub use validated::ValidatedStore;

/// Everything the consensus engine persists.
pub trait ChainStore:
    BlockStore + EntryStore + ValidatedStore + ConfirmedStore + Send + Sync
{
}

impl<T> ChainStore for T where
    T: BlockStore + EntryStore + ValidatedStore + ConfirmedStore + Send + Sync
{
}
