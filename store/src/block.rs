//! Block storage trait.

use crate::StoreError;
use valchain_types::{Block, BlockId};

/// Append-only map from block id to block.
pub trait BlockStore {
    /// Store a block under its id. Storing the same id twice is a no-op.
    fn put_block(&self, id: &BlockId, block: &Block) -> Result<(), StoreError>;

    /// Retrieve a block by id.
    fn get_block(&self, id: &BlockId) -> Result<Option<Block>, StoreError>;

    /// Check if a block exists.
    fn block_exists(&self, id: &BlockId) -> Result<bool, StoreError>;

    /// Delete a block (for pruning).
    fn delete_block(&self, id: &BlockId) -> Result<(), StoreError>;

    /// Total number of blocks in the store.
    fn block_count(&self) -> Result<u64, StoreError>;
}
