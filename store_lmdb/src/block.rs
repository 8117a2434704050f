//! LMDB implementation of BlockStore.
//!
//! Blocks are stored as their canonical JSON, the same bytes their id is
//! computed from.

use valchain_store::{BlockStore, StoreError};
use valchain_types::{Block, BlockId};

use crate::{LmdbChainStore, LmdbError};

impl BlockStore for LmdbChainStore {
    fn put_block(&self, id: &BlockId, block: &Block) -> Result<(), StoreError> {
        let bytes = valchain_crypto::canonicalize(block)
            .map_err(|e| LmdbError::Serialization(e.to_string()))?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.blocks_db
            .put(&mut wtxn, id.as_bytes(), bytes.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_block(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self.blocks_db.get(&rtxn, id.as_bytes()).map_err(LmdbError::from)? {
            Some(bytes) => {
                let block = serde_json::from_slice(bytes).map_err(|e| {
                    StoreError::Corruption(format!("block {id} does not decode: {e}"))
                })?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    fn block_exists(&self, id: &BlockId) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self
            .blocks_db
            .get(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?
            .is_some())
    }

    fn delete_block(&self, id: &BlockId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.blocks_db
            .delete(&mut wtxn, id.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.blocks_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}
