//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use valchain_store::{
    BlockStore, ConfirmedRef, ConfirmedStore, EntryStore, StoreError, ValidatedStore,
};
use valchain_types::{Block, BlockId, Digest};

/// An in-memory implementation of every chain store trait.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Debug, Default)]
pub struct NullStore {
    blocks: Mutex<HashMap<BlockId, Block>>,
    entries: Mutex<HashSet<String>>,
    validated: Mutex<HashMap<String, Digest>>,
    confirmed: Mutex<HashMap<String, Vec<ConfirmedRef>>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys that currently have at least one confirmed pair.
    pub fn confirmed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.confirmed.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl BlockStore for NullStore {
    fn put_block(&self, id: &BlockId, block: &Block) -> Result<(), StoreError> {
        self.blocks.lock().unwrap().insert(*id, block.clone());
        Ok(())
    }

    fn get_block(&self, id: &BlockId) -> Result<Option<Block>, StoreError> {
        Ok(self.blocks.lock().unwrap().get(id).cloned())
    }

    fn block_exists(&self, id: &BlockId) -> Result<bool, StoreError> {
        Ok(self.blocks.lock().unwrap().contains_key(id))
    }

    fn delete_block(&self, id: &BlockId) -> Result<(), StoreError> {
        self.blocks.lock().unwrap().remove(id);
        Ok(())
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        Ok(self.blocks.lock().unwrap().len() as u64)
    }
}

impl EntryStore for NullStore {
    fn put_entry(&self, fingerprint: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(fingerprint.to_string());
        Ok(())
    }

    fn entry_exists(&self, fingerprint: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().unwrap().contains(fingerprint))
    }
}

impl ValidatedStore for NullStore {
    fn put_validated(&self, key: &str, hash: &Digest) -> Result<(), StoreError> {
        self.validated.lock().unwrap().insert(key.to_string(), *hash);
        Ok(())
    }

    fn get_validated(&self, key: &str) -> Result<Option<Digest>, StoreError> {
        Ok(self.validated.lock().unwrap().get(key).copied())
    }
}

impl ConfirmedStore for NullStore {
    fn get_confirmed(&self, key: &str) -> Result<Vec<ConfirmedRef>, StoreError> {
        Ok(self
            .confirmed
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    fn put_confirmed(&self, key: &str, refs: &[ConfirmedRef]) -> Result<(), StoreError> {
        self.confirmed
            .lock()
            .unwrap()
            .insert(key.to_string(), refs.to_vec());
        Ok(())
    }

    fn delete_confirmed(&self, key: &str) -> Result<(), StoreError> {
        self.confirmed.lock().unwrap().remove(key);
        Ok(())
    }
}
