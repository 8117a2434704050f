//! Confirmed-index storage trait.

use serde::{Deserialize, Serialize};

use crate::StoreError;
use valchain_types::{BlockId, Digest};

/// One block that carries an entry for a key, together with the hash that
/// entry asserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmedRef {
    #[serde(rename = "blockId")]
    pub block_id: BlockId,
    pub hash: Digest,
}

impl ConfirmedRef {
    pub fn new(block_id: BlockId, hash: Digest) -> Self {
        Self { block_id, hash }
    }
}

/// key -> set of (block id, hash) pairs for blocks on the adopted chain.
///
/// Backends provide the raw list operations; pair insertion and removal
/// are shared.
pub trait ConfirmedStore {
    /// All pairs recorded for `key`, in insertion order. Empty if none.
    fn get_confirmed(&self, key: &str) -> Result<Vec<ConfirmedRef>, StoreError>;

    /// Replace the pair list for `key`.
    fn put_confirmed(&self, key: &str, refs: &[ConfirmedRef]) -> Result<(), StoreError>;

    /// Forget `key` entirely.
    fn delete_confirmed(&self, key: &str) -> Result<(), StoreError>;

    /// Record that `block_id` carries `(key, hash)`. Adding a pair that is
    /// already present changes nothing.
    fn add_confirmed(&self, key: &str, block_id: &BlockId, hash: &Digest) -> Result<(), StoreError> {
        let pair = ConfirmedRef::new(*block_id, *hash);
        let mut refs = self.get_confirmed(key)?;
        if refs.contains(&pair) {
            return Ok(());
        }
        refs.push(pair);
        self.put_confirmed(key, &refs)
    }

    /// Remove exactly the `(block_id, hash)` pair. The key is deleted once
    /// its last pair is gone.
    fn remove_confirmed(
        &self,
        key: &str,
        block_id: &BlockId,
        hash: &Digest,
    ) -> Result<(), StoreError> {
        let mut refs = self.get_confirmed(key)?;
        let before = refs.len();
        refs.retain(|r| !(r.block_id == *block_id && r.hash == *hash));
        if refs.len() == before {
            return Ok(());
        }
        if refs.is_empty() {
            self.delete_confirmed(key)
        } else {
            self.put_confirmed(key, &refs)
        }
    }
}
