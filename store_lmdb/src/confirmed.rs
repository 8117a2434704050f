//! LMDB implementation of ConfirmedStore. Pair lists are bincode-encoded.

use valchain_store::{ConfirmedRef, ConfirmedStore, StoreError};

use crate::{LmdbChainStore, LmdbError};

impl ConfirmedStore for LmdbChainStore {
    fn get_confirmed(&self, key: &str) -> Result<Vec<ConfirmedRef>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .confirmed_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => bincode::deserialize(bytes)
                .map_err(|e| StoreError::Corruption(format!("confirmed list for '{key}': {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn put_confirmed(&self, key: &str, refs: &[ConfirmedRef]) -> Result<(), StoreError> {
        let bytes =
            bincode::serialize(refs).map_err(|e| LmdbError::Serialization(e.to_string()))?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.confirmed_db
            .put(&mut wtxn, key.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_confirmed(&self, key: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.confirmed_db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
