//! LMDB implementation of ValidatedStore.

use valchain_store::{StoreError, ValidatedStore};
use valchain_types::Digest;

use crate::{LmdbChainStore, LmdbError};

impl ValidatedStore for LmdbChainStore {
    fn put_validated(&self, key: &str, hash: &Digest) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.validated_db
            .put(&mut wtxn, key.as_bytes(), hash.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_validated(&self, key: &str) -> Result<Option<Digest>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .validated_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| {
                    StoreError::Corruption(format!("validated hash for '{key}' is not 32 bytes"))
                })?;
                Ok(Some(Digest::new(arr)))
            }
            None => Ok(None),
        }
    }
}
