//! LMDB implementation of EntryStore. Values are a single marker byte.

use valchain_store::{EntryStore, StoreError};

use crate::{LmdbChainStore, LmdbError};

const PRESENT: &[u8] = &[1];

impl EntryStore for LmdbChainStore {
    fn put_entry(&self, fingerprint: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.entries_db
            .put(&mut wtxn, fingerprint.as_bytes(), PRESENT)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn entry_exists(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self
            .entries_db
            .get(&rtxn, fingerprint.as_bytes())
            .map_err(LmdbError::from)?
            .is_some())
    }
}
