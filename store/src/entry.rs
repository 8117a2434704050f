//! Entry-existence storage trait.

use crate::StoreError;

/// Set of entry fingerprints (canonical `{hash,key}` strings) written by
/// local assertions. Blocks mined after start-up may only carry entries
/// found here.
pub trait EntryStore {
    fn put_entry(&self, fingerprint: &str) -> Result<(), StoreError>;

    fn entry_exists(&self, fingerprint: &str) -> Result<bool, StoreError>;
}
