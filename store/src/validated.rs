//! Validated-hash storage trait.

use crate::StoreError;
use valchain_types::Digest;

/// key -> most recently validated hash. Later writes overwrite earlier ones.
pub trait ValidatedStore {
    fn put_validated(&self, key: &str, hash: &Digest) -> Result<(), StoreError>;

    fn get_validated(&self, key: &str) -> Result<Option<Digest>, StoreError>;
}
