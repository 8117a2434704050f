use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

/// All four chain databases behind one handle. Cheap to clone.
///
/// The trait implementations live next to their concern: see `block`,
/// `entry`, `validated` and `confirmed`.
#[derive(Clone)]
pub struct LmdbChainStore {
    pub(crate) env: Arc<Env>,
    pub(crate) blocks_db: Database<Bytes, Bytes>,
    pub(crate) entries_db: Database<Bytes, Bytes>,
    pub(crate) validated_db: Database<Bytes, Bytes>,
    pub(crate) confirmed_db: Database<Bytes, Bytes>,
}
