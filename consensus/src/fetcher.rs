//! Asking peers for blocks the engine does not have.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use valchain_types::{Block, BlockId};

/// Source of blocks missing from the local store.
///
/// An implementation asks the peer that sent the block under validation
/// and waits a bounded time. `None` means the block did not arrive in time.
/// The engine checks that a returned block hashes to the requested id.
pub trait BlockFetcher: Send + Sync {
    fn fetch(&self, id: BlockId) -> BoxFuture<'_, Option<Block>>;
}

/// Fetcher for trusted local input: nothing is ever fetched.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFetch;

impl BlockFetcher for NoFetch {
    fn fetch(&self, _id: BlockId) -> BoxFuture<'_, Option<Block>> {
        futures_util::future::ready(None).boxed()
    }
}
