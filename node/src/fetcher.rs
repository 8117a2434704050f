//! Fetching missing blocks from the peer that referenced them.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use valchain_consensus::BlockFetcher;
use valchain_messages::{PeerId, WireMessage};
use valchain_types::{Block, BlockId};

use crate::node::Shared;

/// Sends `getBlock` to one peer and waits for the block to come back
/// through [`NodeHandle::deliver`](crate::NodeHandle::deliver).
pub struct PeerFetcher {
    peer: PeerId,
    shared: Arc<Shared>,
}

impl PeerFetcher {
    pub(crate) fn new(peer: PeerId, shared: Arc<Shared>) -> Self {
        Self { peer, shared }
    }
}

impl BlockFetcher for PeerFetcher {
    fn fetch(&self, id: BlockId) -> BoxFuture<'_, Option<Block>> {
        async move {
            let shared = &self.shared;
            let request = WireMessage::GetBlock { block_id: id };
            let answer = shared
                .fetches
                .request(id, shared.fetch_timeout, || shared.send(&self.peer, &request))
                .await;
            match answer {
                Ok(Some(block)) => Some(block),
                Ok(None) => {
                    tracing::debug!(block_id = %id, peer = %self.peer, "block request timed out");
                    None
                }
                Err(e) => {
                    tracing::warn!(block_id = %id, peer = %self.peer, error = %e, "block request failed");
                    None
                }
            }
        }
        .boxed()
    }
}
