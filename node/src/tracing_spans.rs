//! Pre-built [`tracing::Span`] constructors for common node operations.
//!
//! Consistent span names and field sets make it easy to filter and
//! correlate logs across the event loop, the miner and the transport.

use tracing::{info_span, Span};

/// Span covering the handling of a single inbound message.
pub fn network_recv_span(peer: &str, msg_type: &str) -> Span {
    info_span!("network_recv", peer = %peer, msg_type = %msg_type)
}

/// Span covering validation and selection of a single block.
pub fn block_process_span(block_id: &str, height: u64) -> Span {
    info_span!("block_process", block_id = %block_id, height)
}

/// Span covering one proof-of-work search.
pub fn mining_span(generation: u64, height: u64) -> Span {
    info_span!("mining", generation, height)
}

/// Span covering a query sent to peers.
pub fn rpc_span(kind: &str, key: &str) -> Span {
    info_span!("rpc", kind = %kind, key = %key)
}
