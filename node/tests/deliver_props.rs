//! Property tests for the transport edge of the node.
//!
//! Whatever bytes a peer sends, the node either queues a decoded message or
//! answers with exactly one `error` message. It never panics.

use std::sync::Arc;

use proptest::prelude::*;
use valchain_messages::{decode, encode, PeerId, WireMessage};
use valchain_node::{AcceptAll, Node, NodeConfig, NodeHandle};
use valchain_nullables::{NullClock, NullNetwork, NullStore};
use valchain_types::{BlockId, ConsensusParams};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A node that is constructed but never run, so only the edge is exercised.
fn edge() -> (Node<NullStore>, NodeHandle, Arc<NullNetwork>) {
    let config = NodeConfig {
        enable_mining: false,
        consensus: ConsensusParams::dev(),
        ..NodeConfig::default()
    };
    let network = Arc::new(NullNetwork::new());
    let (node, handle) = Node::new(
        &config,
        Some(Arc::new(NullStore::new())),
        network.clone(),
        Arc::new(NullClock::new(1_700_000_000_000)),
        Arc::new(AcceptAll),
    )
    .unwrap();
    (node, handle, network)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn arb_simple_message() -> impl Strategy<Value = WireMessage> {
    prop_oneof![
        Just(WireMessage::GetChainTip),
        any::<[u8; 32]>().prop_map(|b| WireMessage::GetBlock {
            block_id: BlockId::new(b)
        }),
        any::<[u8; 32]>().prop_map(|b| WireMessage::IHaveBlock {
            block_id: BlockId::new(b)
        }),
        "[a-z/]{1,20}".prop_map(|key| WireMessage::GetValidated { key }),
        "[a-z/]{1,20}".prop_map(|key| WireMessage::GetConfirmed { key }),
    ]
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn undecodable_bytes_get_exactly_one_error(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        prop_assume!(decode(&bytes).is_err());
        let (_node, handle, network) = edge();
        let peer = PeerId::new("fuzzer");

        runtime().block_on(handle.deliver(peer.clone(), &bytes)).unwrap();

        let replies = network.sent_to(&peer);
        prop_assert_eq!(replies.len(), 1);
        let is_error_reply = matches!(replies[0], WireMessage::Error { .. });
        prop_assert!(is_error_reply);
        prop_assert!(network.broadcasts().is_empty());
    }

    #[test]
    fn well_formed_messages_are_queued_silently(message in arb_simple_message()) {
        let (_node, handle, network) = edge();
        let bytes = encode(&message).unwrap();

        runtime().block_on(handle.deliver(PeerId::new("peer"), &bytes)).unwrap();

        prop_assert!(network.sent().is_empty());
    }

    #[test]
    fn truncated_messages_are_rejected(message in arb_simple_message(), cut in 1usize..16) {
        let (_node, handle, network) = edge();
        let bytes = encode(&message).unwrap();
        let end = bytes.len().saturating_sub(cut);
        let peer = PeerId::new("peer");

        runtime().block_on(handle.deliver(peer.clone(), &bytes[..end])).unwrap();

        prop_assert_eq!(network.sent_to(&peer).len(), 1);
    }
}
