//! Application and transport entry points into a running node.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;
use valchain_crypto::block_id;
use valchain_messages::{decode, AssertionValue, PeerId, WireMessage};
use valchain_types::{ChainTip, Digest};

use crate::node::{Event, Reply, Shared};
use crate::tracing_spans::rpc_span;
use crate::{NodeError, NodeMode, ShutdownController};

/// Cheap, cloneable handle to a [`Node`](crate::Node).
#[derive(Clone)]
pub struct NodeHandle {
    events: mpsc::Sender<Event>,
    shared: Arc<Shared>,
    shutdown: ShutdownController,
    mode: NodeMode,
}

impl NodeHandle {
    pub(crate) fn new(
        events: mpsc::Sender<Event>,
        shared: Arc<Shared>,
        shutdown: ShutdownController,
        mode: NodeMode,
    ) -> Self {
        Self {
            events,
            shared,
            shutdown,
            mode,
        }
    }

    pub fn mode(&self) -> NodeMode {
        self.mode
    }

    /// Hand an inbound message from `peer` to the node.
    ///
    /// Undecodable input is answered with an `error` message right here.
    /// Blocks that a suspended fetch is waiting for and answers to pending
    /// queries go straight to their waiters; everything else is queued for
    /// the event loop.
    pub async fn deliver(&self, peer: PeerId, bytes: &[u8]) -> Result<(), NodeError> {
        let message = match decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "undecodable message");
                return self.shared.send(&peer, &WireMessage::error(e.to_string()));
            }
        };

        match &message {
            WireMessage::Block(block) if !self.shared.fetches.is_empty() => {
                let id = block_id(block)?;
                if self.shared.fetches.resolve(&id, block.clone()) {
                    tracing::trace!(block_id = %id, peer = %peer, "requested block arrived");
                    return Ok(());
                }
            }
            WireMessage::OnGetValidated(reply) => {
                self.shared.validated_queries.resolve(&reply.key, reply.hash);
                return Ok(());
            }
            WireMessage::OnGetConfirmed(reply) => {
                self.shared.confirmed_queries.resolve(&reply.key, reply.hash);
                return Ok(());
            }
            _ => {}
        }

        self.events
            .send(Event::Inbound { peer, message })
            .await
            .map_err(|_| NodeError::ShuttingDown)
    }

    /// Validate and record an assertion, then gossip it. Returns whether
    /// it was new to this node's pool.
    pub async fn publish(&self, key: &str, value: AssertionValue) -> Result<bool, NodeError> {
        self.call(|reply| Event::Publish {
            key: key.to_string(),
            value,
            reply,
        })
        .await
    }

    /// The hash this node validated for `key`.
    pub async fn validated(&self, key: &str) -> Result<Option<Digest>, NodeError> {
        self.call(|reply| Event::Validated {
            key: key.to_string(),
            reply,
        })
        .await
    }

    /// The hash confirmed for `key` at common-prefix depth.
    pub async fn confirmed(&self, key: &str) -> Result<Option<Digest>, NodeError> {
        self.call(|reply| Event::Confirmed {
            key: key.to_string(),
            reply,
        })
        .await
    }

    pub async fn tip(&self) -> Result<Option<ChainTip>, NodeError> {
        self.call(|reply| Event::Tip { reply }).await
    }

    /// Ask peers for the hash they validated for `key`. The first answer
    /// wins.
    pub async fn request_validated(&self, key: &str) -> Result<Option<Digest>, NodeError> {
        let request = WireMessage::GetValidated {
            key: key.to_string(),
        };
        let shared = &self.shared;
        shared
            .validated_queries
            .request(key.to_string(), shared.rpc_timeout, || shared.broadcast(&request))
            .instrument(rpc_span("getValidated", key))
            .await?
            .ok_or_else(|| NodeError::Timeout(format!("getValidated {key}")))
    }

    /// Ask peers for the hash they confirmed for `key`.
    pub async fn request_confirmed(&self, key: &str) -> Result<Option<Digest>, NodeError> {
        let request = WireMessage::GetConfirmed {
            key: key.to_string(),
        };
        let shared = &self.shared;
        shared
            .confirmed_queries
            .request(key.to_string(), shared.rpc_timeout, || shared.broadcast(&request))
            .instrument(rpc_span("getConfirmed", key))
            .await?
            .ok_or_else(|| NodeError::Timeout(format!("getConfirmed {key}")))
    }

    /// Prometheus text exposition of the node's metrics.
    pub fn metrics(&self) -> Result<String, NodeError> {
        self.shared.metrics.encode()
    }

    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    async fn call<T>(&self, event: impl FnOnce(Reply<T>) -> Event) -> Result<T, NodeError> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(event(tx))
            .await
            .map_err(|_| NodeError::ShuttingDown)?;
        rx.await.map_err(|_| NodeError::ShuttingDown)?
    }
}
