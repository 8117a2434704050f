//! The node event loop.
//!
//! One task owns the [`ConsensusEngine`] and handles, one at a time,
//! inbound messages, application requests and blocks found by the miner.
//! Replies that a suspended operation is waiting for (a requested block, the
//! answer to a query) are handed over at the transport edge by
//! [`NodeHandle::deliver`] and never enter the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;
use valchain_consensus::{BlockOutcome, ChainSelection, ConsensusEngine};
use valchain_crypto::block_id;
use valchain_messages::{
    encode, encode_put_validated, parse_put_validated, AssertionValue, KeyHashReply, PeerId,
    PutValidatedValue, Transport, WireMessage,
};
use valchain_store::ChainStore;
use valchain_types::{Block, BlockId, ChainTip, Clock, Digest};
use valchain_work::WorkGenerator;

use crate::fetcher::PeerFetcher;
use crate::mining::{MinedCandidate, MiningCoordinator};
use crate::pending::PendingRequests;
use crate::tracing_spans::{block_process_span, network_recv_span};
use crate::{AssertionValidator, NodeConfig, NodeError, NodeHandle, NodeMetrics, ShutdownController};

/// Miner results waiting for the loop.
const MINED_QUEUE_CAPACITY: usize = 4;

/// State shared between the event loop and every [`NodeHandle`].
pub(crate) struct Shared {
    pub transport: Arc<dyn Transport>,
    pub fetches: PendingRequests<BlockId, Block>,
    pub validated_queries: PendingRequests<String, Option<Digest>>,
    pub confirmed_queries: PendingRequests<String, Option<Digest>>,
    pub metrics: NodeMetrics,
    pub fetch_timeout: Duration,
    pub rpc_timeout: Duration,
}

impl Shared {
    pub fn send(&self, peer: &PeerId, message: &WireMessage) -> Result<(), NodeError> {
        self.transport.send(peer, encode(message)?)?;
        Ok(())
    }

    pub fn broadcast(&self, message: &WireMessage) -> Result<(), NodeError> {
        self.transport.broadcast(encode(message)?)?;
        Ok(())
    }
}

pub(crate) type Reply<T> = oneshot::Sender<Result<T, NodeError>>;

pub(crate) enum Event {
    Inbound { peer: PeerId, message: WireMessage },
    Publish {
        key: String,
        value: AssertionValue,
        reply: Reply<bool>,
    },
    Validated { key: String, reply: Reply<Option<Digest>> },
    Confirmed { key: String, reply: Reply<Option<Digest>> },
    Tip { reply: Reply<Option<ChainTip>> },
}

pub struct Node<S> {
    engine: Option<ConsensusEngine<S>>,
    validator: Arc<dyn AssertionValidator>,
    shared: Arc<Shared>,
    events: mpsc::Receiver<Event>,
    mined: mpsc::Receiver<MinedCandidate>,
    miner: Option<MiningCoordinator>,
    shutdown: ShutdownController,
}

impl<S: ChainStore + 'static> Node<S> {
    /// Build a node and the handle used to talk to it.
    ///
    /// A full node needs a store; a light node ignores it. Nothing runs
    /// until [`run`](Self::run) is awaited.
    pub fn new(
        config: &NodeConfig,
        store: Option<Arc<S>>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        validator: Arc<dyn AssertionValidator>,
    ) -> Result<(Self, NodeHandle), NodeError> {
        let (mined_tx, mined) = mpsc::channel(MINED_QUEUE_CAPACITY);

        let (engine, miner) = if config.is_full() {
            let store = store.ok_or_else(|| NodeError::Config("a full node needs a store".into()))?;
            let engine = ConsensusEngine::new(
                store,
                config.consensus.clone(),
                Arc::clone(&clock),
                config.miner_tag.clone(),
            )?;
            let miner = if config.enable_mining {
                let generator = match config.mining_threads {
                    0 => WorkGenerator::new(clock),
                    n => WorkGenerator::with_threads(clock, n)?,
                };
                Some(MiningCoordinator::new(generator, mined_tx))
            } else {
                None
            };
            (Some(engine), miner)
        } else {
            (None, None)
        };

        let shared = Arc::new(Shared {
            transport,
            fetches: PendingRequests::new(),
            validated_queries: PendingRequests::new(),
            confirmed_queries: PendingRequests::new(),
            metrics: NodeMetrics::new()?,
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            rpc_timeout: Duration::from_millis(config.rpc_timeout_ms),
        });
        let (events_tx, events) = mpsc::channel(config.event_queue_capacity.max(1));
        let shutdown = ShutdownController::new();

        let handle = NodeHandle::new(events_tx, Arc::clone(&shared), shutdown.clone(), config.mode);
        let node = Self {
            engine,
            validator,
            shared,
            events,
            mined,
            miner,
            shutdown,
        };
        Ok((node, handle))
    }

    /// Start the engine, then process events until shutdown or until every
    /// handle is dropped.
    pub async fn run(mut self) -> Result<(), NodeError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        self.start()?;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::info!("node event loop shutting down");
                    break;
                }
                Some(found) = self.mined.recv() => self.on_mined(found).await,
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        tracing::info!("all node handles dropped");
                        break;
                    }
                },
            }
            self.sync_mining();
        }

        if let Some(miner) = self.miner.as_mut() {
            miner.stop().await;
        }
        tracing::info!("node stopped");
        Ok(())
    }

    fn start(&mut self) -> Result<(), NodeError> {
        match self.engine.as_mut() {
            Some(engine) => {
                let tip = engine.start()?;
                tracing::info!(
                    tip = %tip.block_id,
                    height = tip.height,
                    mining = self.miner.is_some(),
                    "full node started"
                );
            }
            None => tracing::info!("light node started"),
        }
        if let Err(e) = self.shared.broadcast(&WireMessage::GetChainTip) {
            tracing::warn!(error = %e, "failed to ask peers for their chain tip");
        }
        self.refresh_gauges();
        self.sync_mining();
        Ok(())
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Inbound { peer, message } => {
                let span = network_recv_span(peer.as_str(), message.type_name());
                if let Err(e) = self.on_message(&peer, message).instrument(span).await {
                    tracing::error!(peer = %peer, error = %e, "failed to handle message");
                }
            }
            Event::Publish { key, value, reply } => {
                let _ = reply.send(self.publish(&key, &value));
            }
            Event::Validated { key, reply } => {
                let answer = self
                    .engine()
                    .and_then(|engine| Ok(engine.get_validated(&key)?));
                let _ = reply.send(answer);
            }
            Event::Confirmed { key, reply } => {
                let answer = self
                    .engine()
                    .and_then(|engine| Ok(engine.get_confirmed(&key, false)?));
                let _ = reply.send(answer);
            }
            Event::Tip { reply } => {
                let _ = reply.send(self.engine().map(|engine| engine.tip()));
            }
        }
        self.refresh_gauges();
    }

    fn engine(&self) -> Result<&ConsensusEngine<S>, NodeError> {
        self.engine.as_ref().ok_or(NodeError::LightNode)
    }

    async fn on_message(&mut self, peer: &PeerId, message: WireMessage) -> Result<(), NodeError> {
        match message {
            WireMessage::Error { error } => {
                tracing::warn!(peer = %peer, error = %error, "peer reported an error");
                return Ok(());
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

        let Some(engine) = self.engine.as_ref() else {
            tracing::trace!(msg_type = message.type_name(), "ignored on a light node");
            return Ok(());
        };

        match message {
            WireMessage::Block(block) => self.on_block(peer, block).await,
            WireMessage::ChainTip { block_id } => {
                self.shared.send(peer, &WireMessage::GetBlock { block_id })
            }
            WireMessage::GetChainTip => match engine.tip() {
                Some(tip) => self.shared.send(
                    peer,
                    &WireMessage::ChainTip {
                        block_id: tip.block_id,
                    },
                ),
                None => Ok(()),
            },
            WireMessage::GetBlock { block_id } => match engine.get_block(&block_id)? {
                Some(block) => self.shared.send(peer, &WireMessage::Block(block)),
                None => self
                    .shared
                    .send(peer, &WireMessage::error(format!("Block {block_id} not found"))),
            },
            WireMessage::IHaveBlock { block_id } => {
                if engine.get_block(&block_id)?.is_some() {
                    return Ok(());
                }
                self.shared.send(peer, &WireMessage::GetBlock { block_id })
            }
            WireMessage::Validate { data } => self.on_validate(peer, &data),
            WireMessage::GetValidated { key } => {
                let hash = engine.get_validated(&key)?;
                self.shared
                    .send(peer, &WireMessage::OnGetValidated(KeyHashReply { key, hash }))
            }
            WireMessage::GetConfirmed { key } => {
                let hash = engine.get_confirmed(&key, false)?;
                self.shared
                    .send(peer, &WireMessage::OnGetConfirmed(KeyHashReply { key, hash }))
            }
            WireMessage::Error { .. }
            | WireMessage::OnGetValidated(_)
            | WireMessage::OnGetConfirmed(_) => Ok(()),
        }
    }

    async fn on_block(&mut self, peer: &PeerId, block: Block) -> Result<(), NodeError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        let metrics = &self.shared.metrics;
        metrics.blocks_received.inc();

        let span = block_process_span(&block_id(&block)?.to_hex(), block.height);
        let fetcher = PeerFetcher::new(peer.clone(), Arc::clone(&self.shared));
        let outcome = engine.process_block(block, &fetcher).instrument(span).await;

        match outcome {
            Ok(BlockOutcome::Duplicate) => Ok(()),
            Ok(BlockOutcome::Accepted {
                id,
                height,
                selection,
            }) => {
                metrics.blocks_accepted.inc();
                if matches!(selection, ChainSelection::Adopted { reorg: Some(_) }) {
                    metrics.reorgs.inc();
                }
                tracing::info!(block_id = %id, height, ?selection, peer = %peer, "block stored");
                self.shared.broadcast(&WireMessage::IHaveBlock { block_id: id })
            }
            Err(e) if e.is_rejection() => {
                metrics.blocks_rejected.inc();
                tracing::warn!(peer = %peer, error = %e, "block rejected");
                self.shared.send(peer, &WireMessage::error(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn on_validate(&mut self, peer: &PeerId, data: &str) -> Result<(), NodeError> {
        let PutValidatedValue { key, value } = match parse_put_validated(data) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "malformed assertion");
                return self.shared.send(peer, &WireMessage::error(e.to_string()));
            }
        };
        if let Err(reason) = self.validator.validate(&key, &value) {
            tracing::debug!(peer = %peer, key = %key, reason = %reason, "assertion rejected");
            let error = format!("Assertion for key {key} rejected: {reason}");
            return self.shared.send(peer, &WireMessage::error(error));
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.store_key_hash(&key, &value)?;
        }
        Ok(())
    }

    /// Run the predicate, record the assertion locally on a full node and
    /// gossip it.
    fn publish(&mut self, key: &str, value: &AssertionValue) -> Result<bool, NodeError> {
        self.validator
            .validate(key, value)
            .map_err(NodeError::Rejected)?;
        let added = match self.engine.as_mut() {
            Some(engine) => engine.store_key_hash(key, value)?,
            None => false,
        };
        let data = encode_put_validated(key, value)?;
        self.shared.broadcast(&WireMessage::Validate { data })?;
        Ok(added)
    }

    async fn on_mined(&mut self, found: MinedCandidate) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if found.generation != engine.candidate_generation() {
            tracing::debug!(
                generation = found.generation,
                current = engine.candidate_generation(),
                "stale mined block dropped"
            );
            return;
        }
        match engine.apply_mined_block(found.block).await {
            Ok(BlockOutcome::Accepted { id, .. }) => {
                self.shared.metrics.blocks_mined.inc();
                if let Err(e) = self.shared.broadcast(&WireMessage::IHaveBlock { block_id: id }) {
                    tracing::warn!(block_id = %id, error = %e, "failed to announce mined block");
                }
            }
            Ok(BlockOutcome::Duplicate) => {}
            Err(e) => tracing::error!(error = %e, "failed to store mined block"),
        }
        self.refresh_gauges();
    }

    /// Restart the search whenever the candidate has moved on.
    fn sync_mining(&mut self) {
        let (Some(engine), Some(miner)) = (self.engine.as_ref(), self.miner.as_mut()) else {
            return;
        };
        let generation = engine.candidate_generation();
        if miner.generation() == Some(generation) {
            return;
        }
        if let Some(candidate) = engine.candidate() {
            miner.restart(candidate.clone(), generation);
        }
    }

    fn refresh_gauges(&self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let metrics = &self.shared.metrics;
        if let Some(tip) = engine.tip() {
            metrics.chain_height.set(tip.height as i64);
        }
        metrics.pool_size.set(engine.pool().len() as i64);
    }
}
