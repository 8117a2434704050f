#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use valchain_consensus::{genesis_block, genesis_id, BlockFetcher, ConsensusEngine};
use valchain_nullables::{NullClock, NullStore};
use valchain_types::{Block, BlockId, BlockKind, Clock, ConsensusParams, Digest, Entry, Nonce};
use valchain_work::WorkGenerator;

pub const START_MILLIS: u64 = 1_700_000_000_000;

pub fn params() -> ConsensusParams {
    ConsensusParams::dev()
}

pub fn clock() -> Arc<NullClock> {
    Arc::new(NullClock::new(START_MILLIS))
}

/// A started engine over a fresh in-memory store.
pub fn engine(clock: &Arc<NullClock>) -> (ConsensusEngine<NullStore>, Arc<NullStore>) {
    let store = Arc::new(NullStore::new());
    let mut engine = ConsensusEngine::new(
        Arc::clone(&store),
        params(),
        clock.clone(),
        Some("test-miner".into()),
    )
    .unwrap();
    engine.start().unwrap();
    (engine, store)
}

pub fn genesis() -> (BlockId, Block) {
    (genesis_id(&params()).unwrap(), genesis_block(&params()))
}

pub fn entry(key: &str, byte: u8) -> Entry {
    Entry::new(key, Digest::new([byte; 32]))
}

/// Advance the clock and mine a block with `entries` on top of `parent`.
pub fn mine_on(
    clock: &Arc<NullClock>,
    parent: &(BlockId, Block),
    entries: Vec<Entry>,
) -> (BlockId, Block) {
    clock.advance(1_000);
    let candidate = Block {
        kind: BlockKind::Block,
        target: params().pow_target,
        created_at: clock.now(),
        miner_tag: Some("builder".into()),
        nonce: Nonce::new([parent.1.height as u8; 32]),
        note: None,
        height: parent.1.height + 1,
        prev_id: Some(parent.0),
        entries,
    };
    mine(clock, &candidate)
}

/// Advance the clock and mine `candidate` as is.
pub fn mine(clock: &Arc<NullClock>, candidate: &Block) -> (BlockId, Block) {
    clock.advance(1);
    let mined = WorkGenerator::new(clock.clone())
        .generate(candidate, &AtomicBool::new(false))
        .unwrap();
    (mined.id, mined.block)
}

/// A peer that answers block requests from a fixed set.
#[derive(Default)]
pub struct MapFetcher {
    blocks: Mutex<HashMap<BlockId, Block>>,
    requests: Mutex<Vec<BlockId>>,
}

impl MapFetcher {
    pub fn with(blocks: &[(BlockId, Block)]) -> Self {
        let fetcher = Self::default();
        for (id, block) in blocks {
            fetcher.insert(*id, block.clone());
        }
        fetcher
    }

    pub fn insert(&self, id: BlockId, block: Block) {
        self.blocks.lock().unwrap().insert(id, block);
    }

    pub fn requests(&self) -> Vec<BlockId> {
        self.requests.lock().unwrap().clone()
    }
}

impl BlockFetcher for MapFetcher {
    fn fetch(&self, id: BlockId) -> BoxFuture<'_, Option<Block>> {
        self.requests.lock().unwrap().push(id);
        let block = self.blocks.lock().unwrap().get(&id).cloned();
        async move { block }.boxed()
    }
}
