//! The consensus engine.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;
use valchain_crypto::{block_id, entry_fingerprint, entry_hash, random_nonce};
use valchain_store::ChainStore;
use valchain_types::{
    Block, BlockId, BlockKind, ChainTip, Clock, ConsensusParams, Entry, Timestamp,
};
use valchain_work::meets_target;

use crate::reorg::ReorgPlan;
use crate::{
    genesis_block, genesis_id, BlockFetcher, BlockOutcome, ChainSelection, ConsensusError,
    EntryPool, NoFetch, ReorgSummary,
};

/// Decision taken by chain selection, before anything is written.
pub(crate) enum Selection {
    Adopt(Option<ReorgPlan>),
    Reaffirm,
    Extend,
    StoreOnly,
}

pub struct ConsensusEngine<S> {
    store: Arc<S>,
    params: ConsensusParams,
    clock: Arc<dyn Clock>,
    genesis_id: BlockId,
    /// Blocks created after this instant must only carry known entries.
    start_timestamp: Timestamp,
    tip: Option<ChainTip>,
    pool: EntryPool,
    candidate: Option<Block>,
    /// Bumped every time the candidate changes.
    candidate_generation: u64,
    miner_tag: Option<String>,
}

impl<S: ChainStore> ConsensusEngine<S> {
    pub fn new(
        store: Arc<S>,
        params: ConsensusParams,
        clock: Arc<dyn Clock>,
        miner_tag: Option<String>,
    ) -> Result<Self, ConsensusError> {
        let genesis_id = genesis_id(&params)?;
        let start_timestamp = clock.now();
        Ok(Self {
            store,
            params,
            clock,
            genesis_id,
            start_timestamp,
            tip: None,
            pool: EntryPool::new(),
            candidate: None,
            candidate_generation: 0,
            miner_tag,
        })
    }

    /// Persist genesis and adopt it as the tip. Genesis is trusted and is
    /// not validated. Calling this again once a tip exists only makes sure
    /// genesis is stored.
    pub fn start(&mut self) -> Result<ChainTip, ConsensusError> {
        let genesis = genesis_block(&self.params);
        let id = self.genesis_id;
        self.store.put_block(&id, &genesis)?;
        if self.tip.is_none() {
            self.apply(id, &genesis, Selection::Adopt(None))?;
        }
        tracing::info!(genesis_id = %id, "consensus engine started");
        Ok(self.tip.unwrap_or(ChainTip::new(id, 0)))
    }

    pub fn tip(&self) -> Option<ChainTip> {
        self.tip
    }

    pub fn genesis_id(&self) -> BlockId {
        self.genesis_id
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn start_timestamp(&self) -> Timestamp {
        self.start_timestamp
    }

    pub fn pool(&self) -> &EntryPool {
        &self.pool
    }

    /// The block the miner should be working on.
    pub fn candidate(&self) -> Option<&Block> {
        self.candidate.as_ref()
    }

    /// Changes whenever [`candidate`](Self::candidate) changes; a miner
    /// working on an older generation is working on stale input.
    pub fn candidate_generation(&self) -> u64 {
        self.candidate_generation
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn get_block(&self, id: &BlockId) -> Result<Option<Block>, ConsensusError> {
        Ok(self.store.get_block(id)?)
    }

    /// Record a locally validated assertion.
    ///
    /// The entry becomes known (so blocks carrying it pass validation), the
    /// key's validated hash is updated, and a new entry joins the pool and
    /// the candidate. Returns whether the candidate changed, in which case
    /// mining should restart.
    pub fn store_key_hash<V: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &V,
    ) -> Result<bool, ConsensusError> {
        let hash = entry_hash(key, value)?;
        let entry = Entry::new(key, hash);
        self.store.put_entry(&entry_fingerprint(&entry)?)?;
        self.store.put_validated(key, &hash)?;

        if !self.pool.push(entry.clone()) {
            tracing::trace!(key, hash = %hash, "entry already pending");
            return Ok(false);
        }
        tracing::debug!(key, hash = %hash, pool_size = self.pool.len(), "entry added to pool");
        if let Some(candidate) = self.candidate.as_mut() {
            candidate.entries.push(entry);
            self.candidate_generation += 1;
        }
        Ok(true)
    }

    /// Validate and, if valid, store and select a block received from a
    /// peer. Missing ancestors are requested through `fetcher` and
    /// processed first, recursively.
    pub fn process_block<'a>(
        &'a mut self,
        block: Block,
        fetcher: &'a dyn BlockFetcher,
    ) -> BoxFuture<'a, Result<BlockOutcome, ConsensusError>> {
        async move {
            let id = block_id(&block)?;
            if self.store.block_exists(&id)? {
                tracing::trace!(block_id = %id, "duplicate block ignored");
                return Ok(BlockOutcome::Duplicate);
            }
            self.validate(&id, &block, fetcher).await?;
            let selection = self.select(&id, &block, fetcher).await?;
            self.persist(&id, &block, &selection)?;
            let selection = self.apply(id, &block, selection)?;
            tracing::debug!(block_id = %id, height = block.height, ?selection, "block accepted");
            Ok(BlockOutcome::Accepted {
                id,
                height: block.height,
                selection,
            })
        }
        .boxed()
    }

    /// Take a block produced by the local miner. It is trusted: it is not
    /// validated, only stored and run through chain selection.
    pub async fn apply_mined_block(&mut self, block: Block) -> Result<BlockOutcome, ConsensusError> {
        let id = block_id(&block)?;
        if self.store.block_exists(&id)? {
            return Ok(BlockOutcome::Duplicate);
        }
        let selection = self.select(&id, &block, &NoFetch).await?;
        self.persist(&id, &block, &selection)?;
        let selection = self.apply(id, &block, selection)?;
        tracing::info!(block_id = %id, height = block.height, entries = block.entries.len(), "mined block");
        Ok(BlockOutcome::Accepted {
            id,
            height: block.height,
            selection,
        })
    }

    /// Every check except chain selection. Nothing is written unless a
    /// missing parent has to be fetched, which is processed as a block of
    /// its own.
    async fn validate(
        &mut self,
        id: &BlockId,
        block: &Block,
        fetcher: &dyn BlockFetcher,
    ) -> Result<(), ConsensusError> {
        self.check_work(id, block)?;

        match block.prev_id {
            Some(prev_id) => {
                let prev = self.require_block(prev_id, fetcher).await?;
                let now = self.clock.now();
                if block.created_at <= prev.created_at || block.created_at > now {
                    return Err(ConsensusError::InvalidTimestamp {
                        created: block.created_at,
                        previous: prev.created_at,
                        now,
                    });
                }
                let expected = prev.height.saturating_add(1);
                if block.height != expected {
                    return Err(ConsensusError::InvalidHeight {
                        expected,
                        actual: block.height,
                    });
                }
            }
            None => {
                if *id != self.genesis_id {
                    return Err(ConsensusError::InvalidGenesis(*id));
                }
                if block.height != 0 {
                    return Err(ConsensusError::InvalidHeight {
                        expected: 0,
                        actual: block.height,
                    });
                }
            }
        }

        self.check_entries(block)
    }

    /// The checks `validate` makes on a block fetched during a reorg walk.
    /// Its own parent is checked when the walk reaches it; `child` is the
    /// walked block that led here, if any.
    pub(crate) fn check_walked_block(
        &self,
        id: &BlockId,
        block: &Block,
        child: Option<&Block>,
    ) -> Result<(), ConsensusError> {
        match block.prev_id {
            None if *id != self.genesis_id => return Err(ConsensusError::InvalidGenesis(*id)),
            None => {}
            Some(_) => self.check_work(id, block)?,
        }
        if let Some(child) = child {
            let expected = block.height.saturating_add(1);
            if child.height != expected {
                return Err(ConsensusError::InvalidHeight {
                    expected,
                    actual: child.height,
                });
            }
            if child.created_at <= block.created_at {
                return Err(ConsensusError::InvalidTimestamp {
                    created: child.created_at,
                    previous: block.created_at,
                    now: self.clock.now(),
                });
            }
        }
        self.check_entries(block)
    }

    fn check_work(&self, id: &BlockId, block: &Block) -> Result<(), ConsensusError> {
        if block.target != self.params.pow_target {
            return Err(ConsensusError::InvalidTarget(block.target));
        }
        if !meets_target(id, &block.target) {
            return Err(ConsensusError::InvalidProofOfWork(*id));
        }
        Ok(())
    }

    fn check_entries(&self, block: &Block) -> Result<(), ConsensusError> {
        // Blocks from before start-up may carry entries this node never saw.
        if block.created_at <= self.start_timestamp {
            return Ok(());
        }
        for entry in &block.entries {
            if !self.store.entry_exists(&entry_fingerprint(entry)?)? {
                return Err(ConsensusError::UnknownEntry {
                    key: entry.key.clone(),
                    hash: entry.hash,
                });
            }
        }
        Ok(())
    }

    /// Load a block, asking the peer for it and processing it first if it
    /// is not stored yet.
    async fn require_block(
        &mut self,
        id: BlockId,
        fetcher: &dyn BlockFetcher,
    ) -> Result<Block, ConsensusError> {
        if let Some(block) = self.store.get_block(&id)? {
            return Ok(block);
        }
        tracing::debug!(block_id = %id, "requesting missing block");
        if let Some(fetched) = self.fetch_verified(id, fetcher).await? {
            match self.process_block(fetched, fetcher).await {
                Ok(_) => {}
                Err(e) if e.is_rejection() => {
                    tracing::debug!(block_id = %id, error = %e, "fetched block rejected");
                }
                Err(e) => return Err(e),
            }
        }
        self.store
            .get_block(&id)?
            .ok_or(ConsensusError::PrevBlockMissing(id))
    }

    /// Ask for a block and keep it only if it hashes to the requested id.
    pub(crate) async fn fetch_verified(
        &self,
        id: BlockId,
        fetcher: &dyn BlockFetcher,
    ) -> Result<Option<Block>, ConsensusError> {
        let Some(block) = fetcher.fetch(id).await else {
            return Ok(None);
        };
        if block_id(&block)? != id {
            tracing::warn!(block_id = %id, "fetched block does not match requested id");
            return Ok(None);
        }
        Ok(Some(block))
    }

    /// Chain selection, read-only: decide what accepting `block` does to
    /// the tip, fetching whatever a reorg walk needs.
    async fn select(
        &self,
        id: &BlockId,
        block: &Block,
        fetcher: &dyn BlockFetcher,
    ) -> Result<Selection, ConsensusError> {
        let Some(tip) = self.tip else {
            return Ok(Selection::Adopt(None));
        };
        if block.height > tip.height && block.prev_id != Some(tip.block_id) {
            let plan = self.plan_reorg(tip.block_id, *id, block, fetcher).await?;
            return Ok(Selection::Adopt(Some(plan)));
        }
        // Only reached when the tip block is missing from the store.
        if *id == tip.block_id {
            return Ok(Selection::Reaffirm);
        }
        if block.prev_id == Some(tip.block_id) {
            return Ok(Selection::Extend);
        }
        Ok(Selection::StoreOnly)
    }

    fn persist(&self, id: &BlockId, block: &Block, selection: &Selection) -> Result<(), ConsensusError> {
        if let Selection::Adopt(Some(plan)) = selection {
            for (fetched_id, fetched) in &plan.fetched {
                self.store.put_block(fetched_id, fetched)?;
            }
        }
        self.store.put_block(id, block)?;
        Ok(())
    }

    /// Carry out a selection: move entries between the pool and the
    /// confirmation index, move the tip and rebuild the candidate.
    fn apply(
        &mut self,
        id: BlockId,
        block: &Block,
        selection: Selection,
    ) -> Result<ChainSelection, ConsensusError> {
        match selection {
            Selection::Adopt(None) => {
                for entry in &block.entries {
                    self.pool.remove(entry);
                }
                self.set_tip(ChainTip::new(id, block.height))?;
                Ok(ChainSelection::Adopted { reorg: None })
            }
            Selection::Adopt(Some(plan)) => {
                for (old_id, old) in &plan.rollback {
                    for entry in &old.entries {
                        self.pool.push(entry.clone());
                        self.store.remove_confirmed(&entry.key, old_id, &entry.hash)?;
                    }
                }
                for (new_id, new) in &plan.apply {
                    self.confirm_entries(new_id, new)?;
                }
                let summary = ReorgSummary {
                    fork_point: plan.fork_point,
                    rolled_back: plan.rollback.len(),
                    applied: plan.apply.len(),
                };
                tracing::info!(
                    fork_point = %summary.fork_point,
                    rolled_back = summary.rolled_back,
                    applied = summary.applied,
                    new_tip = %id,
                    height = block.height,
                    "adopted heavier branch"
                );
                self.set_tip(ChainTip::new(id, block.height))?;
                Ok(ChainSelection::Adopted {
                    reorg: Some(summary),
                })
            }
            Selection::Reaffirm => {
                self.confirm_entries(&id, block)?;
                self.rebuild_candidate()?;
                Ok(ChainSelection::Reaffirmed)
            }
            Selection::Extend => {
                self.confirm_entries(&id, block)?;
                self.set_tip(ChainTip::new(id, block.height))?;
                Ok(ChainSelection::Extended)
            }
            Selection::StoreOnly => Ok(ChainSelection::StoredOnly),
        }
    }

    fn confirm_entries(&mut self, id: &BlockId, block: &Block) -> Result<(), ConsensusError> {
        for entry in &block.entries {
            self.pool.remove(entry);
            self.store.add_confirmed(&entry.key, id, &entry.hash)?;
        }
        Ok(())
    }

    fn set_tip(&mut self, tip: ChainTip) -> Result<(), ConsensusError> {
        self.tip = Some(tip);
        self.rebuild_candidate()
    }

    /// A fresh candidate on top of the tip carrying the whole pool.
    fn rebuild_candidate(&mut self) -> Result<(), ConsensusError> {
        let Some(tip) = self.tip else {
            self.candidate = None;
            return Ok(());
        };
        self.candidate = Some(Block {
            kind: BlockKind::Block,
            target: self.params.pow_target,
            created_at: self.clock.now(),
            miner_tag: self.miner_tag.clone(),
            nonce: random_nonce()?,
            note: None,
            height: tip.height.saturating_add(1),
            prev_id: Some(tip.block_id),
            entries: self.pool.entries().to_vec(),
        });
        self.candidate_generation += 1;
        Ok(())
    }
}
