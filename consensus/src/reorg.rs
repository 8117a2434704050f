//! Finding the fork point between the current tip and a heavier block.

use std::collections::{HashMap, HashSet};

use valchain_store::ChainStore;
use valchain_types::{Block, BlockId};

use crate::{BlockFetcher, ConsensusEngine, ConsensusError};

/// Everything needed to switch branches, gathered before any write.
pub(crate) struct ReorgPlan {
    pub fork_point: BlockId,
    /// Old tip down to the fork point, exclusive.
    pub rollback: Vec<(BlockId, Block)>,
    /// New tip down to the fork point, exclusive.
    pub apply: Vec<(BlockId, Block)>,
    /// Blocks fetched from the peer during the walk, checked but not yet
    /// stored.
    pub fetched: Vec<(BlockId, Block)>,
}

#[derive(Default)]
struct Walk {
    visited: HashSet<BlockId>,
    loaded: HashMap<BlockId, Block>,
    /// Parent id to the walked block that references it.
    children: HashMap<BlockId, BlockId>,
    fetched: Vec<(BlockId, Block)>,
}

impl<S: ChainStore> ConsensusEngine<S> {
    /// Walk back from both tips at once, one block per side per round,
    /// until one side steps onto a block the other side has visited. A side
    /// that reaches genesis stops; the walk fails only when both have.
    pub(crate) async fn plan_reorg(
        &self,
        old_tip: BlockId,
        new_tip: BlockId,
        new_block: &Block,
        fetcher: &dyn BlockFetcher,
    ) -> Result<ReorgPlan, ConsensusError> {
        let mut walk = Walk::default();
        walk.visited.insert(old_tip);
        walk.visited.insert(new_tip);
        walk.loaded.insert(new_tip, new_block.clone());

        let mut old_cursor = Some(old_tip);
        let mut new_cursor = Some(new_tip);
        let fork_point = loop {
            if old_cursor.is_none() && new_cursor.is_none() {
                return Err(ConsensusError::ReorgInconsistency(format!(
                    "no common ancestor between {old_tip} and {new_tip}"
                )));
            }
            if let Some(fork) = self.step(&mut old_cursor, &mut walk, fetcher).await? {
                break fork;
            }
            if let Some(fork) = self.step(&mut new_cursor, &mut walk, fetcher).await? {
                break fork;
            }
        };

        let rollback = branch(old_tip, fork_point, &walk.loaded)?;
        let apply = branch(new_tip, fork_point, &walk.loaded)?;
        tracing::debug!(
            %fork_point,
            rollback = rollback.len(),
            apply = apply.len(),
            fetched = walk.fetched.len(),
            "reorg planned"
        );
        Ok(ReorgPlan {
            fork_point,
            rollback,
            apply,
            fetched: walk.fetched,
        })
    }

    /// Move one side back by one block. Returns the fork point once found.
    async fn step(
        &self,
        cursor: &mut Option<BlockId>,
        walk: &mut Walk,
        fetcher: &dyn BlockFetcher,
    ) -> Result<Option<BlockId>, ConsensusError> {
        let Some(current) = *cursor else {
            return Ok(None);
        };
        let Some(parent) = self.walk_parent(current, walk, fetcher).await? else {
            // Reached genesis.
            *cursor = None;
            return Ok(None);
        };
        walk.children.insert(parent, current);
        if !walk.visited.insert(parent) {
            return Ok(Some(parent));
        }
        *cursor = Some(parent);
        Ok(None)
    }

    /// Parent id of `id`, loading the block from the walk, the store or the
    /// peer, in that order.
    async fn walk_parent(
        &self,
        id: BlockId,
        walk: &mut Walk,
        fetcher: &dyn BlockFetcher,
    ) -> Result<Option<BlockId>, ConsensusError> {
        if let Some(block) = walk.loaded.get(&id) {
            return Ok(block.prev_id);
        }
        let block = match self.store().get_block(&id)? {
            Some(block) => block,
            None => {
                let block = self
                    .fetch_verified(id, fetcher)
                    .await?
                    .ok_or(ConsensusError::PrevBlockMissing(id))?;
                let child = walk.children.get(&id).and_then(|c| walk.loaded.get(c));
                self.check_walked_block(&id, &block, child)?;
                walk.fetched.push((id, block.clone()));
                block
            }
        };
        let parent = block.prev_id;
        walk.loaded.insert(id, block);
        Ok(parent)
    }
}

/// Blocks from `start` down to `fork`, exclusive, newest first.
fn branch(
    start: BlockId,
    fork: BlockId,
    loaded: &HashMap<BlockId, Block>,
) -> Result<Vec<(BlockId, Block)>, ConsensusError> {
    let mut blocks = Vec::new();
    let mut current = start;
    while current != fork {
        let block = loaded.get(&current).ok_or_else(|| {
            ConsensusError::ReorgInconsistency(format!("block {current} was not walked"))
        })?;
        blocks.push((current, block.clone()));
        current = block.prev_id.ok_or_else(|| {
            ConsensusError::ReorgInconsistency(format!("reached genesis before fork point {fork}"))
        })?;
    }
    Ok(blocks)
}
