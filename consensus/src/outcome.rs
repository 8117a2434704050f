use valchain_types::BlockId;

/// What chain selection did with an accepted block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainSelection {
    /// The block headed a heavier branch and became the tip.
    Adopted { reorg: Option<ReorgSummary> },
    /// The block was already the tip; its entries were confirmed again.
    Reaffirmed,
    /// The block built directly on the tip and became the new tip.
    Extended,
    /// Stored, but the tip did not move.
    StoredOnly,
}

impl ChainSelection {
    pub fn moved_tip(&self) -> bool {
        matches!(self, Self::Adopted { .. } | Self::Extended)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReorgSummary {
    pub fork_point: BlockId,
    /// Blocks taken off the old branch.
    pub rolled_back: usize,
    /// Blocks applied from the new branch, the new tip included.
    pub applied: usize,
}

/// Result of handing a block to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Already stored; nothing was checked or changed.
    Duplicate,
    Accepted {
        id: BlockId,
        height: u64,
        selection: ChainSelection,
    },
}
