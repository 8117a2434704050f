//! Read-only lookups of validated and confirmed hashes.

use valchain_store::ChainStore;
use valchain_types::Digest;

use crate::{ConsensusEngine, ConsensusError};

impl<S: ChainStore> ConsensusEngine<S> {
    /// The hash this node validated for `key`, falling back to any hash
    /// found on the adopted chain regardless of depth.
    pub fn get_validated(&self, key: &str) -> Result<Option<Digest>, ConsensusError> {
        if let Some(hash) = self.store().get_validated(key)? {
            return Ok(Some(hash));
        }
        self.get_confirmed(key, true)
    }

    /// The hash carried by the highest known block that confirms `key`.
    ///
    /// Unless `avoid_prefix` is set, only blocks buried at least
    /// `common_prefix` blocks below the tip count.
    pub fn get_confirmed(&self, key: &str, avoid_prefix: bool) -> Result<Option<Digest>, ConsensusError> {
        let tip_height = self.tip().map_or(0, |tip| tip.height);
        let limit = tip_height.checked_sub(self.params().common_prefix);

        let mut best: Option<(u64, Digest)> = None;
        for confirmed in self.store().get_confirmed(key)? {
            let Some(block) = self.store().get_block(&confirmed.block_id)? else {
                continue;
            };
            let buried = limit.is_some_and(|limit| block.height <= limit);
            if !(avoid_prefix || buried) {
                continue;
            }
            if best.map_or(true, |(height, _)| block.height > height) {
                best = Some((block.height, confirmed.hash));
            }
        }
        Ok(best.map(|(_, hash)| hash))
    }
}
