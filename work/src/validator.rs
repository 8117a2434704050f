//! PoW validation.

use valchain_crypto::{block_id, CodecError};
use valchain_types::{Block, BlockId, Digest};

/// Whether `id` satisfies `target`. Equal is not enough.
pub fn meets_target(id: &BlockId, target: &Digest) -> bool {
    id < target
}

/// Whether a block's id is below the target the block itself carries.
/// Whether that target is the network's is a consensus question.
pub fn validate_work(block: &Block) -> Result<bool, CodecError> {
    Ok(meets_target(&block_id(block)?, &block.target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_inequality() {
        let target = Digest::new([0x10; 32]);
        assert!(meets_target(&Digest::new([0x0f; 32]), &target));
        assert!(!meets_target(&target, &target));
        assert!(!meets_target(&Digest::MAX, &target));
    }

    #[test]
    fn zero_target_accepts_nothing() {
        assert!(!meets_target(&Digest::ZERO, &Digest::ZERO));
    }
}
