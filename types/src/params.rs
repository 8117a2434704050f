//! Consensus parameters shared by every node of a network.

use serde::{Deserialize, Serialize};

use crate::Digest;

/// Proof-of-work target of the main network
/// (`00001af0` followed by zeros).
pub const MAINNET_POW_TARGET: Digest = Digest::new([
    0x00, 0x00, 0x1a, 0xf0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0,
]);

/// Number of blocks that must be mined on top of a block before its entries
/// count as confirmed.
pub const DEFAULT_COMMON_PREFIX: u64 = 5;

/// Network-wide consensus constants. There is no difficulty adjustment:
/// every block must carry exactly `pow_target`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub pow_target: Digest,
    #[serde(default = "default_common_prefix")]
    pub common_prefix: u64,
}

fn default_common_prefix() -> u64 {
    DEFAULT_COMMON_PREFIX
}

impl ConsensusParams {
    pub fn mainnet() -> Self {
        Self {
            pow_target: MAINNET_POW_TARGET,
            common_prefix: DEFAULT_COMMON_PREFIX,
        }
    }

    /// Easy target for local development and tests: roughly one hash in
    /// sixteen satisfies it.
    pub fn dev() -> Self {
        let mut target = [0xff; 32];
        target[0] = 0x0f;
        Self {
            pow_target: Digest::new(target),
            common_prefix: DEFAULT_COMMON_PREFIX,
        }
    }

    pub fn with_common_prefix(mut self, common_prefix: u64) -> Self {
        self.common_prefix = common_prefix;
        self
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::mainnet()
    }
}
