//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use valchain_types::ConsensusParams;

use crate::NodeError;

/// Whether the node keeps chain state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    /// Runs the consensus engine, stores blocks and answers queries.
    #[default]
    Full,
    /// Publishes assertions and queries peers; keeps no chain state.
    Light,
}

/// Configuration for a valchain node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for chain storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub mode: NodeMode,

    /// Whether to run the proof-of-work search. Without it the node still
    /// keeps a candidate block.
    #[serde(default = "default_true")]
    pub enable_mining: bool,

    /// Free text recorded in mined blocks.
    #[serde(default)]
    pub miner_tag: Option<String>,

    /// Worker threads for the proof-of-work search; 0 uses every core.
    #[serde(default)]
    pub mining_threads: usize,

    /// How long to wait for a peer to send a requested block.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// How long to wait for an answer to a validated/confirmed query.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,

    /// Capacity of the node's inbound event queue.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    #[serde(default)]
    pub consensus: ConsensusParams,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./valchain_data")
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout_ms() -> u64 {
    1_000
}

fn default_rpc_timeout_ms() -> u64 {
    5_000
}

fn default_event_queue_capacity() -> usize {
    1_024
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_map_size() -> usize {
    valchain_store_lmdb::DEFAULT_MAP_SIZE
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn is_full(&self) -> bool {
        self.mode == NodeMode::Full
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            mode: NodeMode::Full,
            enable_mining: default_true(),
            miner_tag: None,
            mining_threads: 0,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
            event_queue_capacity: default_event_queue_capacity(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            map_size: default_map_size(),
            consensus: ConsensusParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.fetch_timeout_ms, 1_000);
        assert_eq!(parsed.rpc_timeout_ms, 5_000);
        assert_eq!(parsed.consensus, ConsensusParams::mainnet());
        assert_eq!(parsed.mode, NodeMode::Full);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("should parse");
        assert!(config.enable_mining);
        assert!(config.is_full());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn consensus_table_overrides_network_defaults() {
        let config = NodeConfig::from_toml_str(
            r#"
            mode = "light"
            miner_tag = "lab"

            [consensus]
            pow_target = "0fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
            common_prefix = 2
            "#,
        )
        .expect("should parse");
        assert_eq!(config.mode, NodeMode::Light);
        assert_eq!(config.miner_tag.as_deref(), Some("lab"));
        assert_eq!(config.consensus, ConsensusParams::dev().with_common_prefix(2));
    }

    #[test]
    fn rejects_uppercase_target() {
        let err = NodeConfig::from_toml_str(
            r#"
            [consensus]
            pow_target = "0FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF"
            "#,
        );
        assert!(matches!(err, Err(NodeError::Config(_))));
    }
}
