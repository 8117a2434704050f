//! Prometheus metrics for the valchain node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; [`NodeMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks received from peers.
    pub blocks_received: IntCounter,
    /// Received blocks that passed validation and were stored.
    pub blocks_accepted: IntCounter,
    /// Received blocks that failed validation.
    pub blocks_rejected: IntCounter,
    pub blocks_mined: IntCounter,
    /// Heavier branches adopted that were not a direct extension.
    pub reorgs: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub chain_height: IntGauge,
    pub pool_size: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let blocks_received = register_int_counter_with_registry!(
            Opts::new("valchain_blocks_received_total", "Blocks received from peers"),
            registry
        )?;
        let blocks_accepted = register_int_counter_with_registry!(
            Opts::new(
                "valchain_blocks_accepted_total",
                "Received blocks that passed validation"
            ),
            registry
        )?;
        let blocks_rejected = register_int_counter_with_registry!(
            Opts::new(
                "valchain_blocks_rejected_total",
                "Received blocks that failed validation"
            ),
            registry
        )?;
        let blocks_mined = register_int_counter_with_registry!(
            Opts::new("valchain_blocks_mined_total", "Blocks mined by this node"),
            registry
        )?;
        let reorgs = register_int_counter_with_registry!(
            Opts::new("valchain_reorgs_total", "Heavier branches adopted"),
            registry
        )?;
        let chain_height = register_int_gauge_with_registry!(
            Opts::new("valchain_chain_height", "Height of the adopted tip"),
            registry
        )?;
        let pool_size = register_int_gauge_with_registry!(
            Opts::new("valchain_pool_size", "Entries waiting to be mined"),
            registry
        )?;

        Ok(Self {
            registry,
            blocks_received,
            blocks_accepted,
            blocks_rejected,
            blocks_mined,
            reorgs,
            chain_height,
            pool_size,
        })
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| NodeError::Config(e.to_string()))
    }
}
