//! valchain node: wires the consensus engine to the network.
//!
//! The node is the central coordinator that:
//! - Decodes inbound wire messages and routes them to the engine
//! - Fetches missing blocks from the peer that referenced them
//! - Records and gossips application assertions
//! - Drives the proof-of-work search and announces mined blocks
//! - Answers and issues validated/confirmed queries

pub mod config;
pub mod error;
pub mod fetcher;
pub mod handle;
pub mod logging;
pub mod metrics;
pub mod mining;
pub mod node;
pub mod pending;
pub mod shutdown;
pub mod tracing_spans;
pub mod validator;

pub use config::{NodeConfig, NodeMode};
pub use error::NodeError;
pub use fetcher::PeerFetcher;
pub use handle::NodeHandle;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use mining::{MinedCandidate, MiningCoordinator};
pub use node::Node;
pub use pending::PendingRequests;
pub use shutdown::{ShutdownController, ShutdownSignal};
pub use validator::{AcceptAll, AssertionValidator};
