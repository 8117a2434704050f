//! Proof-of-work consensus for valchain.
//!
//! The [`ConsensusEngine`] validates blocks, keeps the local heaviest-chain
//! tip, moves entries between the pending pool and the confirmation index
//! when the tip moves or a heavier fork is adopted, and maintains the
//! candidate block that the miner works on. It is single-owner: every
//! mutating operation takes `&mut self`.

pub mod engine;
pub mod error;
pub mod fetcher;
pub mod genesis;
pub mod outcome;
pub mod pool;
mod queries;
mod reorg;

pub use engine::ConsensusEngine;
pub use error::ConsensusError;
pub use fetcher::{BlockFetcher, NoFetch};
pub use genesis::{genesis_block, genesis_id};
pub use outcome::{BlockOutcome, ChainSelection, ReorgSummary};
pub use pool::EntryPool;
