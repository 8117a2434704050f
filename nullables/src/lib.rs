//! Test doubles for the node's outside world.
//!
//! `NullClock` is a hand-driven millisecond clock, `NullNetwork` records
//! every send and broadcast for later assertions, and `NullStore` keeps all
//! four chain tables in memory. Engine and node tests run on these instead
//! of the system clock, a real transport and LMDB.

pub mod clock;
pub mod network;
pub mod store;

pub use clock::NullClock;
pub use network::{NullNetwork, SentMessage};
pub use store::NullStore;
