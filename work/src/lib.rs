//! Proof-of-work for valchain blocks.
//!
//! A block is valid work when its id, read as a 256-bit big-endian number,
//! is strictly below the target `T` it carries. The search varies the nonce
//! and refreshes the timestamp on every attempt until that holds.

pub mod error;
pub mod generator;
pub mod validator;

pub use error::WorkError;
pub use generator::{MinedBlock, WorkGenerator};
pub use validator::{meets_target, validate_work};
