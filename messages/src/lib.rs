//! Network message types for valchain node-to-node communication.
//!
//! Every message is a JSON object tagged by its `type` member. The set of
//! messages is closed: [`decode`] either yields one of the [`WireMessage`]
//! variants or a [`MessageError`] that the receiver reports back to the
//! sender as an `error` message.

pub mod codec;
pub mod error;
pub mod message;
pub mod transport;

pub use codec::{decode, encode, encode_put_validated, parse_put_validated, MAX_MESSAGE_SIZE};
pub use error::MessageError;
pub use message::{AssertionValue, KeyHashReply, PutValidatedValue, WireMessage};
pub use transport::{PeerId, Transport};
