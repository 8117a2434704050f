//! The byte channel a node talks to its peers through.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MessageError;

/// Opaque identifier of a connected peer, assigned by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Outbound half of the gossip transport.
///
/// Implementations must not block: the node calls these from its event
/// loop. Inbound bytes are handed to the node separately.
pub trait Transport: Send + Sync {
    /// Send to a single peer.
    fn send(&self, peer: &PeerId, bytes: Vec<u8>) -> Result<(), MessageError>;

    /// Gossip to every connected peer.
    fn broadcast(&self, bytes: Vec<u8>) -> Result<(), MessageError>;
}
