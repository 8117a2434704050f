//! Nullable network: record messages without sending them.

use std::sync::Mutex;

use valchain_messages::{decode, MessageError, PeerId, Transport, WireMessage};

/// One outbound message. `peer` is `None` for a broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub peer: Option<PeerId>,
    pub bytes: Vec<u8>,
}

impl SentMessage {
    /// Decode the recorded bytes.
    pub fn message(&self) -> Result<WireMessage, MessageError> {
        decode(&self.bytes)
    }
}

/// A test network that records messages instead of sending them.
#[derive(Debug, Default)]
pub struct NullNetwork {
    sent: Mutex<Vec<SentMessage>>,
    fail_sends: Mutex<bool>,
}

impl NullNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all sent messages (for assertions).
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Decoded messages sent directly to `peer`.
    pub fn sent_to(&self, peer: &PeerId) -> Vec<WireMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.peer.as_ref() == Some(peer))
            .filter_map(|m| m.message().ok())
            .collect()
    }

    /// Decoded broadcast messages.
    pub fn broadcasts(&self) -> Vec<WireMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.peer.is_none())
            .filter_map(|m| m.message().ok())
            .collect()
    }

    /// Make every subsequent send fail, to exercise error paths.
    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock().unwrap() = fail;
    }

    /// Clear all state.
    pub fn reset(&self) {
        self.sent.lock().unwrap().clear();
        *self.fail_sends.lock().unwrap() = false;
    }

    fn record(&self, peer: Option<PeerId>, bytes: Vec<u8>) -> Result<(), MessageError> {
        if *self.fail_sends.lock().unwrap() {
            return Err(MessageError::Transport("null network configured to fail".into()));
        }
        self.sent.lock().unwrap().push(SentMessage { peer, bytes });
        Ok(())
    }
}

impl Transport for NullNetwork {
    fn send(&self, peer: &PeerId, bytes: Vec<u8>) -> Result<(), MessageError> {
        self.record(Some(peer.clone()), bytes)
    }

    fn broadcast(&self, bytes: Vec<u8>) -> Result<(), MessageError> {
        self.record(None, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valchain_messages::encode;

    #[test]
    fn records_sends_and_broadcasts_separately() {
        let net = NullNetwork::new();
        let peer = PeerId::from("p1");
        net.send(&peer, encode(&WireMessage::GetChainTip).unwrap())
            .unwrap();
        net.broadcast(encode(&WireMessage::error("x")).unwrap())
            .unwrap();

        assert_eq!(net.sent().len(), 2);
        assert_eq!(net.sent_to(&peer), vec![WireMessage::GetChainTip]);
        assert_eq!(net.broadcasts(), vec![WireMessage::error("x")]);
    }

    #[test]
    fn can_be_told_to_fail() {
        let net = NullNetwork::new();
        net.fail_sends(true);
        assert!(net.broadcast(vec![]).is_err());
        net.reset();
        assert!(net.broadcast(vec![]).is_ok());
        assert_eq!(net.sent().len(), 1);
    }
}
