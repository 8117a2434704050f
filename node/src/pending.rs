//! Correlating replies with outstanding requests.
//!
//! A waiter registers under a key and gets a receiver. Whoever sees the
//! answer resolves the key, waking every waiter registered under it. Both
//! missing blocks (keyed by block id) and validated/confirmed queries
//! (keyed by assertion key) go through here.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

pub struct PendingRequests<K, V> {
    waiters: Mutex<HashMap<K, Vec<oneshot::Sender<V>>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> PendingRequests<K, V> {
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, key: K) -> oneshot::Receiver<V> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = waiters.entry(key).or_default();
        slot.retain(|tx| !tx.is_closed());
        slot.push(tx);
        rx
    }

    /// Hand `value` to every live waiter on `key`. Returns whether anyone
    /// was waiting.
    pub fn resolve(&self, key: &K, value: V) -> bool {
        let senders = self
            .waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .unwrap_or_default();
        let mut delivered = false;
        for tx in senders {
            delivered |= tx.send(value.clone()).is_ok();
        }
        delivered
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|slot| slot.iter().any(|tx| !tx.is_closed()))
    }

    /// Drop waiters whose receivers are gone.
    pub fn prune(&self) {
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        waiters.retain(|_, slot| {
            slot.retain(|tx| !tx.is_closed());
            !slot.is_empty()
        });
    }

    pub fn len(&self) -> usize {
        self.waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register under `key`, run `send`, then wait up to `timeout` for the
    /// answer. `None` on timeout.
    pub async fn request<E>(
        &self,
        key: K,
        timeout: Duration,
        send: impl FnOnce() -> Result<(), E>,
    ) -> Result<Option<V>, E> {
        let rx = self.register(key);
        if let Err(e) = send() {
            drop(rx);
            self.prune();
            return Err(e);
        }
        let answer = tokio::time::timeout(timeout, rx).await.ok().and_then(Result::ok);
        if answer.is_none() {
            self.prune();
        }
        Ok(answer)
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for PendingRequests<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_wakes_every_waiter() {
        let pending = PendingRequests::<&str, u32>::new();
        let a = pending.register("k");
        let b = pending.register("k");
        assert!(pending.is_pending(&"k"));
        assert!(pending.resolve(&"k", 7));
        assert_eq!(a.await.unwrap(), 7);
        assert_eq!(b.await.unwrap(), 7);
        assert!(pending.is_empty());
    }

    #[test]
    fn resolve_without_waiters_is_noop() {
        let pending = PendingRequests::<&str, u32>::new();
        assert!(!pending.resolve(&"k", 1));
        let rx = pending.register("k");
        drop(rx);
        assert!(!pending.is_pending(&"k"));
        assert!(!pending.resolve(&"k", 1));
    }

    #[tokio::test]
    async fn request_times_out_and_cleans_up() {
        let pending = PendingRequests::<&str, u32>::new();
        let answer = pending
            .request::<()>("k", Duration::from_millis(50), || Ok(()))
            .await
            .unwrap();
        assert_eq!(answer, None);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn request_propagates_send_failure() {
        let pending = PendingRequests::<&str, u32>::new();
        let result = pending
            .request("k", Duration::from_secs(1), || Err("offline"))
            .await;
        assert_eq!(result, Err("offline"));
        assert!(!pending.is_pending(&"k"));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn failed_send_keeps_other_waiters_on_the_key() {
        let pending = PendingRequests::<&str, u32>::new();
        let earlier = pending.register("k");
        let result = pending
            .request("k", Duration::from_secs(1), || Err("offline"))
            .await;
        assert_eq!(result, Err("offline"));
        assert!(pending.is_pending(&"k"));
        assert!(pending.resolve(&"k", 3));
        assert_eq!(earlier.await.unwrap(), 3);
        assert!(pending.is_empty());
    }
}
