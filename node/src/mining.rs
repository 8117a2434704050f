//! Drives the proof-of-work search on blocking worker threads.
//!
//! The event loop owns the coordinator. Every search is tagged with the
//! candidate generation it was started for; the loop drops results whose
//! generation is no longer current.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use valchain_types::Block;
use valchain_work::{WorkError, WorkGenerator};

use crate::tracing_spans::mining_span;

/// A block found by a search, tagged with its candidate generation.
#[derive(Clone, Debug)]
pub struct MinedCandidate {
    pub generation: u64,
    pub block: Block,
}

struct Search {
    generation: u64,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct MiningCoordinator {
    generator: Arc<WorkGenerator>,
    results: mpsc::Sender<MinedCandidate>,
    current: Option<Search>,
}

impl MiningCoordinator {
    pub fn new(generator: WorkGenerator, results: mpsc::Sender<MinedCandidate>) -> Self {
        Self {
            generator: Arc::new(generator),
            results,
            current: None,
        }
    }

    /// Generation of the most recently started search.
    pub fn generation(&self) -> Option<u64> {
        self.current.as_ref().map(|search| search.generation)
    }

    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|search| !search.handle.is_finished())
    }

    /// Cancel any running search and start one on `candidate`.
    pub fn restart(&mut self, candidate: Block, generation: u64) {
        self.cancel();

        let cancel = Arc::new(AtomicBool::new(false));
        let generator = Arc::clone(&self.generator);
        let results = self.results.clone();
        let flag = Arc::clone(&cancel);
        let span = mining_span(generation, candidate.height);

        let handle = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            match generator.generate(&candidate, &flag) {
                Ok(mined) => {
                    tracing::debug!(block_id = %mined.id, "search succeeded");
                    let found = MinedCandidate {
                        generation,
                        block: mined.block,
                    };
                    if results.blocking_send(found).is_err() {
                        tracing::debug!("mined block dropped, node stopped");
                    }
                }
                Err(WorkError::Cancelled) => tracing::trace!("search cancelled"),
                Err(e) => tracing::warn!(error = %e, "search failed"),
            }
        });
        tracing::debug!(generation, "mining restarted");
        self.current = Some(Search {
            generation,
            cancel,
            handle,
        });
    }

    /// Ask the running search, if any, to stop.
    pub fn cancel(&mut self) {
        if let Some(search) = self.current.take() {
            search.cancel.store(true, Ordering::Relaxed);
        }
    }

    /// Cancel and wait for the worker to finish.
    pub async fn stop(&mut self) {
        if let Some(search) = self.current.take() {
            search.cancel.store(true, Ordering::Relaxed);
            if let Err(e) = search.handle.await {
                tracing::warn!(error = %e, "mining worker panicked");
            }
        }
    }
}

impl Drop for MiningCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use valchain_crypto::block_id;
    use valchain_types::{BlockKind, ConsensusParams, Digest, Nonce, SystemClock, Timestamp};
    use valchain_work::meets_target;

    fn candidate(target: Digest) -> Block {
        Block {
            kind: BlockKind::Block,
            target,
            created_at: Timestamp::from_millis(1),
            miner_tag: None,
            nonce: Nonce::default(),
            note: None,
            height: 1,
            prev_id: Some(Digest::new([3; 32])),
            entries: Vec::new(),
        }
    }

    fn coordinator() -> (MiningCoordinator, mpsc::Receiver<MinedCandidate>) {
        let (tx, rx) = mpsc::channel(4);
        let generator = WorkGenerator::with_threads(Arc::new(SystemClock), 2).unwrap();
        (MiningCoordinator::new(generator, tx), rx)
    }

    #[tokio::test]
    async fn delivers_tagged_result() {
        let (mut miner, mut rx) = coordinator();
        let target = ConsensusParams::dev().pow_target;
        miner.restart(candidate(target), 7);
        assert_eq!(miner.generation(), Some(7));

        let found = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.generation, 7);
        assert!(meets_target(&block_id(&found.block).unwrap(), &target));
    }

    #[tokio::test]
    async fn cancelled_search_reports_nothing() {
        let (mut miner, mut rx) = coordinator();
        miner.restart(candidate(Digest::ZERO), 1);
        miner.stop().await;
        assert!(!miner.is_running());
        assert_eq!(miner.generation(), None);
        let nothing = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn restart_replaces_running_search() {
        let (mut miner, mut rx) = coordinator();
        miner.restart(candidate(Digest::ZERO), 1);
        miner.restart(candidate(ConsensusParams::dev().pow_target), 2);
        let found = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.generation, 2);
        miner.stop().await;
    }
}
