//! PoW search (multi-threaded CPU).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::{meets_target, WorkError};
use valchain_crypto::block_id;
use valchain_types::{Block, BlockId, Clock};

/// Attempts per thread between checks of the stop flags.
const BATCH_SIZE: u64 = 4096;

/// A block whose id is below its target, with that id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinedBlock {
    pub block: Block,
    pub id: BlockId,
}

/// Searches for a nonce that makes a candidate block valid work.
pub struct WorkGenerator {
    clock: Arc<dyn Clock>,
    pool: Option<rayon::ThreadPool>,
}

impl WorkGenerator {
    /// Use rayon's global pool (one thread per core).
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, pool: None }
    }

    /// Use a dedicated pool of `threads` workers.
    pub fn with_threads(clock: Arc<dyn Clock>, threads: usize) -> Result<Self, WorkError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("valchain-work-{i}"))
            .build()
            .map_err(|e| WorkError::ThreadPool(e.to_string()))?;
        Ok(Self {
            clock,
            pool: Some(pool),
        })
    }

    /// Mine `candidate` until its id is below `candidate.target` or
    /// `cancel` is raised.
    ///
    /// Each thread starts at the candidate nonce plus its index and steps by
    /// the thread count, so threads never try the same nonce. Every attempt
    /// stamps the block with the current time. The first thread to succeed
    /// signals the others to stop.
    pub fn generate(&self, candidate: &Block, cancel: &AtomicBool) -> Result<MinedBlock, WorkError> {
        match &self.pool {
            Some(pool) => pool.install(|| self.search(candidate, cancel)),
            None => self.search(candidate, cancel),
        }
    }

    fn search(&self, candidate: &Block, cancel: &AtomicBool) -> Result<MinedBlock, WorkError> {
        let found = AtomicBool::new(false);
        let result: Mutex<Option<Result<MinedBlock, WorkError>>> = Mutex::new(None);
        let num_threads = rayon::current_num_threads().max(1);
        let stride = num_threads as u64;

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let mut block = candidate.clone();
            block.nonce.advance(thread_id as u64);

            loop {
                if found.load(Ordering::Relaxed) || cancel.load(Ordering::Relaxed) {
                    return;
                }

                for _ in 0..BATCH_SIZE {
                    block.created_at = self.clock.now();
                    let outcome = match block_id(&block) {
                        Ok(id) if meets_target(&id, &block.target) => Ok(MinedBlock {
                            block: block.clone(),
                            id,
                        }),
                        Ok(_) => {
                            block.nonce.advance(stride);
                            continue;
                        }
                        Err(e) => Err(WorkError::from(e)),
                    };
                    if !found.swap(true, Ordering::AcqRel) {
                        if let Ok(mut slot) = result.lock() {
                            *slot = Some(outcome);
                        }
                    }
                    return;
                }
            }
        });

        result
            .into_inner()
            .ok()
            .flatten()
            .unwrap_or(Err(WorkError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate_work;
    use valchain_nullables::NullClock;
    use valchain_types::{BlockKind, Digest, Nonce, Timestamp};

    fn candidate(target: Digest) -> Block {
        Block {
            kind: BlockKind::Block,
            target,
            created_at: Timestamp::from_millis(1),
            miner_tag: Some("test-miner".into()),
            nonce: Nonce::new([0x42; 32]),
            note: None,
            height: 1,
            prev_id: Some(Digest::new([0x01; 32])),
            entries: vec![],
        }
    }

    fn easy_target() -> Digest {
        let mut bytes = [0xff; 32];
        bytes[0] = 0x0f;
        Digest::new(bytes)
    }

    #[test]
    fn test_generate_work() {
        let clock = Arc::new(NullClock::new(5_000));
        let generator = WorkGenerator::new(clock);
        let mined = generator
            .generate(&candidate(easy_target()), &AtomicBool::new(false))
            .unwrap();

        assert!(validate_work(&mined.block).unwrap());
        assert_eq!(mined.id, block_id(&mined.block).unwrap());
        assert_eq!(mined.block.created_at, Timestamp::from_millis(5_000));
    }

    #[test]
    fn only_nonce_and_timestamp_change() {
        let generator = WorkGenerator::new(Arc::new(NullClock::new(9)));
        let original = candidate(easy_target());
        let mut mined = generator
            .generate(&original, &AtomicBool::new(false))
            .unwrap()
            .block;
        mined.nonce = original.nonce;
        mined.created_at = original.created_at;
        assert_eq!(mined, original);
    }

    #[test]
    fn pre_cancelled_search_returns_cancelled() {
        let generator = WorkGenerator::new(Arc::new(NullClock::new(1)));
        let result = generator.generate(&candidate(Digest::ZERO), &AtomicBool::new(true));
        assert!(matches!(result, Err(WorkError::Cancelled)));
    }

    #[test]
    fn cancel_stops_an_impossible_search() {
        let generator = Arc::new(WorkGenerator::new(Arc::new(NullClock::new(1))));
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = {
            let generator = Arc::clone(&generator);
            let cancel = Arc::clone(&cancel);
            std::thread::spawn(move || generator.generate(&candidate(Digest::ZERO), &cancel))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        cancel.store(true, Ordering::Relaxed);
        assert!(matches!(handle.join().unwrap(), Err(WorkError::Cancelled)));
    }

    #[test]
    fn dedicated_pool() {
        let generator = WorkGenerator::with_threads(Arc::new(NullClock::new(3)), 2).unwrap();
        let mined = generator
            .generate(&candidate(easy_target()), &AtomicBool::new(false))
            .unwrap();
        assert!(validate_work(&mined.block).unwrap());
    }
}
