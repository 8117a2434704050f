mod common;

use common::*;
use valchain_consensus::{
    BlockOutcome, ChainSelection, ConsensusError, NoFetch, ReorgSummary,
};
use valchain_store::{BlockStore, ConfirmedRef, ConfirmedStore};
use valchain_types::{BlockId, ChainTip, Digest, Entry};

fn selection(outcome: BlockOutcome) -> ChainSelection {
    match outcome {
        BlockOutcome::Accepted { selection, .. } => selection,
        BlockOutcome::Duplicate => panic!("block was treated as a duplicate"),
    }
}

fn refs(id: BlockId, entry: &Entry) -> Vec<ConfirmedRef> {
    vec![ConfirmedRef::new(id, entry.hash)]
}

#[tokio::test]
async fn heavier_branch_moves_entries_between_pool_and_index() {
    let clock = clock();
    let shared = entry("shared", 1);
    let (a2e, a3e) = (entry("a2", 2), entry("a3", 3));
    let (b2e, b3e, b4e) = (entry("b2", 4), entry("b3", 5), entry("b4", 6));

    let c1 = mine_on(&clock, &genesis(), vec![]);
    let a2 = mine_on(&clock, &c1, vec![a2e.clone()]);
    let a3 = mine_on(&clock, &a2, vec![a3e.clone(), shared.clone()]);
    let b2 = mine_on(&clock, &c1, vec![b2e.clone(), shared.clone()]);
    let b3 = mine_on(&clock, &b2, vec![b3e.clone()]);
    let b4 = mine_on(&clock, &b3, vec![b4e.clone()]);
    // Everything above predates start, so entries are not checked.
    clock.advance(1);
    let (mut engine, store) = engine(&clock);

    for block in [&c1, &a2, &a3] {
        let outcome = engine.process_block(block.1.clone(), &NoFetch).await.unwrap();
        assert_eq!(selection(outcome), ChainSelection::Extended);
    }
    assert_eq!(engine.tip(), Some(ChainTip::new(a3.0, 3)));
    assert_eq!(store.get_confirmed("shared").unwrap(), refs(a3.0, &shared));

    for block in [&b2, &b3] {
        let outcome = engine.process_block(block.1.clone(), &NoFetch).await.unwrap();
        assert_eq!(selection(outcome), ChainSelection::StoredOnly);
    }
    assert_eq!(engine.tip(), Some(ChainTip::new(a3.0, 3)));
    assert!(store.get_confirmed("b2").unwrap().is_empty());

    let outcome = engine.process_block(b4.1.clone(), &NoFetch).await.unwrap();
    assert_eq!(
        selection(outcome),
        ChainSelection::Adopted {
            reorg: Some(ReorgSummary {
                fork_point: c1.0,
                rolled_back: 2,
                applied: 3,
            })
        }
    );
    assert_eq!(engine.tip(), Some(ChainTip::new(b4.0, 4)));

    // Old branch entries are pending again, except the one the new
    // branch also carries.
    let pool = engine.pool();
    assert_eq!(pool.len(), 2);
    assert!(pool.contains(&a2e));
    assert!(pool.contains(&a3e));
    assert!(!pool.contains(&shared));

    assert!(store.get_confirmed("a2").unwrap().is_empty());
    assert!(store.get_confirmed("a3").unwrap().is_empty());
    assert_eq!(store.get_confirmed("shared").unwrap(), refs(b2.0, &shared));
    assert_eq!(store.get_confirmed("b2").unwrap(), refs(b2.0, &b2e));
    assert_eq!(store.get_confirmed("b3").unwrap(), refs(b3.0, &b3e));
    assert_eq!(store.get_confirmed("b4").unwrap(), refs(b4.0, &b4e));

    let candidate = engine.candidate().unwrap();
    assert_eq!(candidate.prev_id, Some(b4.0));
    assert_eq!(candidate.height, 5);
    assert_eq!(candidate.entries.len(), 2);
}

#[tokio::test]
async fn fork_at_genesis_rolls_back_the_whole_chain() {
    let clock = clock();
    let a1 = mine_on(&clock, &genesis(), vec![entry("a1", 1)]);
    let b1 = mine_on(&clock, &genesis(), vec![]);
    let b2 = mine_on(&clock, &b1, vec![]);
    clock.advance(1);
    let (mut engine, store) = engine(&clock);
    let (gid, _) = genesis();

    engine.process_block(a1.1, &NoFetch).await.unwrap();
    engine.process_block(b1.1, &NoFetch).await.unwrap();
    let outcome = engine.process_block(b2.1, &NoFetch).await.unwrap();

    assert_eq!(
        selection(outcome),
        ChainSelection::Adopted {
            reorg: Some(ReorgSummary {
                fork_point: gid,
                rolled_back: 1,
                applied: 2,
            })
        }
    );
    assert_eq!(engine.tip(), Some(ChainTip::new(b2.0, 2)));
    assert!(engine.pool().contains(&entry("a1", 1)));
    assert!(store.get_confirmed("a1").unwrap().is_empty());
}

#[tokio::test]
async fn missing_parent_without_a_peer_is_reported() {
    let clock = clock();
    let (mut engine, store) = engine(&clock);
    let b1 = mine_on(&clock, &genesis(), vec![]);
    let b2 = mine_on(&clock, &b1, vec![]);

    let err = engine.process_block(b2.1.clone(), &NoFetch).await.unwrap_err();
    assert!(matches!(err, ConsensusError::PrevBlockMissing(id) if id == b1.0));

    let fetcher = MapFetcher::default();
    let err = engine.process_block(b2.1, &fetcher).await.unwrap_err();
    assert!(matches!(err, ConsensusError::PrevBlockMissing(id) if id == b1.0));
    assert_eq!(fetcher.requests(), vec![b1.0]);
    assert!(!store.block_exists(&b2.0).unwrap());
}

#[tokio::test]
async fn missing_ancestors_are_fetched_and_processed_first() {
    let clock = clock();
    let (mut engine, store) = engine(&clock);
    let b1 = mine_on(&clock, &genesis(), vec![]);
    let b2 = mine_on(&clock, &b1, vec![]);
    let b3 = mine_on(&clock, &b2, vec![]);
    let fetcher = MapFetcher::with(&[b1.clone(), b2.clone()]);

    let outcome = engine.process_block(b3.1, &fetcher).await.unwrap();
    assert_eq!(selection(outcome), ChainSelection::Extended);
    assert_eq!(engine.tip(), Some(ChainTip::new(b3.0, 3)));
    assert_eq!(fetcher.requests(), vec![b2.0, b1.0]);
    assert!(store.block_exists(&b1.0).unwrap());
    assert!(store.block_exists(&b2.0).unwrap());
}

#[tokio::test]
async fn fetched_block_with_the_wrong_id_is_discarded() {
    let clock = clock();
    let (mut engine, store) = engine(&clock);
    let b1 = mine_on(&clock, &genesis(), vec![]);
    let other = mine_on(&clock, &genesis(), vec![]);
    let b2 = mine_on(&clock, &b1, vec![]);
    let fetcher = MapFetcher::default();
    fetcher.insert(b1.0, other.1);

    let err = engine.process_block(b2.1, &fetcher).await.unwrap_err();
    assert!(matches!(err, ConsensusError::PrevBlockMissing(id) if id == b1.0));
    assert!(!store.block_exists(&other.0).unwrap());
    assert_eq!(engine.tip().unwrap().height, 0);
}

#[tokio::test]
async fn rejected_parent_leaves_child_unprocessed() {
    let clock = clock();
    let (mut engine, store) = engine(&clock);
    let b1 = mine_on(&clock, &genesis(), vec![entry("unknown", 8)]);
    let b2 = mine_on(&clock, &b1, vec![]);
    let fetcher = MapFetcher::with(&[b1.clone()]);

    let err = engine.process_block(b2.1, &fetcher).await.unwrap_err();
    assert!(matches!(err, ConsensusError::PrevBlockMissing(id) if id == b1.0));
    assert!(!store.block_exists(&b1.0).unwrap());
    assert!(!store.block_exists(&b2.0).unwrap());
}

#[tokio::test]
async fn reorg_walk_fetches_blocks_missing_from_the_store() {
    let clock = clock();
    let a1 = mine_on(&clock, &genesis(), vec![]);
    let a2 = mine_on(&clock, &a1, vec![]);
    let b1 = mine_on(&clock, &genesis(), vec![]);
    let b2 = mine_on(&clock, &b1, vec![]);
    let b3 = mine_on(&clock, &b2, vec![entry("b3", 3)]);
    clock.advance(1);
    let (mut engine, store) = engine(&clock);

    for block in [&a1, &a2, &b1, &b2] {
        engine.process_block(block.1.clone(), &NoFetch).await.unwrap();
    }
    // Lose an ancestor of the new branch; the walk has to ask for it.
    store.delete_block(&b1.0).unwrap();
    let fetcher = MapFetcher::with(&[b1.clone()]);

    let outcome = engine.process_block(b3.1, &fetcher).await.unwrap();
    assert!(selection(outcome).moved_tip());
    assert_eq!(engine.tip(), Some(ChainTip::new(b3.0, 3)));
    assert_eq!(fetcher.requests(), vec![b1.0]);
    assert!(store.block_exists(&b1.0).unwrap());
    assert_eq!(store.get_confirmed("b3").unwrap(), refs(b3.0, &entry("b3", 3)));
}

#[tokio::test]
async fn reorg_walk_rejects_a_fetched_block_that_fails_validation() {
    let clock = clock();
    let a1 = mine_on(&clock, &genesis(), vec![]);
    let a2 = mine_on(&clock, &a1, vec![]);
    let mut easy = mine_on(&clock, &genesis(), vec![]).1;
    easy.target = Digest::MAX;
    let x1 = mine(&clock, &easy);
    let x2 = mine_on(&clock, &x1, vec![]);
    let x3 = mine_on(&clock, &x2, vec![entry("x3", 3)]);
    clock.advance(1);
    let (mut engine, store) = engine(&clock);

    for block in [&a1, &a2] {
        engine.process_block(block.1.clone(), &NoFetch).await.unwrap();
    }
    // Only x2 is on disk; its parent has to come from the peer.
    store.put_block(&x2.0, &x2.1).unwrap();
    let fetcher = MapFetcher::with(&[x1.clone()]);
    let tip = engine.tip();
    let generation = engine.candidate_generation();

    let err = engine.process_block(x3.1, &fetcher).await.unwrap_err();
    assert!(matches!(err, ConsensusError::InvalidTarget(target) if target == Digest::MAX));
    assert_eq!(fetcher.requests(), vec![x1.0]);
    assert_eq!(engine.tip(), tip);
    assert_eq!(engine.candidate_generation(), generation);
    assert!(!store.block_exists(&x1.0).unwrap());
    assert!(!store.block_exists(&x3.0).unwrap());
    assert!(store.get_confirmed("x3").unwrap().is_empty());
}

#[tokio::test]
async fn reorg_walk_fails_cleanly_when_an_ancestor_is_gone() {
    let clock = clock();
    let a1 = mine_on(&clock, &genesis(), vec![]);
    let b1 = mine_on(&clock, &genesis(), vec![]);
    let b2 = mine_on(&clock, &b1, vec![]);
    let b3 = mine_on(&clock, &b2, vec![]);
    let c2 = mine_on(&clock, &a1, vec![]);
    let c3 = mine_on(&clock, &c2, vec![]);
    let c4 = mine_on(&clock, &c3, vec![]);
    let (mut engine, store) = engine(&clock);

    for block in [&a1, &b1, &b2, &b3, &c2, &c3] {
        engine.process_block(block.1.clone(), &NoFetch).await.unwrap();
    }
    assert_eq!(engine.tip(), Some(ChainTip::new(b3.0, 3)));
    store.delete_block(&c2.0).unwrap();
    let tip = engine.tip();
    let generation = engine.candidate_generation();

    let err = engine.process_block(c4.1, &NoFetch).await.unwrap_err();
    assert!(matches!(err, ConsensusError::PrevBlockMissing(id) if id == c2.0));
    assert_eq!(engine.tip(), tip);
    assert_eq!(engine.candidate_generation(), generation);
    assert!(!store.block_exists(&c4.0).unwrap());
}
