//! # Restart
//!
//! A node rebuilt over the same chain and key-value store resumes from the
//! persisted finalized checkpoint instead of genesis.

use node_runtime::Subsystems;
use poa_finality::{FinalityStatus, Vote};

use super::fixtures::{fast_config, genesis, key, next_slot, node_with_pool};
use poa_txpool::TxPool;
use std::sync::Arc;

#[tokio::test]
async fn test_finalized_checkpoint_survives_restart() {
    let config = fast_config();
    let subsystems = Subsystems::in_memory(&genesis(3, 100)).unwrap();
    let reopen = || Subsystems {
        stater: subsystems.stater.clone(),
        repo: Arc::clone(&subsystems.repo),
        kv: Arc::clone(&subsystems.kv),
        validators: subsystems.validators.clone(),
        genesis: subsystems.genesis.clone(),
    };

    let first = node_with_pool(0, reopen(), Arc::new(TxPool::with_defaults()), &config);
    let mut head = None;
    for _ in 0..3 {
        let (parent, slot) = next_slot(&first.node);
        let proposer = super::fixtures::proposer_index(&first.node, slot);
        assert_eq!(proposer, 0);
        head = first.node.pack_at(&parent, slot).await.unwrap();
    }
    let head = head.unwrap();
    assert_eq!(head.number(), 3);

    let target = first
        .node
        .repo()
        .ancestor_id(&head.id, 2)
        .unwrap()
        .unwrap();
    for voter in 0..2 {
        first
            .node
            .finality()
            .on_vote(&Vote::sign(&key(voter), target, 0).unwrap())
            .unwrap();
    }
    first.node.finality().set_prune_base(1).unwrap();
    assert_eq!(first.node.finality().finalized_height(), 2);
    drop(first);

    let second = node_with_pool(0, reopen(), Arc::new(TxPool::with_defaults()), &config);
    let finality = second.node.finality();
    assert_eq!(finality.finalized().id, target);
    assert_eq!(
        finality.status(),
        FinalityStatus {
            finalized_height: 2,
            finalized_id: target,
            prune_base: 1,
        }
    );
    // The checkpoint is restored, not recomputed: no tallies carried over.
    assert!(finality.justified().is_none());
}
