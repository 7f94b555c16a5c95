//! # End-to-End Block Production
//!
//! Genesis at height 0, the rightful proposer schedules the first slot,
//! adopts one funded transfer, seals, commits, and a quorum of explicit
//! votes finalizes the block.

use std::sync::Arc;

use super::fixtures::{fast_config, genesis, key, node_with_pool, proposer_index, transfer, RECIPIENT};
use poa_finality::{Vote, VoteOutcome};
use poa_packer::SchedulingError;
use poa_txpool::{Mempool, TxPool};

use node_runtime::Subsystems;

#[tokio::test]
async fn test_genesis_to_finalized_block() {
    let config = fast_config();
    let genesis = genesis(3, 100);

    // Find the authority owning the slot right after genesis.
    let probe = super::fixtures::node(0, &genesis, &config);
    let parent = probe.node.repo().best_block_summary();
    assert_eq!(parent.number(), 0);
    let slot = parent.timestamp() + config.packer.block_interval_secs;
    let proposer = proposer_index(&probe.node, slot);

    let subsystems = Subsystems::in_memory(&genesis).unwrap();
    let stater = subsystems.stater.clone();
    let pool = Arc::new(TxPool::with_defaults());
    let t = node_with_pool(proposer, subsystems, pool.clone(), &config);
    let node = &t.node;

    // Scheduling succeeds for the rightful proposer only.
    let flow = node.packer().schedule(&parent, slot).unwrap();
    assert_eq!(flow.number(), 1);
    drop(flow);
    let other = super::fixtures::node((proposer + 1) % 3, &genesis, &config);
    assert!(matches!(
        other.node.packer().schedule(&parent, slot),
        Err(SchedulingError::NotOurTurn { .. })
    ));

    let sender = key(4);
    let tx = transfer(node, &sender, 1, 5_000);
    pool.add(tx.clone()).unwrap();

    let summary = node.pack_at(&parent, slot).await.unwrap().unwrap();
    assert_eq!(summary.number(), 1);
    assert_eq!(summary.tx_ids, vec![tx.id().unwrap()]);
    assert_eq!(node.repo().best_block_summary().id, summary.id);

    let receipts = node.repo().get_receipts(&summary.id).unwrap().unwrap();
    assert_eq!(receipts.len(), 1);
    assert!(!receipts[0].reverted);
    assert_eq!(receipts[0].gas_payer, sender.address());

    let state = stater.new_state(summary.header.state_root).unwrap();
    assert_eq!(state.balance(&RECIPIENT), 5_000);
    assert!(pool.is_empty());

    // Quorum is two of three.
    assert_eq!(node.finality().finalized().id, parent.id);
    let first = Vote::sign(&key(0), summary.id, 0).unwrap();
    let second = Vote::sign(&key(1), summary.id, 0).unwrap();
    assert_eq!(node.finality().on_vote(&first).unwrap(), VoteOutcome::Counted);
    assert!(matches!(
        node.finality().on_vote(&second).unwrap(),
        VoteOutcome::Finalized(ref finalized) if finalized.id == summary.id
    ));
    assert_eq!(node.finality().finalized().id, summary.id);
    assert_eq!(node.finality().finalized_height(), 1);
}

#[tokio::test]
async fn test_empty_block_is_signed_by_proposer() {
    let config = fast_config();
    let t = super::fixtures::node(0, &genesis(1, 100), &config);
    let (parent, slot) = super::fixtures::next_slot(&t.node);

    let summary = t.node.pack_at(&parent, slot).await.unwrap().unwrap();
    assert!(summary.tx_ids.is_empty());
    assert_eq!(summary.header.signer().unwrap(), key(0).address());
    assert_eq!(summary.header.total_score, 1);
}
