//! # Mid-Cycle Cancellation
//!
//! A peer block for the height being packed arrives while the local cycle
//! drains the mempool. The cycle must be abandoned before commit, the local
//! block must never reach the chain, and the next cycle builds on the peer
//! block.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use poa_txpool::{Mempool, MempoolError, TxPool};
use shared_types::{Block, Hash, Transaction};

use node_runtime::{ImportOutcome, LoopPhase, Node, Subsystems};

use super::fixtures::{fast_config, genesis, key, next_slot, node, node_with_pool, transfer};

/// Pool that delivers a peer block to its node the first time the packer
/// asks for work
struct InterceptingPool {
    inner: TxPool,
    target: Mutex<Option<(Weak<Node>, Block)>>,
    observed: Mutex<Option<(LoopPhase, ImportOutcome)>>,
}

impl Mempool for InterceptingPool {
    fn pending(&self) -> Vec<Transaction> {
        let target = self.target.lock().take();
        if let Some((node, block)) = target {
            let node = node.upgrade().expect("node alive during cycle");
            let phase = node.phase();
            let outcome = node.import_block(&block).expect("peer block valid");
            *self.observed.lock() = Some((phase, outcome));
        }
        self.inner.pending()
    }

    fn add(&self, tx: Transaction) -> Result<Hash, MempoolError> {
        self.inner.add(tx)
    }

    fn remove(&self, ids: &[Hash]) {
        self.inner.remove(ids)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[tokio::test]
async fn test_peer_block_cancels_local_cycle() {
    let config = fast_config();
    let genesis = genesis(2, 100);

    // Validator 1 seals the competing block for height 1.
    let peer = node(1, &genesis, &config);
    let (parent, peer_slot) = next_slot(&peer.node);
    let peer_summary = peer.node.pack_at(&parent, peer_slot).await.unwrap().unwrap();
    let peer_block = peer.node.repo().get_block(&peer_summary.id).unwrap().unwrap();

    let pool = Arc::new(InterceptingPool {
        inner: TxPool::with_defaults(),
        target: Mutex::new(None),
        observed: Mutex::new(None),
    });
    let local = node_with_pool(0, Subsystems::in_memory(&genesis).unwrap(), pool.clone(), &config);
    let pending_tx = transfer(&local.node, &key(5), 1, 77);
    pool.add(pending_tx.clone()).unwrap();
    *pool.target.lock() = Some((Arc::downgrade(&local.node), peer_block.clone()));

    let (parent, slot) = next_slot(&local.node);
    assert_eq!(parent.number(), 0);
    let outcome = local.node.pack_at(&parent, slot).await.unwrap();
    assert!(outcome.is_none());

    let (phase, import) = pool.observed.lock().take().unwrap();
    assert_eq!(phase, LoopPhase::Packing);
    assert!(matches!(import, ImportOutcome::Imported { promoted: true, .. }));

    // Only the peer block exists at height 1; nothing was broadcast.
    let repo = local.node.repo();
    assert_eq!(repo.best_block_summary().id, peer_summary.id);
    assert_eq!(repo.conflicts_at(1), 1);
    assert!(local.comm.broadcasted().is_empty());
    assert_eq!(local.node.metrics().get_cycles_cancelled(), 1);
    assert_eq!(pool.len(), 1);

    // Rescheduling proceeds against the peer block.
    let (new_parent, next) = next_slot(&local.node);
    assert_eq!(new_parent.id, peer_summary.id);
    let summary = local.node.pack_at(&new_parent, next).await.unwrap().unwrap();
    assert_eq!(summary.number(), 2);
    assert_eq!(summary.header.parent_id, peer_summary.id);
    assert_eq!(summary.tx_ids, vec![pending_tx.id().unwrap()]);
    assert_eq!(local.comm.broadcasted(), vec![summary.id]);
}

#[tokio::test]
async fn test_peer_block_behind_best_not_promoted() {
    let config = fast_config();
    let genesis = genesis(2, 100);
    let a = node(0, &genesis, &config);
    let b = node(1, &genesis, &config);

    // a builds two blocks of its own; b's block at height 1 arrives late.
    let (parent, slot) = next_slot(&b.node);
    let late = b.node.pack_at(&parent, slot).await.unwrap().unwrap();
    let late_block = b.node.repo().get_block(&late.id).unwrap().unwrap();

    let (parent, slot) = next_slot(&a.node);
    let first = a.node.pack_at(&parent, slot).await.unwrap().unwrap();
    let (parent, slot) = next_slot(&a.node);
    let second = a.node.pack_at(&parent, slot).await.unwrap().unwrap();
    assert_eq!(second.header.parent_id, first.id);

    let outcome = a.node.import_block(&late_block).unwrap();
    assert!(matches!(outcome, ImportOutcome::Imported { promoted: false, .. }));
    assert_eq!(a.node.repo().best_block_summary().id, second.id);
    assert_eq!(a.node.repo().conflicts_at(1), 2);
}
