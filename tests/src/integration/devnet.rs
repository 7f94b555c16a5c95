//! # Linked Devnet
//!
//! Three authorities run their packer loops and ingress side by side over
//! in-process communicators. Blocks rotate between them in real time and
//! every node ends up on the same chain.

use std::time::Duration;

use node_runtime::{InProcessCommunicator, LoopPhase};
use poa_packer::dev_accounts;
use tokio::sync::watch;
use tokio::time::timeout;

use super::fixtures::{fast_config, genesis, node, TestNode};

const TARGET_HEIGHT: u32 = 4;

async fn wait_for_height(node: &TestNode, height: u32) {
    let mut best = node.node.repo().subscribe_best();
    while best.borrow().number() < height {
        best.changed().await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_three_authorities_converge() {
    let config = fast_config();
    let genesis = genesis(3, 0);
    let nodes: Vec<TestNode> = (0..3).map(|i| node(i, &genesis, &config)).collect();
    for i in 0..nodes.len() {
        for j in i + 1..nodes.len() {
            InProcessCommunicator::link(&nodes[i].comm, &nodes[j].comm);
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();
    for t in &nodes {
        tasks.push(tokio::spawn(t.node.clone().run_ingress(shutdown_rx.clone())));
        tasks.push(tokio::spawn(t.node.clone().run(shutdown_rx.clone())));
    }

    timeout(Duration::from_secs(30), async {
        for t in &nodes {
            wait_for_height(t, TARGET_HEIGHT).await;
        }
    })
    .await
    .expect("devnet reached target height");

    shutdown_tx.send(true).unwrap();
    for task in tasks {
        timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    // Same canonical block at every settled height.
    let settled = TARGET_HEIGHT - 1;
    let canonical: Vec<_> = nodes
        .iter()
        .map(|t| {
            let repo = t.node.repo();
            repo.ancestor_id(&repo.best_block_summary().id, settled)
                .unwrap()
                .unwrap()
        })
        .collect();
    assert!(canonical.windows(2).all(|w| w[0] == w[1]));

    // Proposers rotate along that chain, all of them authorities.
    let repo = nodes[0].node.repo();
    let authorities: Vec<_> = dev_accounts().iter().take(3).map(|k| k.address()).collect();
    let mut signers = Vec::new();
    let mut cursor = canonical[0];
    while cursor.number() > 0 {
        let summary = repo.get_block_summary(&cursor).unwrap().unwrap();
        let signer = summary.header.signer().unwrap();
        assert!(authorities.contains(&signer));
        if !signers.contains(&signer) {
            signers.push(signer);
        }
        cursor = summary.header.parent_id;
    }
    assert!(signers.len() >= 2);

    for t in &nodes {
        assert_eq!(t.node.phase(), LoopPhase::Idle);
    }
}
