//! Shared builders for the integration scenarios.

use std::sync::Arc;

use node_runtime::{unix_now, InProcessCommunicator, Master, Node, NodeConfig, Subsystems};
use poa_packer::{dev_accounts, GenesisBuilder};
use poa_txpool::{Mempool, TxPool};
use shared_crypto::Secp256k1KeyPair;
use shared_types::constants::MIN_TX_GAS;
use shared_types::{Address, BlockSummary, Clause, Transaction, TransactionBuilder};

/// Balance of every dev account at genesis
pub const FUNDS: u128 = 1_000_000_000_000_000_000_000;

/// Receiver of test transfers; unfunded at genesis
pub const RECIPIENT: Address = [0xB0; 20];

/// Node config with one-second slots and near-instant commit backoff
pub fn fast_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.packer.block_interval_secs = 1;
    config.packer.commit_backoff_ms = 1;
    config
}

/// Dev account `index`
pub fn key(index: usize) -> Secp256k1KeyPair {
    dev_accounts().swap_remove(index)
}

/// Genesis `age` seconds old, dev accounts `0..authorities` as validators,
/// every dev account funded
pub fn genesis(authorities: usize, age: u64) -> GenesisBuilder {
    let mut builder = GenesisBuilder::new(unix_now() - age);
    for (i, key) in dev_accounts().iter().enumerate() {
        builder = builder.allocate(key.address(), FUNDS);
        if i < authorities {
            builder = builder.validator(key.address());
        }
    }
    builder
}

/// A node plus the handles tests poke at
pub struct TestNode {
    pub node: Arc<Node>,
    pub comm: Arc<InProcessCommunicator>,
}

/// Node mastered by dev account `master` with a plain pool
pub fn node(master: usize, genesis: &GenesisBuilder, config: &NodeConfig) -> TestNode {
    node_with_pool(
        master,
        Subsystems::in_memory(genesis).expect("genesis builds"),
        Arc::new(TxPool::with_defaults()),
        config,
    )
}

/// Node over prepared subsystems and a caller-supplied pool
pub fn node_with_pool(
    master: usize,
    subsystems: Subsystems,
    pool: Arc<dyn Mempool>,
    config: &NodeConfig,
) -> TestNode {
    let comm = Arc::new(InProcessCommunicator::new());
    let node = Node::new(config, subsystems, Master::new(key(master)), pool, comm.clone())
        .expect("node assembles");
    TestNode {
        node: Arc::new(node),
        comm,
    }
}

/// Index of the dev account that owns slot `timestamp`
pub fn proposer_index(node: &Node, timestamp: u64) -> usize {
    let proposer = node
        .packer()
        .proposer_at(timestamp)
        .expect("validator set is not empty");
    dev_accounts()
        .iter()
        .position(|k| k.address() == proposer)
        .expect("proposer is a dev account")
}

/// Best block and the master's first slot after it
pub fn next_slot(node: &Node) -> (BlockSummary, u64) {
    let parent = node.repo().best_block_summary();
    let slot = node.packer().next_turn(&parent, 0).expect("master is a validator");
    (parent, slot)
}

/// Signed transfer of `value` to [`RECIPIENT`]
pub fn transfer(node: &Node, from: &Secp256k1KeyPair, nonce: u64, value: u128) -> Transaction {
    TransactionBuilder::new(node.repo().chain_tag())
        .clause(Clause::transfer(RECIPIENT, value))
        .gas(MIN_TX_GAS)
        .nonce(nonce)
        .sign(from)
        .expect("dev key signs")
}
