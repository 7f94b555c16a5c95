//! Shared fixture for unit tests in this crate.

use crate::config::PackerConfig;
use crate::domain::{dev_accounts, GenesisBuilder};
use crate::packer::Packer;
use crate::processor::BlockProcessor;
use poa_bandwidth::{Bandwidth, BandwidthConfig};
use poa_chain::{ChainRepository, MemoryChainRepository};
use poa_state::{MemoryStateStore, Stater};
use shared_crypto::Secp256k1KeyPair;
use shared_types::constants::MIN_TX_GAS;
use shared_types::{Address, BlockSummary, Clause, Transaction, TransactionBuilder, ValidatorSet};
use std::sync::Arc;

pub const GENESIS_TS: u64 = 1_600_000_000;
pub const FUNDS: u128 = 1_000_000_000_000_000_000_000;
pub const RECIPIENT: Address = [0xB0; 20];

pub struct Fixture {
    pub keys: Vec<Secp256k1KeyPair>,
    pub validators: ValidatorSet,
    pub repo: Arc<MemoryChainRepository>,
    pub stater: Stater,
    pub bandwidth: Arc<Bandwidth>,
}

impl Fixture {
    /// Chain whose first `authorities` dev accounts are validators; every
    /// dev account is funded.
    pub fn new(authorities: usize) -> Self {
        let keys = dev_accounts();
        let stater = Stater::new(Arc::new(MemoryStateStore::new()));
        let mut builder = GenesisBuilder::new(GENESIS_TS);
        for key in &keys {
            builder = builder.allocate(key.address(), FUNDS);
        }
        for key in keys.iter().take(authorities) {
            builder = builder.validator(key.address());
        }
        let (genesis, validators) = builder.build(&stater).unwrap();

        Self {
            keys,
            validators,
            repo: Arc::new(MemoryChainRepository::new(&genesis)),
            stater,
            bandwidth: Arc::new(Bandwidth::new(BandwidthConfig::default())),
        }
    }

    pub fn packer(&self, index: usize) -> Packer {
        Packer::new(
            self.repo.clone(),
            self.stater.clone(),
            Arc::clone(&self.bandwidth),
            self.validators.clone(),
            self.keys[index].address(),
            None,
            &PackerConfig::default(),
        )
    }

    pub fn outsider_packer(&self) -> Packer {
        self.packer(self.keys.len() - 1)
    }

    pub fn processor(&self) -> BlockProcessor {
        BlockProcessor::new(
            self.repo.clone(),
            self.stater.clone(),
            self.validators.clone(),
            PackerConfig::default().block_interval_secs,
        )
    }

    /// First slot after `parent` owned by validator `index`
    pub fn slot_of(&self, index: usize, parent: &BlockSummary) -> u64 {
        self.packer(index).next_turn(parent, 0).unwrap()
    }

    pub fn key_of(&self, address: Address) -> &Secp256k1KeyPair {
        self.keys.iter().find(|k| k.address() == address).unwrap()
    }

    /// Pack and commit an empty block on `parent` in the packer's next slot
    pub fn commit_empty(&self, packer: &Packer, parent: &BlockSummary) -> BlockSummary {
        let ts = packer.next_turn(parent, 0).unwrap();
        let mut flow = packer.schedule(parent, ts).unwrap();
        let (block, stage, receipts) = flow
            .pack(self.key_of(packer.master()), None, false)
            .unwrap();
        stage.commit().unwrap();
        self.repo
            .add_block_and_set_best(&block, receipts, self.repo.conflicts_at(block.number()))
            .unwrap()
    }

    pub fn transfer(&self, from: usize, nonce: u64, value: u128) -> Transaction {
        TransactionBuilder::new(self.repo.chain_tag())
            .clause(Clause::transfer(RECIPIENT, value))
            .gas(MIN_TX_GAS)
            .nonce(nonce)
            .sign(&self.keys[from])
            .unwrap()
    }
}
