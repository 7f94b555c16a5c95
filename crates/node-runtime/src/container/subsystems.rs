//! # Subsystem Container
//!
//! Storage-level collaborators shared by the packer, the block processor and
//! the finality engine.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: State store, Stater
//! Level 1: Genesis (writes allocations through the Stater)
//! Level 2: Chain repository (seeded with genesis), finality KV store
//! ```
//!
//! The [`crate::Node`] builds the services (packer, processor, finality,
//! bandwidth) on top of these.

use std::sync::Arc;

use poa_chain::{ChainRepository, InMemoryKVStore, KeyValueStore, MemoryChainRepository};
use poa_packer::{dev_accounts, GenesisBuilder, GenesisError};
use poa_state::{MemoryStateStore, Stater};
use shared_types::{Address, Block, ValidatorSet};
use tracing::{info, instrument};

/// Balance of every account funded by the devnet genesis
pub const DEVNET_FUNDS: u128 = 1_000_000_000_000_000_000_000_000;

/// Storage collaborators of one node.
pub struct Subsystems {
    /// Account state.
    pub stater: Stater,
    /// Blocks, receipts and the best pointer.
    pub repo: Arc<dyn ChainRepository>,
    /// Persisted finality status.
    pub kv: Arc<dyn KeyValueStore>,
    /// Authorities fixed at genesis.
    pub validators: ValidatorSet,
    /// Block 0.
    pub genesis: Block,
}

impl Subsystems {
    /// Fresh in-memory stores seeded with `genesis`.
    #[instrument(skip(genesis))]
    pub fn in_memory(genesis: &GenesisBuilder) -> Result<Self, GenesisError> {
        let stater = Stater::new(Arc::new(MemoryStateStore::new()));
        let (block, validators) = genesis.build(&stater)?;
        let repo: Arc<dyn ChainRepository> = Arc::new(MemoryChainRepository::new(&block));

        info!(
            genesis = %block.id(),
            validators = validators.len(),
            "subsystems initialised"
        );

        Ok(Self {
            stater,
            repo,
            kv: Arc::new(InMemoryKVStore::new()),
            validators,
            genesis: block,
        })
    }
}

/// Single-authority genesis that funds the master and the dev accounts.
///
/// `now` is rounded down to the block interval so the first slot is aligned.
pub fn devnet_genesis(master: Address, block_interval: u64, now: u64) -> GenesisBuilder {
    let timestamp = if block_interval == 0 {
        now
    } else {
        now - now % block_interval
    };
    let mut builder = GenesisBuilder::new(timestamp)
        .validator(master)
        .allocate(master, DEVNET_FUNDS);
    for key in dev_accounts() {
        builder = builder.allocate(key.address(), DEVNET_FUNDS);
    }
    builder
}
