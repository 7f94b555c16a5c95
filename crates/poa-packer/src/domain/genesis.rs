//! Genesis Block Creation
//!
//! Writes the initial allocations through the [`Stater`], commits them, and
//! returns the unsealed genesis block at height 0.

use poa_state::{StateError, Stater};
use shared_crypto::{Blake3Hasher, Secp256k1KeyPair};
use shared_types::constants::INITIAL_GAS_LIMIT;
use shared_types::{Address, Block, BlockId, Header, ValidatorSet, EMPTY_ROOT};
use thiserror::Error;

/// Errors building the genesis block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenesisError {
    /// No validators configured
    #[error("Genesis requires at least one validator")]
    NoValidators,

    /// Allocation could not be written or committed
    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Builder for the genesis block and its validator set
#[derive(Debug, Clone)]
pub struct GenesisBuilder {
    timestamp: u64,
    gas_limit: u64,
    allocations: Vec<(Address, u128)>,
    validators: Vec<Address>,
}

impl GenesisBuilder {
    /// Start a genesis at `timestamp` (unix seconds)
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            gas_limit: INITIAL_GAS_LIMIT,
            allocations: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Override the initial gas limit
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Credit `balance` to `address`
    pub fn allocate(mut self, address: Address, balance: u128) -> Self {
        self.allocations.push((address, balance));
        self
    }

    /// Add an authority
    pub fn validator(mut self, address: Address) -> Self {
        self.validators.push(address);
        self
    }

    /// Commit the allocations and produce the genesis block
    pub fn build(&self, stater: &Stater) -> Result<(Block, ValidatorSet), GenesisError> {
        if self.validators.is_empty() {
            return Err(GenesisError::NoValidators);
        }

        let mut state = stater.new_state(EMPTY_ROOT)?;
        for (address, balance) in &self.allocations {
            state.add_balance(*address, *balance)?;
        }
        let state_root = state.stage().commit()?;

        let header = Header {
            parent_id: BlockId::GENESIS_PARENT,
            timestamp: self.timestamp,
            gas_limit: self.gas_limit,
            beneficiary: [0u8; 20],
            gas_used: 0,
            total_score: 0,
            txs_root: EMPTY_ROOT,
            state_root,
            receipts_root: EMPTY_ROOT,
            vote_finality: false,
            signature: Vec::new(),
        };

        tracing::info!(
            id = %header.id(),
            accounts = self.allocations.len(),
            validators = self.validators.len(),
            "genesis built"
        );

        Ok((
            Block {
                header,
                transactions: Vec::new(),
            },
            ValidatorSet::new(self.validators.clone()),
        ))
    }
}

/// Ten deterministic key pairs for tests and the solo devnet
pub fn dev_accounts() -> Vec<Secp256k1KeyPair> {
    (0u32..)
        .filter_map(|i| {
            let mut hasher = Blake3Hasher::new();
            hasher.update(b"poa-dev-account").update(&i.to_be_bytes());
            Secp256k1KeyPair::from_bytes(hasher.finalize()).ok()
        })
        .take(10)
        .collect()
}
