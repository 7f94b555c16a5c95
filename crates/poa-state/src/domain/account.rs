//! # Account Entity
//!
//! ## Type Decisions
//!
//! - `balance: u128` covers every practical supply without a big-integer
//!   dependency.
//! - Accounts with a zero balance are indistinguishable from absent ones and
//!   are not part of the state root.

use serde::{Deserialize, Serialize};
use shared_crypto::Blake3Hasher;
use shared_types::{Address, Hash};

/// Account state tracked by the overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Balance in wei.
    pub balance: u128,
}

impl Account {
    /// Create an account with `balance`.
    pub fn new(balance: u128) -> Self {
        Self { balance }
    }

    /// Whether the account contributes nothing to the state root.
    pub fn is_empty(&self) -> bool {
        self.balance == 0
    }

    /// Leaf hash for the state root.
    pub fn leaf_hash(&self, address: &Address) -> Hash {
        let mut hasher = Blake3Hasher::new();
        hasher.update(address).update(&self.balance.to_be_bytes());
        hasher.finalize()
    }
}
