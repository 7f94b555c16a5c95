//! Transaction pool error types.

use shared_types::{Hash, TypesError};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// Transaction already exists in the pool.
    #[error("Duplicate transaction: {}", short(.0))]
    DuplicateTransaction(Hash),

    /// Pool is full and the transaction does not outbid the cheapest entry.
    #[error("Pool full: capacity {capacity}")]
    PoolFull { capacity: usize },

    /// Transaction cannot be identified (unsigned or malformed signature).
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(#[from] TypesError),
}

impl MempoolError {
    /// Whether resubmitting later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MempoolError::PoolFull { .. })
    }
}

fn short(hash: &Hash) -> String {
    hash.iter().take(6).map(|b| format!("{b:02x}")).collect()
}
