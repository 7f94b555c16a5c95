//! Mempool port consumed by the packer loop.

use crate::domain::MempoolError;
use shared_types::{Hash, Transaction};

/// Source of pending transactions.
pub trait Mempool: Send + Sync {
    /// Snapshot of pending transactions in priority order.
    fn pending(&self) -> Vec<Transaction>;

    /// Insert a transaction, returning its ID.
    fn add(&self, tx: Transaction) -> Result<Hash, MempoolError>;

    /// Drop transactions by ID (included or permanently invalid).
    fn remove(&self, ids: &[Hash]);

    /// Number of pending transactions.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
