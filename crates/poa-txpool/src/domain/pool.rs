//! # Transaction Pool
//!
//! Priority pool with two indices:
//!
//! - `by_id`: O(1) lookup and removal
//! - `by_price`: ordered set driving `pending()`
//!
//! When full, a newcomer evicts the cheapest entry only if it pays strictly
//! more; otherwise it is refused.

use super::{MempoolError, PricedTransaction};
use crate::ports::Mempool;
use parking_lot::RwLock;
use serde::Deserialize;
use shared_types::constants::BASE_GAS_PRICE;
use shared_types::{Hash, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Pool configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of pending transactions.
    pub capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

struct Entry {
    tx: Transaction,
    priced: PricedTransaction,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<Hash, Entry>,
    by_price: BTreeSet<PricedTransaction>,
    next_seq: u64,
}

impl Inner {
    fn remove(&mut self, id: &Hash) -> bool {
        match self.by_id.remove(id) {
            Some(entry) => {
                self.by_price.remove(&entry.priced);
                true
            }
            None => false,
        }
    }
}

/// In-memory priority pool.
pub struct TxPool {
    config: PoolConfig,
    inner: RwLock<Inner>,
}

impl TxPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Creates a pool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PoolConfig::default())
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn contains(&self, id: &Hash) -> bool {
        self.inner.read().by_id.contains_key(id)
    }
}

impl Mempool for TxPool {
    fn pending(&self) -> Vec<Transaction> {
        let inner = self.inner.read();
        inner
            .by_price
            .iter()
            .filter_map(|priced| inner.by_id.get(&priced.id))
            .map(|entry| entry.tx.clone())
            .collect()
    }

    fn add(&self, tx: Transaction) -> Result<Hash, MempoolError> {
        let id = tx.id()?;
        let gas_price = tx.gas_price(BASE_GAS_PRICE);
        let mut inner = self.inner.write();

        if inner.by_id.contains_key(&id) {
            return Err(MempoolError::DuplicateTransaction(id));
        }

        if inner.by_id.len() >= self.config.capacity {
            let cheapest = inner
                .by_price
                .iter()
                .next_back()
                .cloned()
                .filter(|cheapest| cheapest.gas_price < gas_price)
                .ok_or(MempoolError::PoolFull {
                    capacity: self.config.capacity,
                })?;
            inner.remove(&cheapest.id);
            debug!(evicted = ?cheapest.id, "pool full, evicted cheapest transaction");
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let priced = PricedTransaction::new(gas_price, id, seq);
        inner.by_price.insert(priced.clone());
        inner.by_id.insert(id, Entry { tx, priced });
        Ok(id)
    }

    fn remove(&self, ids: &[Hash]) {
        let mut inner = self.inner.write();
        for id in ids {
            inner.remove(id);
        }
    }

    fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }
}
