//! Value objects for the transaction pool.

use shared_types::Hash;
use std::cmp::Ordering;

/// A transaction reference with price for ordering in the priority queue.
///
/// Implements `Ord` such that higher gas price = higher priority.
/// Ties are broken by arrival sequence (FIFO) then ID (deterministic).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PricedTransaction {
    /// Effective gas price (higher = higher priority).
    pub gas_price: u128,
    /// Transaction ID.
    pub id: Hash,
    /// Arrival sequence number (lower = earlier).
    pub seq: u64,
}

impl PricedTransaction {
    pub fn new(gas_price: u128, id: Hash, seq: u64) -> Self {
        Self { gas_price, id, seq }
    }
}

impl Ord for PricedTransaction {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .gas_price
            .cmp(&self.gas_price)
            .then_with(|| self.seq.cmp(&other.seq))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for PricedTransaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_price_then_arrival() {
        let mut set = BTreeSet::new();
        set.insert(PricedTransaction::new(10, [1; 32], 2));
        set.insert(PricedTransaction::new(20, [2; 32], 3));
        set.insert(PricedTransaction::new(10, [3; 32], 1));

        let order: Vec<Hash> = set.iter().map(|p| p.id).collect();
        assert_eq!(order, vec![[2; 32], [3; 32], [1; 32]]);
    }
}
