//! Metrics collection for block packing

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the packer
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total blocks packed and committed
    pub blocks_packed: AtomicU64,

    /// Total transactions adopted into committed blocks
    pub txs_adopted: AtomicU64,

    /// Total adoption rejections
    pub txs_rejected: AtomicU64,

    /// Total gas packed across all committed blocks
    pub gas_packed: AtomicU64,

    /// Cycles abandoned because the parent went stale
    pub cycles_cancelled: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed block
    pub fn record_block_packed(&self, tx_count: usize, gas_used: u64) {
        self.blocks_packed.fetch_add(1, Ordering::Relaxed);
        self.txs_adopted
            .fetch_add(tx_count as u64, Ordering::Relaxed);
        self.gas_packed.fetch_add(gas_used, Ordering::Relaxed);
    }

    /// Record an adoption rejection
    pub fn record_rejection(&self) {
        self.txs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cancelled cycle
    pub fn record_cancelled(&self) {
        self.cycles_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get blocks packed
    pub fn get_blocks_packed(&self) -> u64 {
        self.blocks_packed.load(Ordering::Relaxed)
    }

    /// Get cancelled cycles
    pub fn get_cycles_cancelled(&self) -> u64 {
        self.cycles_cancelled.load(Ordering::Relaxed)
    }

    /// Get average gas per block
    pub fn get_avg_gas_per_block(&self) -> f64 {
        let blocks = self.blocks_packed.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        let gas = self.gas_packed.load(Ordering::Relaxed);
        gas as f64 / blocks as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = Metrics::new();

        metrics.record_block_packed(3, 63_000);
        metrics.record_block_packed(0, 0);
        metrics.record_rejection();
        metrics.record_cancelled();

        assert_eq!(metrics.get_blocks_packed(), 2);
        assert_eq!(metrics.get_avg_gas_per_block(), 31_500.0);
        assert_eq!(metrics.txs_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_cycles_cancelled(), 1);
    }
}
