//! Exponentially weighted throughput estimate.
//!
//! Each accepted observation computes the instantaneous throughput
//! `gas_used / elapsed` and blends it as `(3 * value + sample) / 4`, so a
//! single outlier moves the estimate by at most a quarter of the gap. The
//! first accepted sample seeds the value directly.

use crate::config::{BandwidthConfig, SignerPolicy};
use parking_lot::RwLock;
use shared_types::{Address, Header};
use std::time::Duration;
use tracing::{debug, trace};

const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Debug, Default)]
struct Inner {
    value: u64,
    seeded: bool,
    last_contributor: Option<Address>,
}

/// Shared bandwidth estimator (gas per second).
#[derive(Debug)]
pub struct Bandwidth {
    config: BandwidthConfig,
    local_signer: Option<Address>,
    inner: RwLock<Inner>,
}

impl Bandwidth {
    pub fn new(config: BandwidthConfig) -> Self {
        Self {
            config,
            local_signer: None,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Address treated as "own" by [`SignerPolicy::SkipOwnBlocks`].
    pub fn with_local_signer(mut self, signer: Address) -> Self {
        self.local_signer = Some(signer);
        self
    }

    pub fn config(&self) -> &BandwidthConfig {
        &self.config
    }

    /// Current estimate in gas per second.
    pub fn value(&self) -> u64 {
        self.inner.read().value
    }

    /// Feed an observed block that took `elapsed` to pack or process.
    ///
    /// Returns the (possibly unchanged) value and whether the observation
    /// was accepted.
    pub fn update(&self, header: &Header, elapsed: Duration) -> (u64, bool) {
        let mut inner = self.inner.write();
        if elapsed.is_zero() {
            trace!("bandwidth sample rejected: zero elapsed");
            return (inner.value, false);
        }

        // An unrecoverable signer never matches a contributor.
        let signer = header.signer().ok();
        if self.rejects(signer, &inner) {
            trace!("bandwidth sample rejected by signer policy");
            return (inner.value, false);
        }

        let sample = throughput(header.gas_used, elapsed);
        inner.value = if inner.seeded {
            ((3 * u128::from(inner.value) + u128::from(sample)) / 4) as u64
        } else {
            sample
        };
        inner.seeded = true;
        inner.last_contributor = signer;

        debug!(
            gas_used = header.gas_used,
            elapsed_ms = elapsed.as_millis() as u64,
            sample,
            value = inner.value,
            "bandwidth updated"
        );
        (inner.value, true)
    }

    /// Gas a block may carry so packing stays within the tolerable time.
    pub fn suggest_gas_limit(&self) -> u64 {
        let tolerable = self.config.tolerable_packing_time().as_nanos();
        let limit = u128::from(self.value()) * tolerable / NANOS_PER_SEC;
        u64::try_from(limit).unwrap_or(u64::MAX)
    }

    fn rejects(&self, signer: Option<Address>, inner: &Inner) -> bool {
        let Some(signer) = signer else {
            return false;
        };
        match self.config.signer_policy {
            SignerPolicy::SkipRepeatContributor => inner.last_contributor == Some(signer),
            SignerPolicy::SkipOwnBlocks => self.local_signer == Some(signer),
            SignerPolicy::AcceptAll => false,
        }
    }
}

fn throughput(gas_used: u64, elapsed: Duration) -> u64 {
    let per_sec = u128::from(gas_used) * NANOS_PER_SEC / elapsed.as_nanos();
    u64::try_from(per_sec).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{BlockId, EMPTY_ROOT};

    fn header(gas_used: u64, key: Option<&Secp256k1KeyPair>) -> Header {
        let mut header = Header {
            parent_id: BlockId::from_parts(1, [0; 32]),
            timestamp: 20,
            gas_limit: 10_000_000,
            beneficiary: [0; 20],
            gas_used,
            total_score: 2,
            txs_root: EMPTY_ROOT,
            state_root: EMPTY_ROOT,
            receipts_root: EMPTY_ROOT,
            vote_finality: false,
            signature: Vec::new(),
        };
        if let Some(key) = key {
            header.sign(key).unwrap();
        }
        header
    }

    fn accept_all() -> Bandwidth {
        Bandwidth::new(BandwidthConfig {
            signer_policy: SignerPolicy::AcceptAll,
            ..Default::default()
        })
    }

    #[test]
    fn test_first_sample_seeds() {
        let bandwidth = accept_all();
        let (value, updated) = bandwidth.update(&header(1_000_000, None), Duration::from_secs(1));
        assert!(updated);
        assert_eq!(value, 1_000_000);
        assert_eq!(bandwidth.suggest_gas_limit(), 500_000);
    }

    #[test]
    fn test_blend_biased_to_history() {
        let bandwidth = accept_all();
        bandwidth.update(&header(1_000_000, None), Duration::from_secs(1));
        let (value, _) = bandwidth.update(&header(5_000_000, None), Duration::from_secs(1));
        assert_eq!(value, 2_000_000);
    }

    #[test]
    fn test_zero_elapsed_rejected() {
        let bandwidth = accept_all();
        let (value, updated) = bandwidth.update(&header(1_000, None), Duration::ZERO);
        assert!(!updated);
        assert_eq!(value, 0);
    }

    #[test]
    fn test_repeat_contributor_rejected() {
        let bandwidth = Bandwidth::new(BandwidthConfig::default());
        let alice = Secp256k1KeyPair::generate();
        let bob = Secp256k1KeyPair::generate();

        assert!(bandwidth.update(&header(1_000, Some(&alice)), Duration::from_millis(10)).1);
        assert!(!bandwidth.update(&header(9_000, Some(&alice)), Duration::from_millis(10)).1);
        assert!(bandwidth.update(&header(1_000, Some(&bob)), Duration::from_millis(10)).1);
        assert!(bandwidth.update(&header(1_000, Some(&alice)), Duration::from_millis(10)).1);
    }

    #[test]
    fn test_own_blocks_rejected() {
        let me = Secp256k1KeyPair::generate();
        let peer = Secp256k1KeyPair::generate();
        let bandwidth = Bandwidth::new(BandwidthConfig {
            signer_policy: SignerPolicy::SkipOwnBlocks,
            ..Default::default()
        })
        .with_local_signer(me.address());

        assert!(!bandwidth.update(&header(1_000, Some(&me)), Duration::from_millis(10)).1);
        assert!(bandwidth.update(&header(1_000, Some(&peer)), Duration::from_millis(10)).1);
        assert!(bandwidth.update(&header(1_000, Some(&peer)), Duration::from_millis(10)).1);
    }

    #[test]
    fn test_unsigned_header_accepted_under_repeat_rule() {
        let bandwidth = Bandwidth::new(BandwidthConfig::default());
        assert!(bandwidth.update(&header(1_000, None), Duration::from_millis(1)).1);
        assert!(bandwidth.update(&header(1_000, None), Duration::from_millis(1)).1);
    }

    proptest! {
        #[test]
        fn prop_update_moves_toward_sample(
            seed in 0u64..10_000_000_000,
            gas in 0u64..100_000_000,
            elapsed_ms in 1u64..60_000,
        ) {
            let bandwidth = accept_all();
            bandwidth.update(&header(seed, None), Duration::from_secs(1));
            let before = bandwidth.value();

            let elapsed = Duration::from_millis(elapsed_ms);
            let sample = throughput(gas, elapsed);
            let (after, updated) = bandwidth.update(&header(gas, None), elapsed);

            prop_assert!(updated);
            prop_assert!(after.abs_diff(sample) <= before.abs_diff(sample));
            prop_assert!(after >= before.min(sample) && after <= before.max(sample));
        }

        #[test]
        fn prop_suggestion_monotonic_in_value(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
            let low = accept_all();
            let high = accept_all();
            low.update(&header(a.min(b), None), Duration::from_secs(1));
            high.update(&header(a.max(b), None), Duration::from_secs(1));

            prop_assert!(low.value() <= high.value());
            prop_assert!(low.suggest_gas_limit() <= high.suggest_gas_limit());
        }
    }
}
