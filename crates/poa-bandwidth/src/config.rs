//! Configuration for the bandwidth estimator.

use serde::Deserialize;
use shared_types::constants::TOLERABLE_BLOCK_PACKING_TIME;
use std::time::Duration;

/// Rule deciding which observed headers may feed the estimate.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignerPolicy {
    /// Reject a header signed by the same proposer as the last accepted one.
    #[default]
    SkipRepeatContributor,
    /// Reject headers signed by the local master.
    SkipOwnBlocks,
    /// Accept every header with a positive elapsed time.
    AcceptAll,
}

/// Runtime configuration for [`crate::Bandwidth`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BandwidthConfig {
    /// Packing time a block is allowed to cost, in milliseconds.
    pub tolerable_packing_time_ms: u64,

    /// Anti-feedback rule.
    pub signer_policy: SignerPolicy,
}

impl BandwidthConfig {
    pub fn tolerable_packing_time(&self) -> Duration {
        Duration::from_millis(self.tolerable_packing_time_ms)
    }
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            tolerable_packing_time_ms: TOLERABLE_BLOCK_PACKING_TIME.as_millis() as u64,
            signer_policy: SignerPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BandwidthConfig::default();
        assert_eq!(config.tolerable_packing_time(), Duration::from_millis(500));
        assert_eq!(config.signer_policy, SignerPolicy::SkipRepeatContributor);
    }
}
