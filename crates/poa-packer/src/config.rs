//! Configuration types for block production

use serde::Deserialize;
use shared_types::constants::{BLOCK_INTERVAL_SECS, TOLERABLE_BLOCK_PACKING_TIME};
use std::time::Duration;

/// Runtime configuration for scheduling and the packer loop
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    /// Seconds between block slots
    pub block_interval_secs: u64,

    /// Gas limit the chain should drift toward (0 = follow bandwidth)
    pub target_gas_limit: u64,

    /// Time budget for draining the mempool per cycle, in milliseconds
    pub packing_budget_ms: u64,

    /// Commit attempts before the loop halts
    pub max_commit_retries: u32,

    /// Linear backoff step between commit attempts, in milliseconds
    pub commit_backoff_ms: u64,

    /// Whether sealed headers also carry a finality vote
    pub vote_finality: bool,
}

impl PackerConfig {
    /// Per-cycle adoption budget
    pub fn packing_budget(&self) -> Duration {
        Duration::from_millis(self.packing_budget_ms)
    }

    /// Backoff before commit attempt `attempt` (1-based)
    pub fn commit_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.commit_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            block_interval_secs: BLOCK_INTERVAL_SECS,
            target_gas_limit: 0,
            packing_budget_ms: TOLERABLE_BLOCK_PACKING_TIME.as_millis() as u64,
            max_commit_retries: 3,
            commit_backoff_ms: 200,
            vote_finality: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PackerConfig::default();
        assert_eq!(config.block_interval_secs, 10);
        assert_eq!(config.packing_budget(), Duration::from_millis(500));
        assert!(config.vote_finality);
    }

    #[test]
    fn test_backoff_is_linear() {
        let config = PackerConfig::default();
        assert_eq!(config.commit_backoff(1), Duration::from_millis(200));
        assert_eq!(config.commit_backoff(3), Duration::from_millis(600));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PackerConfig =
            serde_json::from_str(r#"{"block_interval_secs": 2, "vote_finality": false}"#).unwrap();
        assert_eq!(config.block_interval_secs, 2);
        assert!(!config.vote_finality);
        assert_eq!(config.max_commit_retries, 3);
    }
}
