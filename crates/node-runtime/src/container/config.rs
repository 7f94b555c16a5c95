//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A JSON file ([`NodeConfig::from_json_file`]); missing fields keep defaults
//! 3. Environment overrides ([`NodeConfig::apply_env`])
//!
//! | Variable | Field |
//! |----------|-------|
//! | `POA_BLOCK_INTERVAL` | `packer.block_interval_secs` |
//! | `POA_TARGET_GAS_LIMIT` | `packer.target_gas_limit` |
//! | `POA_PACKING_BUDGET_MS` | `packer.packing_budget_ms` |
//! | `POA_VOTE_FINALITY` | `packer.vote_finality` |
//! | `POA_DATA_DIR` | `storage.data_dir` |

use poa_bandwidth::BandwidthConfig;
use poa_finality::FinalityConfig;
use poa_packer::PackerConfig;
use poa_txpool::PoolConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Scheduling and packer loop.
    pub packer: PackerConfig,
    /// Bandwidth estimator.
    pub bandwidth: BandwidthConfig,
    /// Finality quorum rule.
    pub finality: FinalityConfig,
    /// Transaction pool.
    pub mempool: PoolConfig,
    /// On-disk locations.
    pub storage: StorageConfig,
}

impl NodeConfig {
    /// Read a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `POA_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are logged
    /// and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_var(&lookup, "POA_BLOCK_INTERVAL") {
            self.packer.block_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "POA_TARGET_GAS_LIMIT") {
            self.packer.target_gas_limit = v;
        }
        if let Some(v) = parse_var(&lookup, "POA_PACKING_BUDGET_MS") {
            self.packer.packing_budget_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "POA_VOTE_FINALITY") {
            self.packer.vote_finality = v;
        }
        if let Some(dir) = lookup("POA_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.packer.block_interval_secs == 0 {
            return Err(ConfigError::ZeroBlockInterval);
        }
        if self.packer.packing_budget_ms == 0 {
            return Err(ConfigError::ZeroPackingBudget);
        }
        if self.packer.max_commit_retries == 0 {
            return Err(ConfigError::ZeroCommitRetries);
        }
        if self.finality.quorum_denominator == 0
            || self.finality.quorum_numerator > self.finality.quorum_denominator
        {
            return Err(ConfigError::InvalidQuorum {
                numerator: self.finality.quorum_numerator,
                denominator: self.finality.quorum_denominator,
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Cannot read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// File is not valid configuration JSON.
    #[error("Invalid configuration: {0}")]
    Parse(String),

    /// Block interval is zero.
    #[error("Block interval must be positive")]
    ZeroBlockInterval,

    /// Packing budget is zero.
    #[error("Packing budget must be positive")]
    ZeroPackingBudget,

    /// No commit attempt would ever run.
    #[error("At least one commit attempt is required")]
    ZeroCommitRetries,

    /// Quorum fraction is not in (0, 1].
    #[error("Invalid quorum fraction {numerator}/{denominator}")]
    InvalidQuorum { numerator: u64, denominator: u64 },
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Where the master key is kept.
    pub fn master_key_path(&self) -> PathBuf {
        self.data_dir.join("master.key")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}
