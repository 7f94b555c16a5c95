//! # Container
//!
//! Configuration and the storage-level subsystems a node is assembled from.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, NodeConfig, StorageConfig};
pub use subsystems::{devnet_genesis, Subsystems, DEVNET_FUNDS};
