//! # Node Runtime Library
//!
//! Assembles a validator node from the subsystem crates and drives it. The
//! main entry point is the `main.rs` binary.
//!
//! ## Layout
//!
//! - `container/` - configuration and storage-level subsystems
//! - `adapters/` - the network port and its in-process implementation
//! - `master` - local signing identity
//! - `node` - packer loop and block ingress

#![warn(clippy::all)]

pub mod adapters;
pub mod container;
pub mod error;
pub mod master;
pub mod node;

pub use adapters::{Communicator, CommunicatorError, InProcessCommunicator};
pub use container::{devnet_genesis, ConfigError, NodeConfig, StorageConfig, Subsystems};
pub use error::NodeError;
pub use master::{Master, MasterError};
pub use node::{unix_now, ImportOutcome, LoopPhase, Node};
