//! Node-level error taxonomy

use crate::adapters::ports::CommunicatorError;
use crate::container::config::ConfigError;
use crate::master::MasterError;
use poa_chain::StorageError;
use poa_finality::FinalityError;
use poa_packer::{GenesisError, PackError, ProcessError, SchedulingError};
use poa_state::StateError;
use thiserror::Error;

/// Errors surfaced by [`crate::Node`]
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Master key error: {0}")]
    Master(#[from] MasterError),

    #[error("Genesis error: {0}")]
    Genesis(#[from] GenesisError),

    #[error("Scheduling failed: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Packing failed: {0}")]
    Pack(#[from] PackError),

    #[error("Peer block rejected: {0}")]
    Rejected(#[from] ProcessError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Finality error: {0}")]
    Finality(#[from] FinalityError),

    #[error("Network error: {0}")]
    Network(#[from] CommunicatorError),

    /// Commit kept failing; packing stops rather than diverge from the chain
    #[error("Commit failed after {attempts} attempts, packing halted: {reason}")]
    StorageHalt { attempts: u32, reason: String },
}

impl NodeError {
    /// Whether the packer loop must stop
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::StorageHalt { .. }
            | Self::Config(_)
            | Self::Master(_)
            | Self::Genesis(_)
            | Self::Finality(_) => true,
            Self::Scheduling(err) => !err.is_retryable(),
            Self::Pack(_)
            | Self::Rejected(_)
            | Self::State(_)
            | Self::Storage(_)
            | Self::Network(_) => false,
        }
    }
}
