//! # Domain Errors
//!
//! Error types for chain storage.

use shared_types::BlockId;
use thiserror::Error;

/// Errors raised by the chain repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Block with this ID was not found.
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    /// Parent block not found; the chain only grows from known blocks.
    #[error("Parent block not found: {parent} (child #{number})")]
    ParentNotFound { parent: BlockId, number: u32 },

    /// Number of the block does not follow its parent.
    #[error("Block number mismatch: parent #{parent}, block #{number}")]
    NumberMismatch { parent: u32, number: u32 },

    /// Underlying key-value store failed.
    #[error("Database error: {0}")]
    Database(#[from] KVStoreError),
}

impl StorageError {
    /// Whether retrying the same write may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Database(KVStoreError::IOError { .. }))
    }
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },

    /// Key not found.
    #[error("Key not found in KV store")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, StorageError>;
