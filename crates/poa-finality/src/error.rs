//! Error types for the finality engine
//!
//! Missing quorum is never an error; it is the steady state until enough
//! votes arrive.

use poa_chain::{KVStoreError, StorageError};
use shared_crypto::CryptoError;
use shared_types::{Address, BlockId};
use thiserror::Error;

/// Finality engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalityError {
    /// Voter is not in the active validator set
    #[error("Unknown validator: {}", hex_short(.0))]
    UnknownValidator(Address),

    /// Vote signature could not be recovered
    #[error("Invalid vote signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    /// Recovered signer differs from the declared validator
    #[error("Vote signed by {}, declared {}", hex_short(.signer), hex_short(.validator))]
    SignerMismatch {
        /// Declared voter
        validator: Address,
        /// Recovered signer
        signer: Address,
    },

    /// Declared height does not match the block ID
    #[error("Vote height {height} does not match block {block_id}")]
    HeightMismatch {
        /// Voted block
        block_id: BlockId,
        /// Declared height
        height: u32,
    },

    /// Persisted finalized block is not in the chain repository
    #[error("Finalized block {0} not found")]
    FinalizedNotFound(BlockId),

    /// Prune base beyond the finalized height
    #[error("Prune base {base} above finalized height {finalized}")]
    InvalidPruneBase {
        /// Requested base
        base: u32,
        /// Current finalized height
        finalized: u32,
    },

    /// Persisted status could not be decoded
    #[error("Corrupt finality status: {0}")]
    Codec(String),

    /// Status store failure
    #[error("Status store error: {0}")]
    Store(#[from] KVStoreError),

    /// Chain lookup failure
    #[error("Chain error: {0}")]
    Chain(#[from] StorageError),
}

impl FinalityError {
    /// Whether the offending vote should simply be dropped
    pub fn is_vote_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownValidator(_)
                | Self::InvalidSignature(_)
                | Self::SignerMismatch { .. }
                | Self::HeightMismatch { .. }
        )
    }
}

fn hex_short(address: &Address) -> String {
    let mut out = String::with_capacity(12);
    for byte in &address[..6] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Result type for finality operations
pub type FinalityResult<T> = Result<T, FinalityError>;
