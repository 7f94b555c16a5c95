//! # Error Types
//!
//! Errors raised while decoding or authenticating chain entities.

use shared_crypto::CryptoError;
use thiserror::Error;

/// Errors related to chain entity integrity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Entity carries no signature.
    #[error("Missing signature")]
    MissingSignature,

    /// Signature present but the signer could not be recovered.
    #[error("Invalid signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    /// Transaction has no clauses.
    #[error("Transaction has no clauses")]
    NoClauses,

    /// Declared gas is below the intrinsic cost.
    #[error("Intrinsic gas too low: declared {declared}, required {required}")]
    IntrinsicGasTooLow { declared: u64, required: u64 },
}

/// Result alias for entity operations.
pub type Result<T> = std::result::Result<T, TypesError>;
