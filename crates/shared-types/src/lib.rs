//! # Shared Types Crate
//!
//! Chain entities shared by the packer, the finality engine, the chain
//! repository and the node runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type is defined here.
//! - **Derived identity**: block and transaction IDs are computed from their
//!   signing hash and recovered signer, never stored alongside the payload.
//! - **Recoverable numbers**: the first four bytes of a `BlockId` carry the
//!   big-endian block number.

pub mod constants;
pub mod entities;
pub mod errors;
pub mod merkle;
pub mod transaction;
pub mod validators;

pub use entities::*;
pub use errors::*;
pub use merkle::{merkle_root, EMPTY_ROOT};
pub use transaction::*;
pub use validators::ValidatorSet;

/// A 32-byte hash (BLAKE3 unless noted otherwise).
pub type Hash = [u8; 32];

/// A 20-byte account address.
pub type Address = [u8; 20];
