//! # Shared Crypto - Signing and Hashing Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | BLAKE3, Keccak-256 | Block/transaction IDs, merkle roots, addresses |
//! | `ecdsa` | secp256k1 (recoverable) | Block sealing, transaction origin, finality votes |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, 65-byte `r || s || v`
//!   signatures so the signer address is recoverable from the signed hash
//! - **Addresses**: last 20 bytes of Keccak-256 over the uncompressed public key
//! - **Key material**: zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{public_key_to_address, RecoverableSignature, Secp256k1KeyPair};
pub use errors::CryptoError;
pub use hashing::{blake3_hash, blake3_hash_many, keccak256, Blake3Hasher, Hash};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
