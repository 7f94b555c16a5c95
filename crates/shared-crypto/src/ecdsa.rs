//! # ECDSA Signatures (secp256k1)
//!
//! Recoverable secp256k1 signatures over 32-byte prehashes.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization
//! - The signer is identified by recovering the public key from
//!   `(hash, r || s || v)`, so no public key travels with a signature
//!
//! ## Use Cases
//!
//! - Block sealing by the proposer
//! - Transaction origin recovery
//! - Finality votes

use crate::hashing::keccak256;
use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

/// Length of a recoverable signature (`r || s || v`).
pub const SIGNATURE_LENGTH: usize = 65;

/// Derive a 20-byte account address from a public key.
pub fn public_key_to_address(key: &VerifyingKey) -> [u8; 20] {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag byte.
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Recoverable ECDSA signature (65 bytes, `r || s || v`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature([u8; SIGNATURE_LENGTH]);

impl RecoverableSignature {
    /// Create from bytes, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(CryptoError::InvalidSignatureLength {
                expected: SIGNATURE_LENGTH,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; SIGNATURE_LENGTH];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Copy into an owned vector (the wire form carried by headers and transactions).
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Recover the public key that produced this signature over `hash`.
    pub fn recover(&self, hash: &[u8; 32]) -> Result<VerifyingKey, CryptoError> {
        let signature =
            Signature::from_slice(&self.0[..64]).map_err(|_| CryptoError::InvalidSignatureFormat)?;
        let recovery_id =
            RecoveryId::from_byte(self.0[64]).ok_or(CryptoError::InvalidRecoveryId(self.0[64]))?;
        VerifyingKey::recover_from_prehash(hash, &signature, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)
    }

    /// Recover the signer address for `hash`.
    pub fn recover_address(&self, hash: &[u8; 32]) -> Result<[u8; 20], CryptoError> {
        let key = self.recover(hash)?;
        Ok(public_key_to_address(&key))
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create from a hex-encoded secret key (with or without `0x`).
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let trimmed = encoded.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let mut bytes = hex::decode(trimmed).map_err(|_| CryptoError::InvalidPrivateKey)?;
        if bytes.len() != 32 {
            bytes.zeroize();
            return Err(CryptoError::InvalidPrivateKey);
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes);
        bytes.zeroize();
        let keypair = Self::from_bytes(secret);
        secret.zeroize();
        keypair
    }

    /// Address controlled by this key.
    pub fn address(&self) -> [u8; 20] {
        public_key_to_address(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte prehash (deterministic RFC 6979).
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..64].copy_from_slice(signature.to_bytes().as_slice());
        bytes[64] = recovery_id.to_byte();
        Ok(RecoverableSignature(bytes))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Hex-encoded secret key.
    pub fn to_hex(&self) -> String {
        let mut bytes = self.to_bytes();
        let encoded = hex::encode(bytes);
        bytes.zeroize();
        encoded
    }
}

impl Clone for Secp256k1KeyPair {
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
        }
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("address", &hex::encode(self.address()))
            .finish_non_exhaustive()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}
