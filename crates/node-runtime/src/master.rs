//! Local validator identity
//!
//! The master key signs every block this node seals. It is kept on disk as a
//! single line of hex and generated on first start.

use shared_crypto::{CryptoError, Secp256k1KeyPair};
use shared_types::Address;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors loading or persisting the master key
#[derive(Debug, Error)]
pub enum MasterError {
    #[error("Key file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key file {} is not a valid secret key: {source}", .path.display())]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: CryptoError,
    },
}

/// Signing identity plus reward address
pub struct Master {
    key: Secp256k1KeyPair,
    beneficiary: Option<Address>,
}

impl Master {
    pub fn new(key: Secp256k1KeyPair) -> Self {
        Self {
            key,
            beneficiary: None,
        }
    }

    /// Send block rewards somewhere other than the master address
    pub fn with_beneficiary(mut self, beneficiary: Address) -> Self {
        self.beneficiary = Some(beneficiary);
        self
    }

    /// Read the key at `path`, or generate and persist a fresh one.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self, MasterError> {
        let path = path.as_ref();
        let io_err = |source| MasterError::Io {
            path: path.to_path_buf(),
            source,
        };

        if path.exists() {
            let encoded = std::fs::read_to_string(path).map_err(io_err)?;
            let key = Secp256k1KeyPair::from_hex(&encoded).map_err(|source| {
                MasterError::InvalidKey {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            info!(address = %hex::encode(key.address()), "master key loaded");
            return Ok(Self::new(key));
        }

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let key = Secp256k1KeyPair::generate();
        std::fs::write(path, key.to_hex()).map_err(io_err)?;
        info!(
            address = %hex::encode(key.address()),
            path = %path.display(),
            "master key generated"
        );
        Ok(Self::new(key))
    }

    pub fn key(&self) -> &Secp256k1KeyPair {
        &self.key
    }

    pub fn address(&self) -> Address {
        self.key.address()
    }

    pub fn beneficiary(&self) -> Option<Address> {
        self.beneficiary
    }
}

impl fmt::Debug for Master {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Master")
            .field("address", &hex::encode(self.address()))
            .field("beneficiary", &self.beneficiary.map(hex::encode))
            .finish()
    }
}
