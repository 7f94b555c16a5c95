//! # Block Entities
//!
//! ## Clusters
//!
//! - **Identity**: `BlockId` (number-prefixed digest)
//! - **Chain**: `Header`, `Block`, `BlockSummary`
//! - **Execution output**: `Receipt`

use crate::errors::{Result, TypesError};
use crate::transaction::Transaction;
use crate::{Address, Hash};
use serde::{Deserialize, Serialize};
use shared_crypto::{Blake3Hasher, RecoverableSignature, Secp256k1KeyPair};
use std::fmt;

// =============================================================================
// BLOCK IDENTITY
// =============================================================================

/// Block identifier: a BLAKE3 digest whose first four bytes are overwritten
/// with the big-endian block number.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockId(pub Hash);

impl BlockId {
    /// Parent ID recorded by the genesis header; its number wraps to zero.
    pub const GENESIS_PARENT: BlockId = BlockId([
        0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0,
    ]);

    /// Build an ID from a block number and a digest.
    pub fn from_parts(number: u32, digest: Hash) -> Self {
        let mut bytes = digest;
        bytes[..4].copy_from_slice(&number.to_be_bytes());
        Self(bytes)
    }

    /// Block number carried in the ID prefix.
    pub fn number(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Number plus an abbreviated digest is enough to tell forks apart in logs.
        write!(f, "#{}:{}", self.number(), hex::encode(&self.0[4..10]))
    }
}

// =============================================================================
// HEADER
// =============================================================================

/// Block header. The block number is implied by `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// ID of the parent block.
    pub parent_id: BlockId,
    /// Slot timestamp in unix seconds.
    pub timestamp: u64,
    /// Maximum gas the block may consume.
    pub gas_limit: u64,
    /// Account credited with the proposer reward.
    pub beneficiary: Address,
    /// Gas consumed by all transactions.
    pub gas_used: u64,
    /// Accumulated chain weight, used for fork choice.
    pub total_score: u64,
    /// Merkle root of transaction IDs.
    pub txs_root: Hash,
    /// State root after executing the block.
    pub state_root: Hash,
    /// Merkle root of receipt hashes.
    pub receipts_root: Hash,
    /// Whether the proposer's seal also counts as a finality vote for the parent.
    pub vote_finality: bool,
    /// 65-byte recoverable signature over `signing_hash()`; empty for genesis.
    pub signature: Vec<u8>,
}

impl Header {
    /// Block number (`parent number + 1`).
    pub fn number(&self) -> u32 {
        self.parent_id.number().wrapping_add(1)
    }

    /// Hash over every field except the signature.
    pub fn signing_hash(&self) -> Hash {
        let mut hasher = Blake3Hasher::new();
        hasher
            .update(self.parent_id.as_bytes())
            .update(&self.timestamp.to_be_bytes())
            .update(&self.gas_limit.to_be_bytes())
            .update(&self.beneficiary)
            .update(&self.gas_used.to_be_bytes())
            .update(&self.total_score.to_be_bytes())
            .update(&self.txs_root)
            .update(&self.state_root)
            .update(&self.receipts_root)
            .update(&[u8::from(self.vote_finality)]);
        hasher.finalize()
    }

    /// Recover the address that sealed this header.
    pub fn signer(&self) -> Result<Address> {
        if self.signature.is_empty() {
            return Err(TypesError::MissingSignature);
        }
        let signature = RecoverableSignature::from_slice(&self.signature)?;
        Ok(signature.recover_address(&self.signing_hash())?)
    }

    /// Seal the header with `key`.
    pub fn sign(&mut self, key: &Secp256k1KeyPair) -> Result<()> {
        let signature = key.sign_hash(&self.signing_hash())?;
        self.signature = signature.to_vec();
        Ok(())
    }

    /// Block ID. An unsealed header (genesis) hashes with the zero signer.
    pub fn id(&self) -> BlockId {
        let signer = self.signer().unwrap_or([0u8; 20]);
        let mut hasher = Blake3Hasher::new();
        hasher.update(&self.signing_hash()).update(&signer);
        BlockId::from_parts(self.number(), hasher.finalize())
    }
}

// =============================================================================
// BLOCK
// =============================================================================

/// A sealed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Sealed header.
    pub header: Header,
    /// Transactions in execution order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Block ID (see [`Header::id`]).
    pub fn id(&self) -> BlockId {
        self.header.id()
    }

    /// Block number.
    pub fn number(&self) -> u32 {
        self.header.number()
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        bincode::serialized_size(self).unwrap_or_default()
    }

    /// IDs of the contained transactions. Unsigned transactions are skipped.
    pub fn tx_ids(&self) -> Vec<Hash> {
        self.transactions
            .iter()
            .filter_map(|tx| tx.id().ok())
            .collect()
    }

    /// Build the immutable summary stored by the chain repository.
    pub fn summarize(&self, conflicts: u32) -> BlockSummary {
        BlockSummary {
            id: self.id(),
            header: self.header.clone(),
            tx_ids: self.tx_ids(),
            size: self.size(),
            conflicts,
        }
    }
}

/// Immutable snapshot of a committed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    /// Block ID.
    pub id: BlockId,
    /// Block header.
    pub header: Header,
    /// Transaction IDs in block order.
    pub tx_ids: Vec<Hash>,
    /// Encoded block size.
    pub size: u64,
    /// Number of known blocks at the same height when this one was added.
    pub conflicts: u32,
}

impl BlockSummary {
    /// Block number.
    pub fn number(&self) -> u32 {
        self.id.number()
    }

    /// Slot timestamp.
    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    /// Content hash: the transactions root committed in the header.
    pub fn content_hash(&self) -> Hash {
        self.header.txs_root
    }
}

// =============================================================================
// RECEIPT
// =============================================================================

/// Outcome of executing one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Gas consumed (intrinsic plus execution).
    pub gas_used: u64,
    /// Account that paid for the gas.
    pub gas_payer: Address,
    /// Total fee paid, in wei.
    pub paid: u128,
    /// Reward credited to the beneficiary, in wei.
    pub reward: u128,
    /// Whether the clauses were rolled back.
    pub reverted: bool,
}

impl Receipt {
    /// Leaf hash used for the receipts root.
    pub fn hash(&self) -> Hash {
        let mut hasher = Blake3Hasher::new();
        hasher
            .update(&self.gas_used.to_be_bytes())
            .update(&self.gas_payer)
            .update(&self.paid.to_be_bytes())
            .update(&self.reward.to_be_bytes())
            .update(&[u8::from(self.reverted)]);
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::EMPTY_ROOT;

    fn sample_header() -> Header {
        Header {
            parent_id: BlockId::from_parts(6, [7u8; 32]),
            timestamp: 1_700_000_000,
            gas_limit: 10_000_000,
            beneficiary: [1u8; 20],
            gas_used: 0,
            total_score: 7,
            txs_root: EMPTY_ROOT,
            state_root: [2u8; 32],
            receipts_root: EMPTY_ROOT,
            vote_finality: false,
            signature: Vec::new(),
        }
    }

    #[test]
    fn test_block_id_carries_number() {
        let id = BlockId::from_parts(0x0102_0304, [0xAA; 32]);
        assert_eq!(id.number(), 0x0102_0304);
        assert_eq!(id.0[4], 0xAA);
    }

    #[test]
    fn test_genesis_parent_wraps_to_zero() {
        let mut header = sample_header();
        header.parent_id = BlockId::GENESIS_PARENT;
        assert_eq!(header.number(), 0);
        assert_eq!(header.id().number(), 0);
    }

    #[test]
    fn test_number_follows_parent() {
        let header = sample_header();
        assert_eq!(header.number(), 7);
        assert_eq!(header.id().number(), 7);
    }

    #[test]
    fn test_sign_and_recover_signer() {
        let key = Secp256k1KeyPair::generate();
        let mut header = sample_header();
        assert_eq!(header.signer(), Err(TypesError::MissingSignature));

        header.sign(&key).unwrap();
        assert_eq!(header.signer().unwrap(), key.address());
    }

    #[test]
    fn test_id_depends_on_signer() {
        let mut a = sample_header();
        let mut b = sample_header();
        a.sign(&Secp256k1KeyPair::generate()).unwrap();
        b.sign(&Secp256k1KeyPair::generate()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_tampering_changes_signer() {
        let key = Secp256k1KeyPair::generate();
        let mut header = sample_header();
        header.sign(&key).unwrap();
        header.gas_used = 1;
        assert_ne!(header.signer().ok(), Some(key.address()));
    }

    #[test]
    fn test_summary_of_empty_block() {
        let block = Block {
            header: sample_header(),
            transactions: Vec::new(),
        };
        let summary = block.summarize(0);
        assert_eq!(summary.id, block.id());
        assert!(summary.tx_ids.is_empty());
        assert!(summary.size > 0);
        assert_eq!(summary.content_hash(), EMPTY_ROOT);
    }
}
