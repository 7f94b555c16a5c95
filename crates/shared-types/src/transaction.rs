//! # Transactions
//!
//! Multi-clause transactions with block-reference expiry, optional
//! dependency on another transaction, and a recoverable origin signature.

use crate::constants::{
    CLAUSE_GAS, CLAUSE_GAS_CONTRACT_CREATION, TX_DATA_NON_ZERO_GAS, TX_DATA_ZERO_GAS, TX_GAS,
};
use crate::errors::{Result, TypesError};
use crate::{Address, Hash};
use serde::{Deserialize, Serialize};
use shared_crypto::{Blake3Hasher, RecoverableSignature, Secp256k1KeyPair};

/// One action inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Recipient; `None` creates a contract.
    pub to: Option<Address>,
    /// Value transferred, in wei.
    pub value: u128,
    /// Call data.
    pub data: Vec<u8>,
}

impl Clause {
    /// Plain value transfer.
    pub fn transfer(to: Address, value: u128) -> Self {
        Self {
            to: Some(to),
            value,
            data: Vec::new(),
        }
    }
}

/// A transaction as carried by blocks and the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Last byte of the genesis ID of the target chain.
    pub chain_tag: u8,
    /// Reference block; the upper 32 bits are a block number.
    pub block_ref: u64,
    /// Blocks after `block_ref` during which the transaction stays valid.
    pub expiration: u32,
    /// Clauses executed in order.
    pub clauses: Vec<Clause>,
    /// Gas price coefficient (0..=255) over the base gas price.
    pub gas_price_coef: u8,
    /// Gas the origin is willing to pay for.
    pub gas: u64,
    /// ID of a transaction that must be included (and not reverted) first.
    pub depends_on: Option<Hash>,
    /// Arbitrary value making otherwise identical transactions distinct.
    pub nonce: u64,
    /// 65-byte recoverable signature over `signing_hash()`.
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Block number encoded in `block_ref`.
    pub fn block_ref_number(&self) -> u32 {
        (self.block_ref >> 32) as u32
    }

    /// Hash over every field except the signature.
    pub fn signing_hash(&self) -> Hash {
        let mut hasher = Blake3Hasher::new();
        hasher
            .update(&[self.chain_tag])
            .update(&self.block_ref.to_be_bytes())
            .update(&self.expiration.to_be_bytes())
            .update(&(self.clauses.len() as u32).to_be_bytes());
        for clause in &self.clauses {
            match &clause.to {
                Some(to) => hasher.update(&[1]).update(to),
                None => hasher.update(&[0]),
            };
            hasher
                .update(&clause.value.to_be_bytes())
                .update(&(clause.data.len() as u32).to_be_bytes())
                .update(&clause.data);
        }
        hasher
            .update(&[self.gas_price_coef])
            .update(&self.gas.to_be_bytes());
        match &self.depends_on {
            Some(dep) => hasher.update(&[1]).update(dep),
            None => hasher.update(&[0]),
        };
        hasher.update(&self.nonce.to_be_bytes());
        hasher.finalize()
    }

    /// Sign with `key`, replacing any existing signature.
    pub fn sign(mut self, key: &Secp256k1KeyPair) -> Result<Self> {
        let signature = key.sign_hash(&self.signing_hash())?;
        self.signature = signature.to_vec();
        Ok(self)
    }

    /// Recover the origin (sender) address.
    pub fn origin(&self) -> Result<Address> {
        if self.signature.is_empty() {
            return Err(TypesError::MissingSignature);
        }
        let signature = RecoverableSignature::from_slice(&self.signature)?;
        Ok(signature.recover_address(&self.signing_hash())?)
    }

    /// Transaction ID: BLAKE3(signing hash ‖ origin).
    pub fn id(&self) -> Result<Hash> {
        let origin = self.origin()?;
        let mut hasher = Blake3Hasher::new();
        hasher.update(&self.signing_hash()).update(&origin);
        Ok(hasher.finalize())
    }

    /// Gas charged before any clause runs.
    pub fn intrinsic_gas(&self) -> Result<u64> {
        if self.clauses.is_empty() {
            return Err(TypesError::NoClauses);
        }
        let mut gas = TX_GAS;
        for clause in &self.clauses {
            gas += match clause.to {
                Some(_) => CLAUSE_GAS,
                None => CLAUSE_GAS_CONTRACT_CREATION,
            };
            for byte in &clause.data {
                gas += if *byte == 0 {
                    TX_DATA_ZERO_GAS
                } else {
                    TX_DATA_NON_ZERO_GAS
                };
            }
        }
        Ok(gas)
    }

    /// Whether the transaction has expired for a block at `block_number`.
    pub fn is_expired(&self, block_number: u32) -> bool {
        u64::from(block_number) > u64::from(self.block_ref_number()) + u64::from(self.expiration)
    }

    /// Whether the reference block is not yet reached at `block_number`.
    pub fn is_premature(&self, block_number: u32) -> bool {
        self.block_ref_number() > block_number
    }

    /// Effective gas price for a given base price.
    pub fn gas_price(&self, base_gas_price: u128) -> u128 {
        base_gas_price + base_gas_price * u128::from(self.gas_price_coef) / 255
    }

    /// Sum of the values moved by all clauses.
    pub fn total_value(&self) -> u128 {
        self.clauses
            .iter()
            .fold(0u128, |acc, clause| acc.saturating_add(clause.value))
    }
}

/// Compose a `block_ref` from a block number.
pub fn block_ref_from_number(number: u32) -> u64 {
    u64::from(number) << 32
}

/// Fluent construction for transactions.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    tx: Transaction,
}

impl TransactionBuilder {
    /// Start an unsigned transaction for `chain_tag`.
    pub fn new(chain_tag: u8) -> Self {
        Self {
            tx: Transaction {
                chain_tag,
                block_ref: 0,
                expiration: 720,
                clauses: Vec::new(),
                gas_price_coef: 0,
                gas: 0,
                depends_on: None,
                nonce: 0,
                signature: Vec::new(),
            },
        }
    }

    /// Reference block number.
    pub fn block_ref(mut self, number: u32) -> Self {
        self.tx.block_ref = block_ref_from_number(number);
        self
    }

    /// Expiration in blocks.
    pub fn expiration(mut self, blocks: u32) -> Self {
        self.tx.expiration = blocks;
        self
    }

    /// Append a clause.
    pub fn clause(mut self, clause: Clause) -> Self {
        self.tx.clauses.push(clause);
        self
    }

    /// Gas price coefficient.
    pub fn gas_price_coef(mut self, coef: u8) -> Self {
        self.tx.gas_price_coef = coef;
        self
    }

    /// Gas allowance.
    pub fn gas(mut self, gas: u64) -> Self {
        self.tx.gas = gas;
        self
    }

    /// Dependency on another transaction.
    pub fn depends_on(mut self, id: Hash) -> Self {
        self.tx.depends_on = Some(id);
        self
    }

    /// Nonce.
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.tx.nonce = nonce;
        self
    }

    /// Unsigned transaction.
    pub fn build(self) -> Transaction {
        self.tx
    }

    /// Signed transaction.
    pub fn sign(self, key: &Secp256k1KeyPair) -> Result<Transaction> {
        self.tx.sign(key)
    }
}
