//! Validator votes
//!
//! A vote is a validator's signed statement that a block should be final.
//! Votes arrive either explicitly (gossiped [`Vote`]s) or attached to a
//! header: a header sealed with the finality-vote flag counts as its
//! signer's vote for the header's parent.

use crate::error::{FinalityError, FinalityResult};
use serde::{Deserialize, Serialize};
use shared_crypto::{Blake3Hasher, RecoverableSignature, Secp256k1KeyPair};
use shared_types::{Address, BlockId, Hash, Header};

const VOTE_DOMAIN: &[u8] = b"poa-vote";

/// Signed finality vote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Declared voter
    pub validator: Address,
    /// Voted block
    pub block_id: BlockId,
    /// Height of the voted block
    pub height: u32,
    /// Voting round
    pub round: u32,
    /// Recoverable secp256k1 signature over [`Vote::signing_hash`]
    pub signature: Vec<u8>,
}

impl Vote {
    /// Message signed by voters
    pub fn signing_hash(block_id: &BlockId, height: u32, round: u32) -> Hash {
        let mut hasher = Blake3Hasher::new();
        hasher
            .update(VOTE_DOMAIN)
            .update(block_id.as_bytes())
            .update(&height.to_be_bytes())
            .update(&round.to_be_bytes());
        hasher.finalize()
    }

    /// Sign a vote for `block_id` in `round`
    pub fn sign(key: &Secp256k1KeyPair, block_id: BlockId, round: u32) -> FinalityResult<Self> {
        let height = block_id.number();
        let signature = key.sign_hash(&Self::signing_hash(&block_id, height, round))?;
        Ok(Self {
            validator: key.address(),
            block_id,
            height,
            round,
            signature: signature.to_vec(),
        })
    }

    /// Check the height and signature, yielding the ballot it casts
    pub fn verify(&self) -> FinalityResult<Ballot> {
        if self.height != self.block_id.number() {
            return Err(FinalityError::HeightMismatch {
                block_id: self.block_id,
                height: self.height,
            });
        }
        let hash = Self::signing_hash(&self.block_id, self.height, self.round);
        let signer = RecoverableSignature::from_slice(&self.signature)?.recover_address(&hash)?;
        if signer != self.validator {
            return Err(FinalityError::SignerMismatch {
                validator: self.validator,
                signer,
            });
        }
        Ok(Ballot {
            validator: signer,
            block_id: self.block_id,
            round: self.round,
        })
    }
}

/// A verified vote, whatever its origin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ballot {
    /// Voter
    pub validator: Address,
    /// Voted block
    pub block_id: BlockId,
    /// Voting round (0 for header-attached votes)
    pub round: u32,
}

impl Ballot {
    /// Height of the voted block
    pub fn height(&self) -> u32 {
        self.block_id.number()
    }

    /// Vote carried by a header sealed with the finality-vote flag.
    ///
    /// `None` when the flag is clear, the header is genesis, or the signer
    /// cannot be recovered.
    pub fn from_header(header: &Header) -> Option<Self> {
        if !header.vote_finality || header.parent_id == BlockId::GENESIS_PARENT {
            return None;
        }
        let validator = header.signer().ok()?;
        Some(Self {
            validator,
            block_id: header.parent_id,
            round: 0,
        })
    }
}
