//! Vote tallies and quorum certificates
//!
//! A tally collects distinct voters for one (block, round). Once the count
//! meets `numerator/denominator` of the validator set it yields a
//! [`QuorumCertificate`].

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockId, ValidatorSet};
use std::collections::BTreeSet;

/// Proof that a quorum voted for a block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumCertificate {
    /// Certified block
    pub block_id: BlockId,
    /// Round the votes were cast in
    pub round: u32,
    /// Distinct voters, sorted
    pub voters: Vec<Address>,
}

impl QuorumCertificate {
    /// Height of the certified block
    pub fn height(&self) -> u32 {
        self.block_id.number()
    }

    /// Share of `validators` that signed, in percent
    pub fn participation_percent(&self, validators: &ValidatorSet) -> f64 {
        if validators.is_empty() {
            return 0.0;
        }
        self.voters.len() as f64 * 100.0 / validators.len() as f64
    }
}

/// Distinct voters for one block and round
#[derive(Clone, Debug)]
pub struct VoteTally {
    block_id: BlockId,
    round: u32,
    voters: BTreeSet<Address>,
}

impl VoteTally {
    pub fn new(block_id: BlockId, round: u32) -> Self {
        Self {
            block_id,
            round,
            voters: BTreeSet::new(),
        }
    }

    /// Count a voter; `false` when already counted
    pub fn add(&mut self, voter: Address) -> bool {
        self.voters.insert(voter)
    }

    pub fn count(&self) -> usize {
        self.voters.len()
    }

    /// Certificate if the tally meets the quorum fraction
    pub fn certificate(
        &self,
        validators: &ValidatorSet,
        numerator: u64,
        denominator: u64,
    ) -> Option<QuorumCertificate> {
        if !validators.is_quorum(self.count(), numerator, denominator) {
            return None;
        }
        Some(QuorumCertificate {
            block_id: self.block_id,
            round: self.round,
            voters: self.voters.iter().copied().collect(),
        })
    }
}
