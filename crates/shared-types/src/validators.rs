//! # Validator Set
//!
//! The authority list and the rotation rule deciding who may propose at a
//! given slot. Rotation is a pure function of (set, timestamp, interval) and
//! is recomputed per call.

use crate::Address;
use serde::{Deserialize, Serialize};

/// Ordered list of authorised block proposers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatorSet {
    members: Vec<Address>,
}

impl ValidatorSet {
    /// Build from an ordered member list. Duplicates are dropped, keeping the
    /// first occurrence.
    pub fn new(members: Vec<Address>) -> Self {
        let mut unique: Vec<Address> = Vec::with_capacity(members.len());
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        Self { members: unique }
    }

    /// Members in rotation order.
    pub fn members(&self) -> &[Address] {
        &self.members
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `address` is an authorised validator.
    pub fn contains(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    /// Proposer owning the slot at `timestamp`.
    pub fn proposer_at(&self, timestamp: u64, interval: u64) -> Option<Address> {
        if self.members.is_empty() || interval == 0 {
            return None;
        }
        let slot = timestamp / interval;
        let index = (slot % self.members.len() as u64) as usize;
        Some(self.members[index])
    }

    /// Whether `count` distinct votes meet `numerator/denominator` of the set.
    pub fn is_quorum(&self, count: usize, numerator: u64, denominator: u64) -> bool {
        if self.members.is_empty() {
            return false;
        }
        (count as u64) * denominator >= (self.members.len() as u64) * numerator
    }
}
