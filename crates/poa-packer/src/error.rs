//! Error types for scheduling, adoption, packing and peer-block processing

use poa_chain::StorageError;
use poa_state::StateError;
use shared_types::{BlockId, Hash, TypesError};
use thiserror::Error;

fn short(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(6)])
}

/// Why a flow could not be opened for a parent and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    /// Block interval configured as zero
    #[error("Block interval must be positive")]
    ZeroInterval,

    /// Timestamp is off the block-interval grid
    #[error("Timestamp {timestamp} not aligned to {interval}s interval")]
    NotAligned {
        /// Requested timestamp
        timestamp: u64,
        /// Block interval
        interval: u64,
    },

    /// Timestamp does not leave a full interval after the parent
    #[error("Timestamp {timestamp} earlier than {earliest}")]
    TooEarly {
        /// Requested timestamp
        timestamp: u64,
        /// Earliest permitted timestamp
        earliest: u64,
    },

    /// Local master is not in the validator set
    #[error("Master {} is not an authorised validator", short(.0))]
    NotAuthorized(shared_types::Address),

    /// Slot belongs to another proposer
    #[error("Not our turn at {timestamp}: slot belongs to {}", short(.proposer))]
    NotOurTurn {
        /// Requested timestamp
        timestamp: u64,
        /// Rightful proposer
        proposer: shared_types::Address,
    },

    /// Parent is no longer the best block
    #[error("Stale parent {parent}, best is {best}")]
    StaleParent {
        /// Parent handed to the scheduler
        parent: BlockId,
        /// Current best block
        best: BlockId,
    },

    /// Parent state could not be opened
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl SchedulingError {
    /// Whether the loop should simply try again at a later slot
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotOurTurn { .. } | Self::StaleParent { .. } | Self::TooEarly { .. }
        )
    }
}

/// Per-transaction rejection by [`crate::Flow::adopt`]. State is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdoptionError {
    /// Flow was already packed
    #[error("Flow already packed")]
    AlreadyPacked,

    /// Origin could not be recovered or the transaction is malformed
    #[error("Invalid transaction: {0}")]
    Invalid(#[from] TypesError),

    /// Transaction targets another chain
    #[error("Chain tag mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChainTagMismatch {
        /// Local chain tag
        expected: u8,
        /// Transaction chain tag
        actual: u8,
    },

    /// Reference block not reached yet
    #[error("Not adoptable now: block ref #{block_ref} ahead of #{number}")]
    NotAdoptableNow {
        /// Referenced block number
        block_ref: u32,
        /// Number of the block being packed
        number: u32,
    },

    /// Expiration window passed
    #[error("Transaction expired at #{number}")]
    Expired {
        /// Number of the block being packed
        number: u32,
    },

    /// Declared gas below intrinsic cost
    #[error("Intrinsic gas too low: declared {declared}, required {required}")]
    IntrinsicGasTooLow {
        /// Declared gas
        declared: u64,
        /// Intrinsic gas
        required: u64,
    },

    /// Not enough room left in the block
    #[error("Gas exceeds limit: required {required}, remaining {remaining}")]
    GasExceedsLimit {
        /// Gas declared by the transaction
        required: u64,
        /// Gas left in the block
        remaining: u64,
    },

    /// Already adopted or already on chain
    #[error("Duplicate transaction {}", short(.0))]
    Duplicate(Hash),

    /// Dependency not yet included
    #[error("Unresolved dependency {}", short(.0))]
    UnresolvedDependency(Hash),

    /// Dependency included but reverted
    #[error("Dependency {} reverted", short(.0))]
    DependencyReverted(Hash),

    /// Origin cannot prepay gas
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Gas prepayment
        required: u128,
        /// Origin balance
        available: u128,
    },

    /// Chain lookup failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// State write failed
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl AdoptionError {
    /// Whether the transaction may become adoptable in a later block
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotAdoptableNow { .. }
                | Self::GasExceedsLimit { .. }
                | Self::UnresolvedDependency(_)
                | Self::Storage(_)
        )
    }
}

/// Sealing failure. Fatal to the cycle; nothing was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    /// Flow was already packed
    #[error("Flow already packed")]
    AlreadyPacked,

    /// Key does not belong to the scheduled proposer
    #[error("Key mismatch: scheduled {}, signing {}", short(.expected), short(.actual))]
    KeyMismatch {
        /// Scheduled proposer
        expected: shared_types::Address,
        /// Address of the provided key
        actual: shared_types::Address,
    },

    /// Override below the gas already consumed
    #[error("Gas limit {limit} below gas used {used}")]
    GasLimitBelowUsage {
        /// Requested limit
        limit: u64,
        /// Gas consumed by adopted transactions
        used: u64,
    },

    /// Header signing failed
    #[error("Signing failed: {0}")]
    Signing(#[from] TypesError),
}

/// Peer block rejected by [`crate::BlockProcessor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// Block already stored
    #[error("Block {0} already known")]
    Known(BlockId),

    /// Parent unknown
    #[error("Parent {0} unknown")]
    ParentMissing(BlockId),

    /// Timestamp off grid or not after parent
    #[error("Invalid timestamp {timestamp} (parent {parent_timestamp})")]
    InvalidTimestamp {
        /// Block timestamp
        timestamp: u64,
        /// Parent timestamp
        parent_timestamp: u64,
    },

    /// Timestamp too far ahead of local clock
    #[error("Future block: timestamp {timestamp}, now {now}")]
    FutureBlock {
        /// Block timestamp
        timestamp: u64,
        /// Local clock
        now: u64,
    },

    /// Signer not recoverable
    #[error("Bad signature: {0}")]
    BadSignature(#[from] TypesError),

    /// Signer is not the slot owner
    #[error("Wrong proposer {}", short(.signer))]
    WrongProposer {
        /// Recovered signer
        signer: shared_types::Address,
    },

    /// Gas limit outside the allowed drift from the parent
    #[error("Invalid gas limit {limit} (parent {parent_limit})")]
    InvalidGasLimit {
        /// Block gas limit
        limit: u64,
        /// Parent gas limit
        parent_limit: u64,
    },

    /// Total score is not parent + 1
    #[error("Invalid total score {score}, expected {expected}")]
    InvalidScore {
        /// Block total score
        score: u64,
        /// Expected score
        expected: u64,
    },

    /// A committed root or gas total disagrees with re-execution
    #[error("{field} mismatch")]
    Mismatch {
        /// Which header field disagreed
        field: &'static str,
    },

    /// A contained transaction failed adoption
    #[error("Transaction {index} invalid: {source}")]
    InvalidTransaction {
        /// Index in block
        index: usize,
        /// Adoption failure
        source: AdoptionError,
    },

    /// Parent state unavailable
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Chain lookup failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduling_retryable() {
        assert!(SchedulingError::NotOurTurn {
            timestamp: 10,
            proposer: [1; 20]
        }
        .is_retryable());
        assert!(!SchedulingError::NotAuthorized([1; 20]).is_retryable());
        assert!(!SchedulingError::NotAligned {
            timestamp: 3,
            interval: 10
        }
        .is_retryable());
    }

    #[test]
    fn test_adoption_recoverability() {
        assert!(AdoptionError::GasExceedsLimit {
            required: 1,
            remaining: 0
        }
        .is_recoverable());
        assert!(AdoptionError::NotAdoptableNow {
            block_ref: 5,
            number: 1
        }
        .is_recoverable());
        assert!(!AdoptionError::Expired { number: 9 }.is_recoverable());
        assert!(!AdoptionError::Duplicate([0; 32]).is_recoverable());
    }
}
