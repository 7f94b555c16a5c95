use shared_types::{Address, Hash};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Unknown state root: {}", hex_short(.0))]
    UnknownRoot(Hash),

    #[error("Insufficient balance for {}: required {required}, available {available}", hex_short(.address))]
    InsufficientBalance {
        address: Address,
        required: u128,
        available: u128,
    },

    #[error("Balance overflow for {}", hex_short(.0))]
    BalanceOverflow(Address),

    #[error("Invalid checkpoint {checkpoint}: journal holds {len} entries")]
    InvalidCheckpoint { checkpoint: usize, len: usize },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

fn hex_short(bytes: &[u8]) -> String {
    bytes.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

pub type Result<T> = std::result::Result<T, StateError>;
