//! Domain logic for block production
//!
//! Pure functions and small builders with no knowledge of the loop:
//!
//! - `gas_limit`: bounded drift of the block gas limit toward a target
//! - `execution`: non-VM transaction execution against a state overlay
//! - `genesis`: genesis block construction and deterministic dev accounts

pub mod execution;
pub mod gas_limit;
pub mod genesis;

pub use execution::execute;
pub use gas_limit::{is_valid_gas_limit, next_gas_limit};
pub use genesis::{dev_accounts, GenesisBuilder, GenesisError};
