//! # Protocol Constants
//!
//! Fixed chain parameters shared by scheduling, execution and validation.

use std::time::Duration;

/// Seconds between consecutive block slots.
pub const BLOCK_INTERVAL_SECS: u64 = 10;

/// Time a proposer may spend packing a block before it must seal.
pub const TOLERABLE_BLOCK_PACKING_TIME: Duration = Duration::from_millis(500);

/// Lower bound for any block gas limit after genesis.
pub const MIN_GAS_LIMIT: u64 = 1_000_000;

/// Gas limit used by the devnet genesis.
pub const INITIAL_GAS_LIMIT: u64 = 10_000_000;

/// A block's gas limit may move by at most `parent / GAS_LIMIT_BOUND_DIVISOR`.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;

/// Base gas price in wei (1 gwei).
pub const BASE_GAS_PRICE: u128 = 1_000_000_000;

/// Flat per-transaction gas.
pub const TX_GAS: u64 = 5_000;

/// Per-clause gas for a clause with a recipient.
pub const CLAUSE_GAS: u64 = 16_000;

/// Per-clause gas for a contract-creation clause.
pub const CLAUSE_GAS_CONTRACT_CREATION: u64 = 48_000;

/// Gas per zero byte of clause data.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Gas per non-zero byte of clause data.
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;

/// Cheapest possible transaction (one empty value-transfer clause).
pub const MIN_TX_GAS: u64 = TX_GAS + CLAUSE_GAS;

/// Share of the paid gas fee credited to the block beneficiary, in percent.
pub const REWARD_PERCENT: u128 = 30;
