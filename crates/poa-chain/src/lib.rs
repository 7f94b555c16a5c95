//! # poa-chain
//!
//! Append-only chain repository and the key-value port used for small
//! persisted records.
//!
//! ## Guarantees
//!
//! - `add_block` is idempotent per block ID and requires a known parent.
//! - Appending a block and moving the best pointer happen under one write
//!   lock in [`ChainRepository::add_block_and_set_best`]: a reader never
//!   observes one without the other.
//! - Best-block changes are published on a `tokio::sync::watch` channel so
//!   in-flight work can detect that its parent went stale.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
