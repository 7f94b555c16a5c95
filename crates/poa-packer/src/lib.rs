//! # poa-packer
//!
//! Block production for a proof-of-authority chain.
//!
//! ## Purpose
//!
//! - **Scheduling**: decide whether the local master owns a slot on top of
//!   a parent, and find its next slot
//! - **Assembly**: a [`Flow`] adopts transactions one by one against a
//!   speculative state overlay
//! - **Sealing**: `pack` signs the header and hands back the staged state
//! - **Verification**: [`BlockProcessor`] re-executes peer blocks
//!
//! ## Flow Lifecycle
//!
//! ```text
//! Packer::schedule ──→ Flow(Open) ──adopt()*──→ Flow(Open) ──pack()──→ Flow(Packed)
//!                                                                  │
//!                                             (Block, Stage, Vec<Receipt>)
//! ```
//!
//! ## Invariants
//!
//! - Adopted gas never exceeds the flow's gas limit
//! - A transaction ID is adopted at most once per flow and never if the
//!   parent chain already contains it
//! - A rejected adoption leaves the staged state root unchanged
//! - `pack` succeeds at most once per flow
//! - The sealed header's signer equals the scheduled proposer

#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod error;
pub mod flow;
pub mod metrics;
pub mod packer;
pub mod processor;

#[cfg(test)]
pub(crate) mod testing;

pub use config::PackerConfig;
pub use domain::{
    dev_accounts, execute, is_valid_gas_limit, next_gas_limit, GenesisBuilder, GenesisError,
};
pub use error::{AdoptionError, PackError, ProcessError, SchedulingError};
pub use flow::{Flow, FlowStatus};
pub use metrics::Metrics;
pub use packer::Packer;
pub use processor::{BlockProcessor, ProcessedBlock};
