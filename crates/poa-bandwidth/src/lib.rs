//! # poa-bandwidth
//!
//! Tracks how much gas the network can push through per second and turns
//! that into a suggested block gas limit.
//!
//! ```text
//! observed header + elapsed ──update──→ [Bandwidth] ──suggest_gas_limit──→ Scheduler
//! ```
//!
//! The estimator is a shared service: one writer (the packer loop or the
//! ingress path, serialized by the node) and any number of readers.

mod bandwidth;
mod config;

pub use bandwidth::Bandwidth;
pub use config::{BandwidthConfig, SignerPolicy};
