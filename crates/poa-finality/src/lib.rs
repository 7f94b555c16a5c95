//! # poa-finality
//!
//! BFT finality for a proof-of-authority chain.
//!
//! ## Overview
//!
//! - **Votes**: explicit signed [`Vote`]s, or a header sealed with the
//!   finality-vote flag counting as its signer's vote for the parent
//! - **Quorum**: distinct validators with `count * den >= n * num`
//!   (2/3 by default) form a [`QuorumCertificate`]
//! - **Finality**: a certificate finalizes its block when that block
//!   descends from the current finalized block
//! - **Persistence**: the [`FinalityStatus`] is saved after every advance
//!   and restored on restart
//!
//! ```text
//! PackerLoop / ingress ──BlockSummary──→ FinalityEngine ──finalized()──→ readers
//!        gossip ─────────────Vote──────────────┘
//! ```
//!
//! Too few votes is not an error; finality simply stays where it is.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod metrics;

pub use config::FinalityConfig;
pub use domain::{Ballot, FinalityStatus, QuorumCertificate, Vote, VoteTally};
pub use engine::{Equivocation, FinalityEngine, VoteOutcome};
pub use error::{FinalityError, FinalityResult};
