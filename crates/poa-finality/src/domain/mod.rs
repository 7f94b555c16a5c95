//! Domain module for finality
//!
//! - vote: signed votes and the ballots they cast
//! - quorum: per-block tallies and quorum certificates
//! - status: the persisted finalized checkpoint

pub mod quorum;
pub mod status;
pub mod vote;

pub use quorum::{QuorumCertificate, VoteTally};
pub use status::FinalityStatus;
pub use vote::{Ballot, Vote};
