//! # Finality Metrics
//!
//! Prometheus metrics for monitoring finality progress.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! poa-finality = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `finality_votes_processed_total` - Counter of counted votes
//! - `finality_votes_rejected_total` - Counter of rejected votes (by reason)
//! - `finality_quorums_total` - Counter of quorum certificates formed
//! - `finality_equivocations_total` - Counter of double votes detected
//! - `finality_finalized_height` - Gauge of the finalized height
//! - `finality_pending_votes` - Gauge of votes buffered for unknown blocks

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, CounterVec, Gauge, IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total votes counted toward a tally
    pub static ref VOTES_PROCESSED: IntCounter = register_int_counter!(
        "finality_votes_processed_total",
        "Total number of votes counted"
    )
    .expect("Failed to create VOTES_PROCESSED metric");

    /// Total votes rejected, labeled by reason
    pub static ref VOTES_REJECTED: CounterVec = register_counter_vec!(
        "finality_votes_rejected_total",
        "Total number of votes rejected",
        &["reason"]
    )
    .expect("Failed to create VOTES_REJECTED metric");

    /// Total quorum certificates formed
    pub static ref QUORUMS_FORMED: IntCounter = register_int_counter!(
        "finality_quorums_total",
        "Total number of quorum certificates formed"
    )
    .expect("Failed to create QUORUMS_FORMED metric");

    /// Total equivocations detected
    pub static ref EQUIVOCATIONS: IntCounter = register_int_counter!(
        "finality_equivocations_total",
        "Total number of double votes detected"
    )
    .expect("Failed to create EQUIVOCATIONS metric");

    /// Current finalized height
    pub static ref FINALIZED_HEIGHT: Gauge = register_gauge!(
        "finality_finalized_height",
        "Height of the latest finalized block"
    )
    .expect("Failed to create FINALIZED_HEIGHT metric");

    /// Votes buffered for unknown blocks
    pub static ref PENDING_VOTES: Gauge = register_gauge!(
        "finality_pending_votes",
        "Number of votes buffered for unknown blocks"
    )
    .expect("Failed to create PENDING_VOTES metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a counted vote
#[cfg(feature = "metrics")]
pub fn record_vote_processed() {
    VOTES_PROCESSED.inc();
}

/// Record a rejected vote with reason
#[cfg(feature = "metrics")]
pub fn record_vote_rejected(reason: &str) {
    VOTES_REJECTED.with_label_values(&[reason]).inc();
}

/// Record a quorum certificate
#[cfg(feature = "metrics")]
pub fn record_quorum() {
    QUORUMS_FORMED.inc();
}

/// Record an equivocation
#[cfg(feature = "metrics")]
pub fn record_equivocation() {
    EQUIVOCATIONS.inc();
}

/// Update the finalized height gauge
#[cfg(feature = "metrics")]
pub fn set_finalized_height(height: u32) {
    FINALIZED_HEIGHT.set(f64::from(height));
}

/// Update the pending votes gauge
#[cfg(feature = "metrics")]
pub fn set_pending_votes(count: usize) {
    PENDING_VOTES.set(count as f64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_vote_processed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_vote_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_quorum() {}

#[cfg(not(feature = "metrics"))]
pub fn record_equivocation() {}

#[cfg(not(feature = "metrics"))]
pub fn set_finalized_height(_height: u32) {}

#[cfg(not(feature = "metrics"))]
pub fn set_pending_votes(_count: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_callable_without_registry() {
        record_vote_processed();
        record_vote_rejected("unknown_validator");
        record_quorum();
        record_equivocation();
        set_finalized_height(12);
        set_pending_votes(3);
    }
}
