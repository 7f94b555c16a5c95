//! Finality configuration

use serde::Deserialize;

/// Quorum rule and buffering limits
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FinalityConfig {
    /// Quorum fraction numerator
    pub quorum_numerator: u64,
    /// Quorum fraction denominator
    pub quorum_denominator: u64,
    /// Votes for unknown blocks kept until the block arrives
    pub max_pending_votes: usize,
}

impl Default for FinalityConfig {
    fn default() -> Self {
        Self {
            quorum_numerator: 2,
            quorum_denominator: 3,
            max_pending_votes: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: FinalityConfig =
            serde_json::from_str(r#"{ "max_pending_votes": 8 }"#).unwrap();
        assert_eq!(config.max_pending_votes, 8);
        assert_eq!(config.quorum_numerator, 2);
        assert_eq!(config.quorum_denominator, 3);
    }
}
