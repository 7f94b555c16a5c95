//! Gas limit drift rule.

use shared_types::constants::{GAS_LIMIT_BOUND_DIVISOR, MIN_GAS_LIMIT};

/// Move from `parent_limit` toward `target` by at most `parent / 1024`,
/// never dropping below [`MIN_GAS_LIMIT`].
pub fn next_gas_limit(parent_limit: u64, target: u64) -> u64 {
    let bound = parent_limit / GAS_LIMIT_BOUND_DIVISOR;
    let next = if target > parent_limit {
        parent_limit.saturating_add(bound.min(target - parent_limit))
    } else {
        parent_limit - bound.min(parent_limit - target)
    };
    next.max(MIN_GAS_LIMIT)
}

/// Whether `limit` is an acceptable successor of `parent_limit`.
pub fn is_valid_gas_limit(parent_limit: u64, limit: u64) -> bool {
    if limit < MIN_GAS_LIMIT {
        return false;
    }
    limit.abs_diff(parent_limit) <= parent_limit / GAS_LIMIT_BOUND_DIVISOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_moves_by_bound() {
        assert_eq!(next_gas_limit(10_240_000, 20_000_000), 10_250_000);
        assert_eq!(next_gas_limit(10_240_000, 1), 10_230_000);
    }

    #[test]
    fn test_reaches_close_target_exactly() {
        assert_eq!(next_gas_limit(10_000_000, 10_000_100), 10_000_100);
        assert_eq!(next_gas_limit(10_000_000, 10_000_000), 10_000_000);
    }

    #[test]
    fn test_floor() {
        assert_eq!(next_gas_limit(MIN_GAS_LIMIT, 0), MIN_GAS_LIMIT);
        assert!(!is_valid_gas_limit(MIN_GAS_LIMIT, MIN_GAS_LIMIT - 1));
    }

    proptest! {
        #[test]
        fn prop_next_is_valid(parent in MIN_GAS_LIMIT..u64::MAX / 2, target in 0u64..u64::MAX / 2) {
            prop_assert!(is_valid_gas_limit(parent, next_gas_limit(parent, target)));
        }
    }
}
