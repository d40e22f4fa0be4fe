//! Property-based tests for the contribution calculator.
//!
//! These tests verify properties that must hold for any contribution list:
//! - Fee-only lists total exactly their `lp` sum
//! - A single APR stream totals the closed-form daily compounding figure
//! - Overrides take precedence over everything else
//! - Composition is deterministic and order-insensitive in its scalars

use approx::assert_relative_eq;
use harvest_core::prelude::*;
use proptest::prelude::*;

// =============================================================================
// GENERATORS
// =============================================================================

fn lp_list() -> impl Strategy<Value = Vec<RewardContribution>> {
    prop::collection::vec(0.0f64..500.0, 0..12)
        .prop_map(|values| values.into_iter().map(RewardContribution::lp).collect())
}

fn mixed_list() -> impl Strategy<Value = Vec<RewardContribution>> {
    prop::collection::vec((0.0f64..300.0, prop::bool::ANY), 0..12).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (value, compounding))| {
                if compounding {
                    RewardContribution::new(format!("src{i}"), compound_daily(value / 100.0))
                        .with_apr(value)
                } else {
                    RewardContribution::lp(value)
                }
            })
            .collect()
    })
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn lp_only_total_is_sum(list in lp_list()) {
        let expected: f64 = list.iter().map(RewardContribution::lp_value).sum();
        let c = compose(&list, None);
        prop_assert_eq!(c.total_apy, expected);
        prop_assert_eq!(c.apr, 0.0);
    }

    #[test]
    fn single_apr_matches_daily_compounding(a in 0.0f64..5.0) {
        let list = vec![RewardContribution::new("reward", compound_daily(a)).with_apr(a * 100.0)];
        let c = compose(&list, None);
        let expected = 100.0 * ((1.0 + a / 365.0).powi(365) - 1.0);
        assert_relative_eq!(c.total_apy, expected, max_relative = 1e-9, epsilon = 1e-9);
    }

    #[test]
    fn override_takes_precedence(list in mixed_list(), value in 0.0f64..1000.0) {
        let c = compose(&list, Some(value));
        prop_assert_eq!(c.total_apy, value);
        prop_assert!(c.overridden);
    }

    #[test]
    fn composition_is_deterministic(list in mixed_list()) {
        prop_assert_eq!(compose(&list, None), compose(&list, None));
    }

    #[test]
    fn scalars_ignore_order(list in mixed_list()) {
        let mut reversed = list.clone();
        reversed.reverse();
        let a = compose(&list, None);
        let b = compose(&reversed, None);
        assert_relative_eq!(a.apr, b.apr, epsilon = 1e-9);
        assert_relative_eq!(a.total_apy, b.total_apy, max_relative = 1e-9, epsilon = 1e-9);
    }

    #[test]
    fn breakdown_never_contains_apr(list in mixed_list()) {
        let c = compose(&list, None);
        prop_assert_eq!(c.apys.len(), list.len());
        prop_assert!(c.apys.iter().all(|b| b.get("apr").is_none()));
    }
}

#[test]
fn ten_percent_reference_value() {
    let list = vec![RewardContribution::new("reward", compound_daily(0.10)).with_apr(10.0)];
    let c = compose(&list, None);
    assert_relative_eq!(c.total_apy, 10.5156, epsilon = 1e-3);
}
