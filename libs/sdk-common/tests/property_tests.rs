//! Property-based tests for sdk-common crate.
//!
//! These tests verify universal properties across all inputs using proptest.

use proptest::prelude::*;
use sdk_common::{DEFAULT_USER_AGENT, RetryPolicy, UserAgent, is_retriable_status};
use std::time::Duration;

// **Feature: sdk-common, Property 1: Retry Budget Bound**
// *For any* retry count, a budget SHALL allow exactly that many retries of a
// gateway error and none of any other status.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_budget_allows_exact_retry_count(
        retry_count in 0u32..20,
        delay_ms in 0u64..1000,
    ) {
        let delay = Duration::from_millis(delay_ms);
        let mut budget = RetryPolicy::default()
            .with_retry_count(retry_count)
            .with_retry_delay(delay)
            .budget();

        let mut granted = 0;
        while let Some(d) = budget.consume() {
            prop_assert_eq!(d, delay);
            granted += 1;
        }
        prop_assert_eq!(granted, retry_count);
        prop_assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn prop_only_gateway_errors_retry(status in 100u16..600, retry_count in 1u32..5) {
        let mut budget = RetryPolicy::default()
            .with_retry_count(retry_count)
            .with_retry_delay(Duration::ZERO)
            .budget();
        let retried = tokio_test::block_on(budget.wait_for_retry(status));

        prop_assert_eq!(retried, status == 502 || status == 504);
        prop_assert_eq!(retried, is_retriable_status(status));
        let expected_remaining = if retried { retry_count - 1 } else { retry_count };
        prop_assert_eq!(budget.remaining(), expected_remaining);
    }

    #[test]
    fn prop_overrides_replace_defaults(count in proptest::option::of(0u32..10), delay_ms in proptest::option::of(0u64..5000)) {
        let policy = RetryPolicy::from_overrides(count, delay_ms.map(Duration::from_millis));
        let defaults = RetryPolicy::default();
        prop_assert_eq!(policy.retry_count, count.unwrap_or(defaults.retry_count));
        prop_assert_eq!(
            policy.retry_delay,
            delay_ms.map_or(defaults.retry_delay, Duration::from_millis)
        );
    }
}

// **Feature: sdk-common, Property 2: User-Agent Ordering**
// *For any* sequence of prepends, the header SHALL list the latest prepend
// first and always end with the default agent.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_user_agent_prepends_in_front(
        batches in prop::collection::vec(prop::collection::vec("[a-z]{2,8}/[0-9]\\.[0-9]", 1..3), 0..4)
    ) {
        let mut agent = UserAgent::new();
        for batch in &batches {
            agent.prepend(batch.iter().cloned());
        }

        let expected: Vec<String> = batches
            .iter()
            .rev()
            .flat_map(|batch| batch.iter().cloned())
            .chain(std::iter::once(DEFAULT_USER_AGENT.to_string()))
            .collect();
        prop_assert_eq!(agent.join(), expected.join(" "));
        prop_assert!(agent.join().ends_with(DEFAULT_USER_AGENT));
    }
}
