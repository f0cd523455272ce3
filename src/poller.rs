//! Bounded retry-with-delay polling for slow instrument state.
//!
//! Several instrument values only become valid after the instrument
//! completes an internal, non-deterministic-duration operation: the UE
//! network addresses appear some time after cell enable, and the UE
//! measurement report populates some time after report enable. Until
//! then the instrument answers queries with the unavailable marker
//! (`NAV`) rather than an error.
//!
//! [`poll_pair`] is the single parameterized primitive for those
//! waits: call a producer once per attempt, test readiness, sleep the
//! configured delay between attempts, and give up after the attempt
//! budget with the last observed values. Both wait sites in the sweep
//! (attach, report) use it with different producer/predicate pairs.

use crate::error::AppResult;
use log::debug;
use std::time::Duration;

/// Unavailable-marker token the instrument returns while a value is
/// not yet populated.
pub const UNAVAILABLE_MARKER: &str = "NAV";

/// Defines a policy for retrying an operation.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// The maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// The delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Result of a [`poll_pair`] run: the last observed value pair and
/// whether the readiness predicate was ever satisfied.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub first: String,
    pub second: String,
    pub ready: bool,
    /// Producer calls made (≥ 1).
    pub attempts: u32,
}

/// True when neither response contains the unavailable marker. This is
/// the readiness predicate used throughout the sweep.
pub fn both_available(first: &str, second: &str) -> bool {
    !first.contains(UNAVAILABLE_MARKER) && !second.contains(UNAVAILABLE_MARKER)
}

/// Polls `produce` until `is_ready` accepts its output or the policy's
/// attempt budget is exhausted, sleeping `policy.delay` between
/// attempts. Transport errors from the producer propagate immediately;
/// an unready value is not an error.
pub fn poll_pair<P, R>(policy: &RetryPolicy, mut produce: P, is_ready: R) -> AppResult<PollOutcome>
where
    P: FnMut() -> AppResult<(String, String)>,
    R: Fn(&str, &str) -> bool,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let (first, second) = produce()?;
        if is_ready(&first, &second) {
            return Ok(PollOutcome {
                first,
                second,
                ready: true,
                attempts,
            });
        }
        if attempts >= policy.max_attempts {
            return Ok(PollOutcome {
                first,
                second,
                ready: false,
                attempts,
            });
        }
        debug!(
            "attempt {}/{}: value not yet available, retrying in {:?}",
            attempts, policy.max_attempts, policy.delay
        );
        std::thread::sleep(policy.delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SweepError;
    use std::cell::Cell;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_ready_after_k_misses_uses_k_plus_one_calls() {
        let calls = Cell::new(0u32);
        let outcome = poll_pair(
            &fast_policy(5),
            || {
                calls.set(calls.get() + 1);
                if calls.get() <= 3 {
                    Ok(("NAV".to_string(), "NAV".to_string()))
                } else {
                    Ok(("-85.5".to_string(), "-10.3".to_string()))
                }
            },
            both_available,
        )
        .unwrap();

        assert!(outcome.ready);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(calls.get(), 4);
        assert_eq!(outcome.first, "-85.5");
        assert_eq!(outcome.second, "-10.3");
    }

    #[test]
    fn test_immediately_ready_makes_one_call() {
        let calls = Cell::new(0u32);
        let outcome = poll_pair(
            &fast_policy(5),
            || {
                calls.set(calls.get() + 1);
                Ok(("10.1.2.3".to_string(), "fe80::1".to_string()))
            },
            both_available,
        )
        .unwrap();

        assert!(outcome.ready);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_never_ready_exhausts_exactly_max_attempts() {
        let calls = Cell::new(0u32);
        let outcome = poll_pair(
            &fast_policy(3),
            || {
                calls.set(calls.get() + 1);
                Ok(("NAV".to_string(), "-10.0".to_string()))
            },
            both_available,
        )
        .unwrap();

        assert!(!outcome.ready);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.get(), 3);
        // Last observed values are returned even on exhaustion.
        assert_eq!(outcome.first, "NAV");
        assert_eq!(outcome.second, "-10.0");
    }

    #[test]
    fn test_producer_error_propagates_immediately() {
        let calls = Cell::new(0u32);
        let result = poll_pair(
            &fast_policy(5),
            || {
                calls.set(calls.get() + 1);
                Err(SweepError::Communication("link down".to_string()))
            },
            both_available,
        );

        assert!(matches!(result, Err(SweepError::Communication(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_both_available_predicate() {
        assert!(both_available("-85.5", "-10.3"));
        assert!(!both_available("NAV", "-10.3"));
        assert!(!both_available("-85.5", "NAV"));
        assert!(!both_available("NAV", "NAV"));
    }
}
