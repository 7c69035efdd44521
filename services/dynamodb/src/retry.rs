use crate::constants::{DEFAULT_MAX_RETRIES, MAX_THROTTLE_RETRIES};
use ddbkit_core::{Error, ErrorKind};
use std::time::Duration;

const TRANSIENT_BASE_DELAY: Duration = Duration::from_millis(100);
const THROTTLE_BASE_DELAY: Duration = Duration::from_millis(25);

/// RetryPolicy decides whether and when a failed call is tried again.
///
/// - server faults (500/503) wait `4^attempt * 100ms`, at most `max_retries` times
/// - throttled calls retry once right away, then wait
///   `2^(attempt-1) * 25ms * (1 + jitter)`, at most `throttle_retries` times
/// - everything else is surfaced as is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    throttle_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` retries of server faults.
    ///
    /// Throttled calls share the same budget, capped at ten retries.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            throttle_retries: max_retries.min(MAX_THROTTLE_RETRIES),
        }
    }

    /// Retries allowed for server faults.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Retries allowed for throttled calls.
    pub fn throttle_retries(&self) -> u32 {
        self.throttle_retries
    }

    /// Delay before the next try, or `None` if `err` must be surfaced.
    ///
    /// `attempt` counts the tries already made minus one, so the first
    /// failure is seen with `attempt == 0`. `jitter` must be in `[0, 1)`.
    pub fn next_delay(&self, attempt: u32, err: &Error, jitter: f64) -> Option<Duration> {
        match err.kind() {
            ErrorKind::TransientService if attempt < self.max_retries => {
                Some(TRANSIENT_BASE_DELAY.saturating_mul(4u32.saturating_pow(attempt)))
            }
            ErrorKind::Throttling if attempt < self.throttle_retries => {
                if attempt == 0 {
                    return Some(Duration::ZERO);
                }
                let base = THROTTLE_BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt - 1));
                Some(base + base.mul_f64(jitter.clamp(0.0, 1.0)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0, Some(100); "first retry")]
    #[test_case(1, Some(400); "second retry")]
    #[test_case(2, Some(1600); "third retry")]
    #[test_case(3, None; "exhausted")]
    fn test_transient_delay(attempt: u32, expected: Option<u64>) {
        let policy = RetryPolicy::new(3);
        let err = Error::transient_service("service unavailable");

        assert_eq!(
            policy.next_delay(attempt, &err, 0.5),
            expected.map(Duration::from_millis)
        );
    }

    #[test_case(0, 0.0, Some(0); "immediate retry")]
    #[test_case(0, 0.9, Some(0); "immediate retry ignores jitter")]
    #[test_case(1, 0.0, Some(25); "first backoff without jitter")]
    #[test_case(1, 0.5, Some(37); "first backoff with jitter")]
    #[test_case(3, 0.0, Some(100); "fourth retry")]
    #[test_case(9, 0.0, Some(6400); "last retry")]
    #[test_case(10, 0.0, None; "exhausted")]
    fn test_throttle_delay(attempt: u32, jitter: f64, expected: Option<u64>) {
        let policy = RetryPolicy::new(10);
        let err = Error::throttling("ProvisionedThroughputExceededException");

        assert_eq!(
            policy
                .next_delay(attempt, &err, jitter)
                .map(|d| d.as_millis() as u64),
            expected
        );
    }

    #[test]
    fn test_throttle_delay_bounds() {
        let policy = RetryPolicy::default();
        let err = Error::throttling("slow down");

        for attempt in 1..policy.throttle_retries() {
            let low = Duration::from_millis(25 * 2u64.pow(attempt - 1));
            for jitter in [0.0, 0.25, 0.5, 0.999] {
                let delay = policy
                    .next_delay(attempt, &err, jitter)
                    .expect("must retry");
                assert!(delay >= low && delay < low * 2, "{delay:?} at {attempt}");
            }
        }
    }

    #[test]
    fn test_throttle_ceiling() {
        assert_eq!(RetryPolicy::new(0).throttle_retries(), 0);
        assert_eq!(RetryPolicy::new(3).throttle_retries(), 3);
        assert_eq!(RetryPolicy::new(10).throttle_retries(), 10);
        assert_eq!(
            RetryPolicy::new(20).throttle_retries(),
            MAX_THROTTLE_RETRIES
        );
        assert_eq!(RetryPolicy::default().throttle_retries(), 3);
    }

    #[test]
    fn test_not_retried() {
        let policy = RetryPolicy::default();
        for err in [
            Error::service("ValidationException"),
            Error::transport("connection reset"),
            Error::credential_denied("AUTH [InvalidClientTokenId]: denied"),
            Error::validation("empty string"),
        ] {
            assert_eq!(policy.next_delay(0, &err, 0.0), None, "{err}");
        }
    }

    #[test]
    fn test_zero_retries() {
        let policy = RetryPolicy::new(0);
        assert_eq!(
            policy.next_delay(0, &Error::transient_service("internal failure"), 0.0),
            None
        );
        assert_eq!(
            policy.next_delay(0, &Error::throttling("slow down"), 0.0),
            None
        );
    }

    #[test_case(3, 2, Some(50); "last retry within budget")]
    #[test_case(3, 3, None; "budget exhausted")]
    #[test_case(20, 9, Some(6400); "last retry under cap")]
    #[test_case(20, 10, None; "cap reached")]
    fn test_throttle_budget(max_retries: u32, attempt: u32, expected: Option<u64>) {
        let policy = RetryPolicy::new(max_retries);
        let err = Error::throttling("ThrottlingException");

        assert_eq!(
            policy
                .next_delay(attempt, &err, 0.0)
                .map(|d| d.as_millis() as u64),
            expected
        );
    }
}
