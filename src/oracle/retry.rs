//! Bounded retry with a fixed delay schedule.

use std::future::Future;
use std::time::Duration;

/// How many attempts to make and how long to wait before each one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// `delays[i]` is waited before attempt `i` (0-based). Attempts past the
    /// end of the schedule reuse its last entry.
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    /// Three attempts: immediately, after 2s, after 4s.
    fn default() -> Self {
        Self::from_millis(3, &[0, 2_000, 4_000])
    }
}

impl RetryPolicy {
    pub fn from_millis(max_attempts: u32, delays_ms: &[u64]) -> Self {
        Self {
            max_attempts,
            delays: delays_ms.iter().map(|ms| Duration::from_millis(*ms)).collect(),
        }
    }

    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.delays
            .get(attempt as usize)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or_default()
    }
}

/// Last error after the policy gave up
#[derive(Debug, Clone, PartialEq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `operation` until it succeeds, `should_retry` rejects its error, or
/// the policy runs out of attempts. The operation receives the 0-based
/// attempt number.
pub async fn retry<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    mut operation: Op,
    should_retry: P,
) -> Result<T, RetryExhausted<E>>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if attempt >= max_attempts || !should_retry(&error) {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }
            }
        }
    }
}
