//! Fixed-delay retry for idempotent reads.
use std::thread;
use std::time::Duration;

pub const DEFAULT_RETRY_DELAYS_MS: [u64; 3] = [750, 1_500, 3_000];
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: DEFAULT_RETRY_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>, max_attempts: usize) -> Self {
        Self {
            delays,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Delay after the failed attempt at `index` (0-based); the last delay repeats.
    pub fn delay_for(&self, index: usize) -> Duration {
        self.delays
            .get(index)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn with_retries<T, E>(&self, op: impl FnMut() -> Result<T, E>) -> Result<T, E> {
        self.with_retries_using(thread::sleep, op)
    }

    /// Run `op` up to `max_attempts` times, sleeping between failures.
    ///
    /// The final error is returned unchanged so callers can still branch on it.
    pub fn with_retries_using<T, E>(
        &self,
        mut sleep: impl FnMut(Duration),
        mut op: impl FnMut() -> Result<T, E>,
    ) -> Result<T, E> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt + 1 >= self.max_attempts {
                        return Err(err);
                    }
                    sleep(self.delay_for(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn network(n: usize) -> ApiError {
        ApiError::Network {
            path: "/api/deploy/run_1/refresh".to_string(),
            message: format!("failure {n}"),
        }
    }

    #[test]
    fn succeeds_on_third_attempt_after_two_delays() {
        let policy = RetryPolicy::default();
        let mut slept = Vec::new();
        let mut calls = 0;
        let result = policy.with_retries_using(
            |delay| slept.push(delay),
            || {
                calls += 1;
                if calls < 3 {
                    Err(network(calls))
                } else {
                    Ok("ok")
                }
            },
        );
        assert_eq!(result.expect("third attempt succeeds"), "ok");
        assert_eq!(calls, 3);
        assert_eq!(
            slept,
            vec![Duration::from_millis(750), Duration::from_millis(1_500)]
        );
    }

    #[test]
    fn exhaustion_returns_the_last_error_unchanged() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let err = policy
            .with_retries_using(
                |_| {},
                || -> Result<(), ApiError> {
                    calls += 1;
                    Err(network(calls))
                },
            )
            .expect_err("always fails");
        assert_eq!(calls, 3);
        assert_eq!(err.to_string(), network(3).to_string());
    }

    #[test]
    fn first_success_does_not_sleep() {
        let policy = RetryPolicy::default();
        let mut slept = 0;
        let value: Result<u8, ApiError> = policy.with_retries_using(|_| slept += 1, || Ok(7));
        assert_eq!(value.expect("ok"), 7);
        assert_eq!(slept, 0);
    }

    #[test]
    fn delays_repeat_the_last_value() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(750));
        assert_eq!(policy.delay_for(2), Duration::from_millis(3_000));
        assert_eq!(policy.delay_for(9), Duration::from_millis(3_000));

        let mut slept = Vec::new();
        let policy = RetryPolicy::new(vec![Duration::from_millis(750)], 4);
        let _ = policy.with_retries_using(|d| slept.push(d), || -> Result<(), ApiError> {
            Err(network(0))
        });
        assert_eq!(slept, vec![Duration::from_millis(750); 3]);
    }
}
