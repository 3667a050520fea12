//! Retry with exponential backoff for transient API failures.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Fraction of the computed delay used as the jitter range
const JITTER_FRACTION: f64 = 0.1;

/// Exponential backoff policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub min_wait: Duration,
    /// Upper bound for any single delay
    pub max_wait: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Apply a uniform +/-10% jitter to each delay
    pub jitter: bool,
}

impl RetryPolicy {
    /// API calls: rate limits, timeouts, 5xx errors
    pub fn api_call() -> Self {
        Self {
            max_attempts: 3,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }

    /// Rate limits: more attempts, longer waits
    pub fn rate_limit() -> Self {
        Self {
            max_attempts: 5,
            min_wait: Duration::from_secs(5),
            max_wait: Duration::from_secs(120),
            multiplier: 2.0,
            jitter: true,
        }
    }

    /// Network hiccups: quick retries
    pub fn network() -> Self {
        Self {
            max_attempts: 3,
            min_wait: Duration::from_millis(500),
            max_wait: Duration::from_secs(10),
            multiplier: 1.5,
            jitter: true,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = self.min_wait.as_secs_f64() * self.multiplier.powi(exponent);
        let mut delay = base.min(self.max_wait.as_secs_f64());

        if self.jitter && delay > 0.0 {
            let range = delay * JITTER_FRACTION;
            delay += rand::thread_rng().gen_range(-range..=range);
        }

        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. Returns the last error on failure.
    pub async fn retry<T, E, F, Fut, P>(
        &self,
        operation_name: &str,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            operation = operation_name,
                            attempt,
                            max_attempts,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && is_retryable(&e) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt == max_attempts && is_retryable(&e) {
                        error!(
                            operation = operation_name,
                            attempt,
                            max_attempts,
                            error = %e,
                            "Operation failed after all retry attempts"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::api_call()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::api_call()
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::rate_limit();
        for _ in 0..100 {
            let delay = policy.delay_for_attempt(2).as_secs_f64();
            assert!((9.0..=11.0).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_presets() {
        assert_eq!(RetryPolicy::network().multiplier, 1.5);
        assert_eq!(RetryPolicy::rate_limit().max_attempts, 5);
        assert_eq!(RetryPolicy::default(), RetryPolicy::api_call());
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<&str, String> = fast_policy(3)
            .retry(
                "flaky",
                || {
                    let counter = counter.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err("transient".to_string())
                        } else {
                            Ok("done")
                        }
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), String> = fast_policy(2)
            .retry(
                "always-fails",
                || {
                    let counter = counter.clone();
                    async move {
                        let n = counter.fetch_add(1, Ordering::SeqCst);
                        Err(format!("failure {}", n))
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap_err(), "failure 1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), String> = fast_policy(5)
            .retry(
                "fatal",
                || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err("fatal".to_string())
                    }
                },
                |e| e != "fatal",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
