//! Retry logic with exponential backoff and jitter.
//!
//! Used around text-generation calls, where transient backend failures are
//! common. Only errors the caller classifies as retryable are retried.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::core::config::AiConfig;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,

    /// Initial delay before first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Whether to add up to 25% jitter to delays.
    pub jitter: bool,

    /// Timeout for each individual attempt.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            attempt_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries (fail fast).
    pub fn no_retry() -> Self {
        Self { max_attempts: 0, ..Default::default() }
    }

    /// Build the generation retry policy from the `[ai]` config section.
    pub fn from_ai_config(ai: &AiConfig) -> Self {
        Self {
            max_attempts: ai.max_retries,
            attempt_timeout: Some(Duration::from_secs(ai.timeout_secs)),
            ..Default::default()
        }
    }

    /// Calculate delay before the given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            capped_delay * (1.0 + rand_jitter() * 0.25)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Pseudo-random jitter in `0.0..1.0` taken from the clock.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}

/// Result of a retried operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,

    /// Total time spent, including delays.
    pub total_time: Duration,

    /// Whether the operation was retried.
    pub was_retried: bool,
}

impl<T, E> RetryResult<T, E> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry an async operation while `should_retry` accepts its error.
///
/// `on_timeout` builds the error reported when a single attempt exceeds
/// `attempt_timeout`.
pub async fn retry_async<T, E, F, Fut, P, TO>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
    on_timeout: TO,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    TO: Fn(Duration) -> E,
{
    let start = Instant::now();
    let mut attempts = 0;
    let max_attempts = config.max_attempts + 1;

    loop {
        attempts += 1;
        let result = match config.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(result) => result,
                Err(_) => Err(on_timeout(limit)),
            },
            None => operation().await,
        };

        let give_up = match &result {
            Ok(_) => true,
            Err(e) => attempts >= max_attempts || !should_retry(e),
        };

        if give_up {
            return RetryResult {
                result,
                attempts,
                total_time: start.elapsed(),
                was_retried: attempts > 1,
            };
        }

        let delay = config.delay_for_attempt(attempts);
        tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "retrying");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
            attempt_timeout: None,
        }
    }

    #[test]
    fn test_retry_config_no_retry() {
        assert_eq!(RetryConfig::no_retry().max_attempts, 0);
    }

    #[test]
    fn test_from_ai_config() {
        let ai = AiConfig { max_retries: 4, timeout_secs: 9, ..Default::default() };
        let config = RetryConfig::from_ai_config(&ai);
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.attempt_timeout, Some(Duration::from_secs(9)));
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 10.0,
            jitter: false,
            ..Default::default()
        };
        assert!(config.delay_for_attempt(5) <= config.max_delay);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(
            &fast(3),
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient")
                } else {
                    Ok("done")
                }
            },
            |_| true,
            |_| "timeout",
        )
        .await;

        assert!(outcome.is_ok());
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.was_retried);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(
            &fast(5),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("fatal")
            },
            |e| *e != "fatal",
            |_| "timeout",
        )
        .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.into_result(), Err("fatal"));
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let config = RetryConfig { attempt_timeout: Some(Duration::from_millis(10)), ..fast(0) };
        let outcome = retry_async(
            &config,
            || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, String>(())
            },
            |_| true,
            |limit| format!("timed out after {}ms", limit.as_millis()),
        )
        .await;

        assert_eq!(outcome.into_result(), Err("timed out after 10ms".to_string()));
    }
}
