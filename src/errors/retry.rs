use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::types::RootCauseError;

/// How many times an outbound call is re-issued and how long to wait in
/// between. The default makes exactly one attempt.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// First backoff step; doubled on every further attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fixed wait added per attempt when the remote side reports throttling.
    pub rate_limit_step: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            rate_limit_step: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, ..Default::default() }
    }

    /// Same attempt count with every wait collapsed to zero.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            rate_limit_step: Duration::ZERO,
        }
    }

    /// Wait before re-issuing after the 0-indexed `attempt` failed.
    ///
    /// Throttling waits grow linearly (one step more each time, at most six
    /// steps). Everything else backs off exponentially with up to one base
    /// step of jitter, capped at `max_delay`.
    pub fn delay_for(&self, err: &RootCauseError, attempt: u32) -> Duration {
        if matches!(err, RootCauseError::RateLimit(_)) {
            return self.rate_limit_step * (attempt + 1).min(6);
        }
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        let jitter = self.base_delay.mul_f64(rand::random::<f64>());
        (exp + jitter).min(self.max_delay)
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// attempt budget runs out. The last error is returned unchanged.
pub async fn with_retry<F, Fut, T>(label: &str, config: &RetryConfig, mut call: F) -> Result<T, RootCauseError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RootCauseError>>,
{
    let attempts = config.max_retries + 1;
    let mut attempt: u32 = 0;

    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let class = err.classify();
        if !class.retryable || attempt + 1 >= attempts {
            if attempts > 1 {
                warn!(call = label, attempts = attempt + 1, error_type = class.error_type, error = %err, "Call failed");
            }
            return Err(err);
        }

        let delay = config.delay_for(&err, attempt);
        warn!(
            call = label,
            attempt = attempt + 1,
            of = attempts,
            error_type = class.error_type,
            wait_ms = delay.as_millis() as u64,
            error = %err,
            "Call failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_rate_limit_wait_is_linear_and_capped() {
        let config = RetryConfig::new(3);
        let err = RootCauseError::RateLimit("429".into());
        assert_eq!(config.delay_for(&err, 0), Duration::from_secs(10));
        assert_eq!(config.delay_for(&err, 1), Duration::from_secs(20));
        assert_eq!(config.delay_for(&err, 12), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_doubles_within_jitter() {
        let config = RetryConfig::new(3);
        let err = RootCauseError::Network("reset".into());
        let first = config.delay_for(&err, 0).as_secs_f64();
        let second = config.delay_for(&err, 1).as_secs_f64();
        assert!((1.0..2.0).contains(&first));
        assert!((2.0..3.0).contains(&second));
        assert_eq!(config.delay_for(&err, 10), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_default_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", &RetryConfig::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(RootCauseError::Network("reset".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", &RetryConfig::immediate(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(RootCauseError::Authentication("bad key".into())) }
        })
        .await;

        assert!(matches!(result, Err(RootCauseError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", &RetryConfig::immediate(2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(RootCauseError::LLMApi("upstream 502".into()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", &RetryConfig::immediate(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(RootCauseError::Timeout("slow".into())) }
        })
        .await;

        assert!(matches!(result, Err(RootCauseError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
