//! Bounded retry with exponential backoff and jitter
//!
//! Generic wrapper around any fallible async operation, independent of the
//! queue technology: bounded attempt count, exponential delay, randomized
//! jitter.

use std::future::Future;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::config::RetryConfig;
use crate::Result;

/// Spread a delay by up to `jitter_ratio` in either direction. UUID bytes
/// serve as the entropy source, which avoids a dedicated RNG dependency.
pub(crate) fn jittered_duration(base: Duration, jitter_ratio: f64) -> Duration {
    if base.is_zero() || jitter_ratio <= 0.0 {
        return base;
    }

    let bytes = *Uuid::new_v4().as_bytes();
    let value = u64::from_le_bytes(bytes[..8].try_into().expect("8 bytes"));
    let unit = (value as f64) / (u64::MAX as f64); // [0,1]
    let signed = unit * 2.0 - 1.0; // [-1,1]
    let factor = (1.0 + signed * jitter_ratio).max(0.0);
    base.mul_f64(factor)
}

/// Run `op`, retrying on failure with exponentially growing, jittered
/// delays until it succeeds or the retry budget is spent. The final error is
/// returned to the caller, which decides whether it is fatal.
pub async fn retry_with_backoff<T, F, Fut>(
    label: &str,
    policy: &RetryConfig,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let delay =
                    jittered_duration(policy.delay_for_attempt(attempt), policy.jitter_ratio);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label,
                    attempt + 1,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    "{} failed after {} attempts: {}",
                    label,
                    attempt + 1,
                    e
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn immediate_policy(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_seconds: 0,
            max_delay_seconds: 0,
            backoff_multiplier: 2.0,
            jitter_ratio: 0.0,
        }
    }

    #[tokio::test]
    async fn gives_up_after_the_retry_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff("always-fails", &immediate_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Internal("boom".to_string())) }
        })
        .await;

        assert!(result.is_err());
        // Initial attempt plus three retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn recovers_when_a_later_attempt_succeeds() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff("flaky", &immediate_policy(5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Internal("transient".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn jitter_stays_within_the_configured_ratio() {
        let base = Duration::from_secs(10);
        for _ in 0..64 {
            let jittered = jittered_duration(base, 0.2);
            assert!(jittered >= Duration::from_secs(8));
            assert!(jittered <= Duration::from_secs(12));
        }
        assert_eq!(jittered_duration(base, 0.0), base);
    }
}
