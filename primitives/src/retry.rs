//! exponential backoff with jitter.
//!
//! Only `Error::ServiceThrottled` is retried transparently here; everything
//! else (in particular `ConditionFailed`) is returned to the caller
//! immediately, because conditional-check failures carry primitive-level
//! meaning that this utility has no business interpreting.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{CResult, Error};

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base: Duration::from_millis(100), cap: Duration::from_secs(2), multiplier: 2.0, max_attempts: 8 }
    }
}

impl BackoffPolicy {
    /// The lock/leader `acquire --wait` policy: base 100ms, factor
    /// 2, cap 2s, unbounded attempts (the wait budget itself bounds it).
    pub fn lock_wait() -> Self {
        Self { base: Duration::from_millis(100), cap: Duration::from_secs(2), multiplier: 2.0, max_attempts: u32::MAX }
    }

    /// Decorrelated-jitter delay for the given attempt (0-indexed),
    /// following the "full jitter" family: `random(base, min(cap, base *
    /// multiplier^attempt))`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.powi(attempt as i32);
        let upper_ms = (self.base.as_millis() as f64 * exp).min(self.cap.as_millis() as f64);
        let lower_ms = self.base.as_millis() as f64;
        let upper_ms = upper_ms.max(lower_ms);
        let jittered_ms = rand::thread_rng().gen_range(lower_ms..=upper_ms);
        Duration::from_millis(jittered_ms as u64)
    }
}

/// Runs `op` with exponential backoff, retrying only on
/// `Error::ServiceThrottled`, up to `policy.max_attempts` (inclusive of the
/// first attempt).
pub async fn with_retry<T, F, Fut>(policy: &BackoffPolicy, mut op: F) -> CResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay(attempt);
                log::warn!("retrying after throttling (attempt {attempt}): {err}, sleeping {delay:?}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Applies a global deadline to a future, translating elapsed time into
/// `Error::Timeout`.
pub async fn with_deadline<T, Fut>(timeout: Option<Duration>, op: Fut) -> CResult<T>
where
    Fut: Future<Output = CResult<T>>,
{
    match timeout {
        None => op.await,
        Some(timeout) => match tokio::time::timeout(timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!("operation exceeded {timeout:?}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn retries_only_throttled_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let policy = BackoffPolicy { base: Duration::from_millis(1), cap: Duration::from_millis(5), multiplier: 2.0, max_attempts: 3 };
        let result: CResult<()> = with_retry(&policy, || {
            let calls = calls_clone.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::ServiceThrottled("slow down".to_string()))
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_condition_failed() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let policy = BackoffPolicy::default();
        let result: CResult<()> = with_retry(&policy, || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::ConditionFailed("nope".to_string()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_translates_to_timeout_error() {
        let result: CResult<()> = with_deadline(Some(Duration::from_millis(5)), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
