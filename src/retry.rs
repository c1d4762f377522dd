use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Bounds an external call; expiry is reported as a retryable `Timeout`.
pub async fn with_timeout<F, T>(duration: Duration, label: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| AppError::Timeout(format!("{} after {:?}", label, duration)))
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(200),
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1 << attempt.min(16))
    }
}

/// Re-runs `op` while it fails with a retryable error, doubling the delay each time.
pub async fn retry<F, Fut, T>(policy: RetryPolicy, label: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    "{} failed (attempt {}), retrying in {:?}: {}",
                    label,
                    attempt + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_retryable() {
        let result: AppResult<()> =
            with_timeout(Duration::from_millis(5), "search", std::future::pending()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry(fast(2), "search", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::face(true, "ThrottlingException"))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: AppResult<()> = retry(fast(2), "search", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Timeout("search".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_skips_permanent_failure() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: AppResult<()> = retry(fast(5), "search", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::face(false, "InvalidParameterException"))
        })
        .await;
        assert!(matches!(result, Err(AppError::FaceService { retryable: false, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
