use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    /// 失敗時重試一次
    fn default() -> Self {
        Self::new(2, Duration::from_millis(200))
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. The last error is returned.
pub async fn call_with_retry<T, F, Fut>(policy: RetryPolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying",
                    operation,
                    attempt,
                    policy.max_attempts,
                    e
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
