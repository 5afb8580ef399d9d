//! Retry policy for remote calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;

/// How many times a failed remote call is repeated, and how long to wait
/// in between. The default is one immediate retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::ZERO,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Runs `op` until it succeeds or the retries are used up, returning the
    /// last error.
    pub async fn run<T, E, F, Fut>(&self, what: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.run_if(what, op, |_| true).await
    }

    /// Like [`RetryPolicy::run`], but only errors accepted by `retryable`
    /// are retried; others are returned at once.
    pub async fn run_if<T, E, F, Fut, P>(&self, what: &str, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && retryable(&e) => {
                    attempt += 1;
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        what,
                        attempt,
                        self.max_retries + 1,
                        e
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
