//! Attempt-level retry.

use crate::error::Result;
use roost_core::LoginSettings;
use std::future::Future;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Fixed-delay retry over whole login attempts.
///
/// Only errors the flow marks retryable get another attempt; everything
/// else surfaces immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Derive the policy from login settings.
    #[must_use]
    pub fn from_settings(settings: &LoginSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            delay: Duration::from_secs(settings.retry_delay_secs),
        }
    }

    /// Drive `op` until it succeeds, exhausts the attempt budget, or fails
    /// non-retryably. The attempt number (1-based) is passed through.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max = self.max_attempts,
                        "Login attempt failed, retrying: {e}"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
