//! Timeout and retry policy for capability calls.
//!
//! Embedding and generation backends are remote and slow. Every call made by
//! the index and the composer goes through [`call_with_policy`], which bounds
//! each attempt with a timeout and retries transient failures with a linear
//! backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RagError, Result};

/// Time budget and retry behaviour for one kind of capability call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CallPolicy {
    /// Budget for a single attempt, in milliseconds.
    pub timeout_ms: u64,
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Delay before retry `n` is `n * backoff_ms`.
    pub backoff_ms: u64,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self { timeout_ms: 30_000, retries: 1, backoff_ms: 500 }
    }
}

impl CallPolicy {
    /// Policy for embedding calls: 30s per attempt, one retry.
    pub fn embedding() -> Self {
        Self::default()
    }

    /// Policy for generation calls: 120s per attempt, one retry.
    pub fn generation() -> Self {
        Self { timeout_ms: 120_000, ..Self::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff_ms = backoff.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Check that an attempt has a usable time budget.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `timeout_ms` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(RagError::ConfigError("timeout_ms must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Configuration mistakes will not fix themselves on a second attempt.
fn is_retryable(error: &RagError) -> bool {
    !matches!(error, RagError::ConfigError(_) | RagError::LoadError { .. })
}

/// Run `call` under `policy`, retrying retryable failures.
///
/// An attempt that exceeds the timeout fails with [`RagError::Timeout`].
///
/// # Errors
///
/// Returns the error of the last attempt once retries are exhausted.
pub async fn call_with_policy<T, F, Fut>(
    policy: &CallPolicy,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout(), call()).await {
            Ok(result) => result,
            Err(_) => Err(RagError::Timeout {
                operation: operation.to_string(),
                after_ms: policy.timeout_ms,
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.retries && is_retryable(&e) => {
                attempt += 1;
                warn!(operation, attempt, error = %e, "capability call failed, retrying");
                tokio::time::sleep(policy.backoff() * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}
