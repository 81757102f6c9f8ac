use super::traits::{AiBackend, AudioClip, BackendFuture};
use crate::error::TransportError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Retry parameters shared by chat and transcription calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Backoff base after a throttling response without a usable hint.
    pub throttle_base_delay: Duration,
    /// Backoff base after network failures, timeouts and 5xx.
    pub network_base_delay: Duration,
    pub honor_retry_after: bool,
    /// Ceiling for computed exponential backoff. An honored `Retry-After`
    /// hint is waited out in full.
    pub max_backoff: Duration,
    /// Hard client-side limit per attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            throttle_base_delay: Duration::from_secs(5),
            network_base_delay: Duration::from_secs(1),
            honor_retry_after: true,
            max_backoff: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after `error` on zero-based `attempt`.
    pub fn delay_for(&self, error: &TransportError, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        match error {
            TransportError::Throttled {
                retry_after_secs: Some(secs),
                ..
            } if self.honor_retry_after => Duration::from_secs(*secs),
            err if err.is_throttled() => self
                .throttle_base_delay
                .saturating_mul(factor)
                .min(self.max_backoff),
            _ => self
                .network_base_delay
                .saturating_mul(factor)
                .min(self.max_backoff),
        }
    }
}

/// Backend wrapper that adds timeouts and bounded retries.
///
/// Non-retryable failures return immediately and unchanged. Once attempts
/// run out the last failure comes back inside [`TransportError::Exhausted`].
pub struct RetryingTransport {
    inner: Arc<dyn AiBackend>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn AiBackend>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn call<'a, F>(&'a self, operation: &'static str, mut attempt_fn: F) -> Result<String, TransportError>
    where
        F: FnMut() -> BackendFuture<'a>,
    {
        let backend = self.inner.name();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match with_timeout(&self.policy, backend, attempt_fn()).await {
                Ok(text) => {
                    if attempt > 0 {
                        tracing::info!(backend, operation, attempt, "Backend recovered after retries");
                    }
                    return Ok(text);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                tracing::warn!(backend, operation, "Non-retryable backend error: {error}");
                return Err(error);
            }

            attempt += 1;
            if attempt >= max_attempts {
                tracing::warn!(backend, operation, attempts = attempt, "Backend retries exhausted: {error}");
                return Err(TransportError::Exhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.policy.delay_for(&error, attempt - 1);
            tracing::warn!(
                backend,
                operation,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Backend call failed, retrying: {error}"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

async fn with_timeout<T>(
    policy: &RetryPolicy,
    backend: &str,
    call: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    tokio::time::timeout(policy.timeout, call)
        .await
        .unwrap_or_else(|_| {
            Err(TransportError::Timeout {
                backend: backend.to_string(),
                timeout_secs: policy.timeout.as_secs(),
            })
        })
}

impl AiBackend for RetryingTransport {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn complete<'a>(&'a self, system_prompt: &'a str, message: &'a str) -> BackendFuture<'a> {
        Box::pin(self.call("complete", move || self.inner.complete(system_prompt, message)))
    }

    fn transcribe<'a>(&'a self, clip: &'a AudioClip) -> BackendFuture<'a> {
        Box::pin(self.call("transcribe", move || self.inner.transcribe(clip)))
    }
}
