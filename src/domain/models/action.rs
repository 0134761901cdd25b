//! Corrective actions: idempotency-keyed work units with bounded retry.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy with exponential backoff.
///
/// Backoff doubles with each attempt, capped at `max_backoff_ms`. Every
/// failure is considered retryable; callers that want to give up early
/// should encode that in the work future itself.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries before giving up.
    pub max_retries: u32,

    /// Initial backoff duration in milliseconds.
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Execute an async operation, retrying failures with backoff.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if attempt >= self.max_retries {
                        warn!("operation failed after {} attempts: {err:#}", attempt + 1);
                        return Err(err);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "attempt {} failed: {err:#}. Retrying in {:?}",
                        attempt + 1,
                        backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// min(initial_backoff * 2^attempt, max_backoff)
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }
}

pub type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A unit of corrective work keyed by a caller-supplied reproducible id
/// (usually the offending event's id). Two actions with the same id are
/// duplicates while one of them is tracked as recent.
///
/// The retry policy is part of the action, not of any queue: a work item
/// that wants resilience declares it here, and the factory is invoked once
/// per attempt.
pub struct Action {
    id: String,
    retry: RetryPolicy,
    attempt: Box<dyn FnMut() -> ActionFuture + Send>,
}

impl Action {
    pub fn new<F>(id: impl Into<String>, attempt: F) -> Self
    where
        F: FnMut() -> ActionFuture + Send + 'static,
    {
        Self {
            id: id.into(),
            retry: RetryPolicy::default(),
            attempt: Box::new(attempt),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run the work to completion under the action's retry policy.
    pub async fn execute(mut self) -> Result<()> {
        let retry = self.retry.clone();
        retry.execute(|| (self.attempt)()).await
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, 1_000, 8_000);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(1_000));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2_000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(4_000));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(8_000));
        assert_eq!(policy.calculate_backoff(4), Duration::from_millis(8_000));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let policy = RetryPolicy::new(3, 1, 10);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        anyhow::bail!("transient");
                    }
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let policy = RetryPolicy::new(2, 1, 10);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("still broken")
                }
            })
            .await;

        assert!(result.is_err());
        // initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn action_runs_factory_per_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let action = Action::new("$evt", move || {
            let calls = Arc::clone(&calls_clone);
            Box::pin(async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("first attempt fails");
                }
                Ok(())
            }) as ActionFuture
        })
        .with_retry(RetryPolicy::new(1, 1, 10));

        assert_eq!(action.id(), "$evt");
        action.execute().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
