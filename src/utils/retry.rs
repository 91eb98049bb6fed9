//! Bounded retry with exponential backoff.
//!
//! Both the transport-level fetch loop and the resolution-level loop are
//! built on [`RetryPolicy`], each with its own instance, so their budgets and
//! backoff curves can be configured and tested separately.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Default number of attempts for either loop
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff base; attempt `n` waits `base * 2^n` before the next try
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Backoff base
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    /// Builder-style setter for the attempt budget
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Attempts actually made; a zero budget still runs once
    pub fn budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// With the default base this is `2^attempt` seconds: 2s, 4s, 8s, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Sleep for the backoff after `attempt`
    pub async fn backoff(&self, attempt: u32) {
        let delay = self.delay_for(attempt);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

/// Errors that know whether another attempt could help
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Why [`with_retry`] gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that is not worth retrying
    Permanent(E),
}

/// Execute an async operation under `policy`.
///
/// `operation` receives the 1-based attempt number. Retryable failures
/// sleep `policy.delay_for(attempt)` before the next attempt; nothing sleeps
/// after the final one.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, RetryError<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let budget = policy.budget();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!("Operation succeeded on attempt {}/{}", attempt, budget);
                }
                return Ok(result);
            }
            Err(error) if !error.is_retryable() => return Err(RetryError::Permanent(error)),
            Err(error) => {
                if attempt >= budget {
                    tracing::debug!("Giving up after {} attempts: {}", attempt, error);
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }

                tracing::debug!(
                    "Attempt {}/{} failed: {}, retrying in {:?}",
                    attempt,
                    budget,
                    error,
                    policy.delay_for(attempt)
                );
                policy.backoff(attempt).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Flaky,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Flaky)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_default_backoff_is_two_to_the_attempt_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(40), Duration::from_secs(120));
    }

    #[test]
    fn test_zero_budget_runs_once() {
        assert_eq!(RetryPolicy::default().max_attempts(0).budget(), 1);
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(fast_policy(3), move |_| {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Ok::<_, TestError>("success")
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let attempts_seen = Rc::new(RefCell::new(Vec::new()));

        let result = {
            let attempts_seen = attempts_seen.clone();
            with_retry(fast_policy(3), move |attempt| {
                let attempts_seen = attempts_seen.clone();
                async move {
                    attempts_seen.borrow_mut().push(attempt);
                    if attempt < 3 {
                        Err(TestError::Flaky)
                    } else {
                        Ok("success")
                    }
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*attempts_seen.borrow(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let result: Result<(), _> = with_retry(fast_policy(3), |_| async { Err(TestError::Flaky) }).await;

        assert_eq!(
            result.unwrap_err(),
            RetryError::Exhausted {
                attempts: 3,
                last: TestError::Flaky
            }
        );
    }

    #[tokio::test]
    async fn test_retry_returns_permanent_error() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<(), _> = {
            let call_count = call_count.clone();
            with_retry(fast_policy(5), move |_| {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(TestError::Fatal)
                }
            })
        }
        .await;

        assert_eq!(result.unwrap_err(), RetryError::Permanent(TestError::Fatal));
        assert_eq!(*call_count.borrow(), 1);
    }
}
