//! Retry Helper
//!
//! TigerStyle: Opt-in retries, decided by the caller.
//!
//! A [`RetryPolicy`] repeats an async call while the caller's predicate says
//! the error is retryable, up to `max_attempts`. Nothing below the policy
//! retries on its own.
//!
//! Only retry what is safe to repeat. A transient failure never ran the
//! operation, so repeating it is always safe; a total-replace write such as
//! `set_permissions_for_role` is also idempotent for identical input.

use crate::error::ServiceError;
use std::future::Future;
use std::time::Duration;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Default number of attempts (first call included)
pub const RETRY_ATTEMPTS_DEFAULT: u32 = 5;

/// Upper bound on attempts for any policy
pub const RETRY_ATTEMPTS_MAX: u32 = 1_000;

// =============================================================================
// Backoff
// =============================================================================

/// Wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Retry immediately
    #[default]
    None,
    /// Same wait every time
    Constant(Duration),
    /// `step * attempt`
    Linear(Duration),
}

impl Backoff {
    /// Wait before retry number `attempt` (1-based: the wait after the first failure is `attempt = 1`)
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Constant(d) => *d,
            Self::Linear(step) => step.saturating_mul(attempt),
        }
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded retry with a caller-supplied retryability predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_ATTEMPTS_DEFAULT,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    /// Start building a policy
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Total attempts, first call included
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, retrying errors for which `is_retryable` returns true
    ///
    /// Returns the first success, the first non-retryable error, or the
    /// last error once attempts run out.
    pub async fn execute<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    let delay = self.backoff.delay(attempt);
                    tracing::debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if is_retryable(&e) {
                        tracing::warn!(attempts = attempt, error = %e, "Retry attempts exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Run `op`, retrying only transient service failures
    pub async fn execute_transient<T, F, Fut>(&self, op: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        self.execute(op, ServiceError::is_transient).await
    }
}

/// Builder for [`RetryPolicy`]
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Total attempts, first call included
    ///
    /// # Panics
    /// Panics if `attempts` is zero or above `RETRY_ATTEMPTS_MAX`.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        assert!(
            (1..=RETRY_ATTEMPTS_MAX).contains(&attempts),
            "max_attempts {} outside 1..={}",
            attempts,
            RETRY_ATTEMPTS_MAX
        );
        self.policy.max_attempts = attempts;
        self
    }

    /// Wait between attempts
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.policy.backoff = backoff;
        self
    }

    /// Finish
    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}

// =============================================================================
// Tests
// =============================================================================
