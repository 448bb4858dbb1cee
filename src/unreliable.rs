//! Unreliable Operation Wrapper
//!
//! TigerStyle: Simulated network conditions around in-memory operations.
//!
//! Every call:
//! 1. draws a latency in [min, max) ms and sleeps for it,
//! 2. draws again and, above the failure threshold, rejects with
//!    [`TransientFailure`] without touching the operation,
//! 3. otherwise runs the operation and returns whatever it returns.
//!
//! An injected failure therefore never has side effects, and an operation's
//! own error is passed through untouched. Nothing here retries.

use crate::config::UnreliableConfig;
use crate::random::RandomSource;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Operation ID prefix for readability in traces
pub const OPERATION_ID_PREFIX: &str = "op_";

// =============================================================================
// Errors
// =============================================================================

/// Injected failure, the wrapped operation never ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transient failure: random error")]
pub struct TransientFailure;

// =============================================================================
// Unreliable
// =============================================================================

/// Latency and failure injector
pub struct Unreliable {
    config: UnreliableConfig,
    source: Arc<dyn RandomSource>,
}

impl std::fmt::Debug for Unreliable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unreliable")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Unreliable {
    /// Create a wrapper drawing from `source`
    ///
    /// # Panics
    /// Panics if the config does not validate.
    pub fn new(config: UnreliableConfig, source: Arc<dyn RandomSource>) -> Self {
        if let Err(e) = config.validate() {
            panic!("invalid unreliable config: {}", e);
        }
        Self { config, source }
    }

    /// Active configuration
    pub fn config(&self) -> &UnreliableConfig {
        &self.config
    }

    /// Run `operation` under injected latency and failure
    pub async fn run<T, E, F, Fut>(&self, operation: &str, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TransientFailure>,
    {
        let op_id = new_operation_id();
        let latency = self.draw_latency();
        tracing::debug!(
            op_id = %op_id,
            operation,
            latency_ms = latency.as_millis() as u64,
            "Scheduling operation"
        );
        self.sleep(latency).await;

        let draw = self.source.next_uniform();
        if draw > self.config.failure_threshold {
            tracing::warn!(
                op_id = %op_id,
                operation,
                draw,
                threshold = self.config.failure_threshold,
                "Injected transient failure"
            );
            return Err(TransientFailure.into());
        }

        let result = op().await;
        tracing::debug!(op_id = %op_id, operation, ok = result.is_ok(), "Operation settled");
        result
    }

    /// Suspend for an injected latency without any failure draw
    pub async fn delay(&self, operation: &str) {
        let latency = self.draw_latency();
        tracing::debug!(
            operation,
            latency_ms = latency.as_millis() as u64,
            "Delaying operation"
        );
        self.sleep(latency).await;
    }

    /// Draw a whole-millisecond latency in [min, max), or exactly `min` when the range is empty
    pub fn draw_latency(&self) -> Duration {
        let min = self.config.latency_ms_min;
        let span = self.config.latency_ms_max - min;
        let offset = (self.source.next_uniform() * span as f64).floor() as u64;
        Duration::from_millis(min + offset.min(span.saturating_sub(1)))
    }

    async fn sleep(&self, latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn new_operation_id() -> String {
    format!("{}{}", OPERATION_ID_PREFIX, &Uuid::new_v4().to_string()[..8])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, SeededRandom};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;
    use tokio_test::{assert_pending, assert_ready_eq};

    #[derive(Debug, PartialEq, thiserror::Error)]
    enum ProbeError {
        #[error(transparent)]
        Transient(#[from] TransientFailure),
        #[error("probe failed")]
        Probe,
    }

    fn unreliable(draws: impl IntoIterator<Item = f64>) -> Unreliable {
        Unreliable::new(UnreliableConfig::default(), Arc::new(ScriptedRandom::new(draws)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspends_before_running() {
        let unreliable = unreliable([0.5, 0.0]);
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;

        let mut task = tokio_test::task::spawn(unreliable.run("probe", move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ProbeError>(7)
        }));

        // 200 + 0.5 * 800 = 600ms
        assert_pending!(task.poll());
        tokio::time::advance(Duration::from_millis(599)).await;
        assert_pending!(task.poll());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_ready_eq!(task.poll(), Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_failure_skips_operation() {
        let unreliable = unreliable([0.0, 0.76]);
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;

        let result = unreliable
            .run("probe", move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ProbeError>(())
            })
            .await;

        assert_eq!(result, Err(ProbeError::Transient(TransientFailure)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_is_exclusive() {
        let unreliable = unreliable([0.0, 0.75]);
        let result = unreliable
            .run("probe", || async { Ok::<_, ProbeError>("ran") })
            .await;
        assert_eq!(result, Ok("ran"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_passes_through() {
        let unreliable = unreliable([0.0, 0.1]);
        let result = unreliable
            .run("probe", || async { Err::<(), _>(ProbeError::Probe) })
            .await;
        assert_eq!(result, Err(ProbeError::Probe));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rates_and_latency_bounds() {
        let unreliable = Unreliable::new(UnreliableConfig::default(), Arc::new(SeededRandom::new(7)));
        let mut failures = 0;

        for _ in 0..1000 {
            let started = Instant::now();
            let result = unreliable
                .run("probe", || async { Ok::<_, ProbeError>(()) })
                .await;
            let elapsed = started.elapsed();

            assert!(elapsed >= Duration::from_millis(200), "latency {:?} too short", elapsed);
            assert!(elapsed < Duration::from_millis(1000), "latency {:?} too long", elapsed);
            if result.is_err() {
                failures += 1;
            }
        }

        // Reject when draw > 0.75: about a quarter of calls.
        let rate = failures as f64 / 1000.0;
        assert!((0.20..=0.30).contains(&rate), "rejection rate {}", rate);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_never_fails() {
        let unreliable = unreliable([0.999]);
        let started = Instant::now();
        unreliable.delay("probe").await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(999) && elapsed < Duration::from_millis(1000));
    }

    #[test]
    fn test_latency_draw_edges() {
        assert_eq!(unreliable([0.0]).draw_latency(), Duration::from_millis(200));
        assert_eq!(unreliable([0.999_999_9]).draw_latency(), Duration::from_millis(999));

        let fixed = UnreliableConfig {
            latency_ms_min: 50,
            latency_ms_max: 50,
            failure_threshold: 0.75,
        };
        let unreliable = Unreliable::new(fixed, Arc::new(ScriptedRandom::constant(0.9)));
        assert_eq!(unreliable.draw_latency(), Duration::from_millis(50));
    }

    #[test]
    #[should_panic(expected = "invalid unreliable config")]
    fn test_rejects_invalid_config() {
        let config = UnreliableConfig {
            failure_threshold: 2.0,
            ..UnreliableConfig::default()
        };
        let _ = Unreliable::new(config, Arc::new(ScriptedRandom::constant(0.0)));
    }
}
