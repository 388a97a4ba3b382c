//! Retry strategies and backoff calculation
//!
//! This module decides, for one failed attempt, whether the request may be
//! resent and how long to wait first. It provides:
//!
//! - The [`RetryStrategy`] trait, injectable per request
//! - A best-effort strategy gated on idempotency and the failure reason
//! - A fail-fast strategy that never retries
//! - Pluggable backoff calculators (capped exponential, jittered, closures)
//! - The fixed controlled-backoff schedule used for always-retry reasons
//!
//! Strategies never sleep and never mutate the request. Scheduling the
//! delay is left to the sender, see [`crate::dispatch`].

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::reason::RetryReason;
use crate::request::Request;

/// Default ceiling for the best-effort exponential backoff
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_millis(50);

/// Delays used when a reason demands unconditional retry, indexed by attempt
const CONTROLLED_BACKOFF_MS: [u64; 6] = [1, 10, 50, 100, 500, 1000];

/// What a strategy wants done with a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Resend after the given delay
    Retry(Duration),
    NoRetry,
}

/// Policy deciding whether and when a failed attempt is retried
///
/// Implementations must be side-effect free: `retry_after` only reads the
/// request.
pub trait RetryStrategy: fmt::Debug + Send + Sync {
    fn retry_after(&self, request: &Request, reason: RetryReason) -> RetryAction;
}

/// Maps an attempt count onto a backoff delay
pub trait BackoffCalculator: Send + Sync {
    fn backoff(&self, attempt: u32) -> Duration;
}

impl<F> BackoffCalculator for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn backoff(&self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// `min(2^attempt, cap)` in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedExponentialBackoff {
    pub cap: Duration,
}

impl Default for CappedExponentialBackoff {
    fn default() -> Self {
        Self { cap: DEFAULT_BACKOFF_CAP }
    }
}

impl BackoffCalculator for CappedExponentialBackoff {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponential_ms = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(exponential_ms).min(self.cap)
    }
}

/// Configuration for a jittered exponential backoff
///
/// Controls how the delay grows between attempts:
/// - Where the delay starts
/// - How fast it grows with each attempt
/// - Where it stops growing
/// - Whether randomization is applied to spread out coordinated retries
///
/// # Examples
///
/// ```
/// use dbretry::retry::{BackoffCalculator, JitteredBackoff};
/// use std::time::Duration;
///
/// let backoff = JitteredBackoff {
///     initial_backoff_ms: 5,
///     backoff_factor: 3.0,
///     max_backoff_ms: 200,
///     add_jitter: false,
/// };
///
/// assert_eq!(backoff.backoff(0), Duration::from_millis(5));
/// assert_eq!(backoff.backoff(2), Duration::from_millis(45));
/// assert_eq!(backoff.backoff(10), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JitteredBackoff {
    /// Delay before the first retry in milliseconds
    pub initial_backoff_ms: u64,

    /// Multiplier for each subsequent retry
    pub backoff_factor: f64,

    /// Maximum backoff time in milliseconds
    pub max_backoff_ms: u64,

    /// Whether to add jitter to backoff times
    pub add_jitter: bool,
}

impl Default for JitteredBackoff {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1,
            backoff_factor: 2.0,
            max_backoff_ms: 500,
            add_jitter: true,
        }
    }
}

impl BackoffCalculator for JitteredBackoff {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_ms = self.initial_backoff_ms as f64 * self.backoff_factor.powi(exponent);

        let jittered_ms = if self.add_jitter {
            let jitter_factor = rand::random::<f64>() * 0.2 + 0.9; // 0.9-1.1 range
            base_ms * jitter_factor
        } else {
            base_ms
        };

        // NaN and infinity both clamp to the ceiling
        let capped_ms = if jittered_ms.is_finite() {
            jittered_ms.min(self.max_backoff_ms as f64) as u64
        } else {
            self.max_backoff_ms
        };
        Duration::from_millis(capped_ms)
    }
}

/// Retries whenever it is safe to do so, backing off exponentially
///
/// A retry is permitted when the request is idempotent or the reason says
/// the server never applied the attempt. There is no attempt limit; the
/// request deadline bounds the total time spent.
#[derive(Clone)]
pub struct BestEffortRetryStrategy {
    backoff: Arc<dyn BackoffCalculator>,
}

impl BestEffortRetryStrategy {
    pub fn new() -> Self {
        Self::with_backoff(CappedExponentialBackoff::default())
    }

    /// Best-effort with `min(2^attempt, cap)` backoff
    pub fn with_cap(cap: Duration) -> Self {
        Self::with_backoff(CappedExponentialBackoff { cap })
    }

    pub fn with_backoff<B>(backoff: B) -> Self
    where
        B: BackoffCalculator + 'static,
    {
        Self { backoff: Arc::new(backoff) }
    }
}

impl Default for BestEffortRetryStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BestEffortRetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BestEffortRetryStrategy").finish_non_exhaustive()
    }
}

impl RetryStrategy for BestEffortRetryStrategy {
    fn retry_after(&self, request: &Request, reason: RetryReason) -> RetryAction {
        if request.is_idempotent() || reason.allows_non_idempotent_retry() {
            let attempt = u32::try_from(request.retry_count()).unwrap_or(u32::MAX);
            RetryAction::Retry(self.backoff.backoff(attempt))
        } else {
            RetryAction::NoRetry
        }
    }
}

/// Never retries
///
/// Reasons flagged as always-retry still bypass this strategy in the
/// orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailFastRetryStrategy;

impl RetryStrategy for FailFastRetryStrategy {
    fn retry_after(&self, _request: &Request, _reason: RetryReason) -> RetryAction {
        RetryAction::NoRetry
    }
}

/// Process-wide best-effort strategy with the default cap
pub fn best_effort() -> Arc<dyn RetryStrategy> {
    static DEFAULT: OnceLock<Arc<dyn RetryStrategy>> = OnceLock::new();
    let strategy = DEFAULT.get_or_init(|| {
        let default: Arc<dyn RetryStrategy> = Arc::new(BestEffortRetryStrategy::new());
        default
    });
    Arc::clone(strategy)
}

/// Fixed schedule for always-retry reasons: 1, 10, 50, 100, 500, then 1000ms
pub fn controlled_backoff(attempt: usize) -> Duration {
    let index = attempt.min(CONTROLLED_BACKOFF_MS.len() - 1);
    Duration::from_millis(CONTROLLED_BACKOFF_MS[index])
}
