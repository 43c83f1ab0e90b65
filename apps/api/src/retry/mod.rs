//! Retry with exponential backoff, per-attempt timeout, cooperative
//! cancellation and an optional fallback producer.
//!
//! Every outbound call in CVForge (LLM proxy, premium lookups, pool connect)
//! goes through this module. Nothing else in the service sleeps between
//! attempts.
//!
//! Lifecycle of one call:
//!
//! ```text
//! Idle → Attempting → (Success | AttemptFailed) → [Waiting → Attempting]*
//!      → (Success | GaveUp → (FallbackSuccess | Failed)) | Aborted
//! ```
//!
//! The delay after failed attempt `n` (1-based) is
//! `min(base_delay * exponential_base^(n-1), max_delay)`, so with the default
//! base of 2 the waits are 1x, 2x, 4x ... the base delay, capped.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cooperative cancellation token. Checked before each attempt and while
/// waiting; an in-flight attempt is never preempted.
pub type AbortSignal = CancellationToken;

// ────────────────────────────────────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────────────────────────────────────

/// Backoff parameters for one retried call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Upper bound on invocations of the primary operation. Clamped to ≥ 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor between consecutive delays. Values below 1.0 are treated as 1.0.
    pub exponential_base: f64,
    /// Hard limit for a single attempt. `None` waits as long as the operation takes.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            ..Default::default()
        }
    }

    pub fn with_exponential_base(mut self, exponential_base: f64) -> Self {
        self.exponential_base = exponential_base;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Number of primary invocations this policy allows.
    pub fn attempts_allowed(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after `failed_attempt` (1-based) before the next attempt.
    pub fn delay_for_attempt(&self, failed_attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.growth_factor().powi(exponent);
        let nanos = (self.base_delay.as_nanos() as f64 * factor).min(self.max_delay.as_nanos() as f64);

        // `as u64` saturates, so an overflowing product still lands on the cap.
        Duration::from_nanos(nanos as u64).min(self.max_delay)
    }

    fn growth_factor(&self) -> f64 {
        if self.exponential_base >= 1.0 {
            self.exponential_base
        } else {
            1.0
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes and errors
// ────────────────────────────────────────────────────────────────────────────

/// A successful retried call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub data: T,
    /// Primary invocations made, including the successful one.
    pub attempts: u32,
    /// True when `data` came from the fallback producer.
    pub from_fallback: bool,
}

impl<T> RetryOutcome<T> {
    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Why a single attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    #[error("{0}")]
    Operation(E),

    #[error("attempt timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl<E> AttemptError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::Timeout(_))
    }

    pub fn operation_error(&self) -> Option<&E> {
        match self {
            AttemptError::Operation(e) => Some(e),
            AttemptError::Timeout(_) => None,
        }
    }
}

/// Terminal failure of a retried call.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The abort signal fired. No fallback is attempted.
    #[error("operation aborted after {attempts} attempt(s)")]
    Aborted { attempts: u32 },

    /// Every allowed attempt failed and no fallback was supplied.
    #[error("retries exhausted after {attempts} attempt(s): {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: AttemptError<E>,
    },

    /// The retry predicate rejected an error; remaining attempts were skipped.
    #[error("non-retryable failure on attempt {attempts}: {error}")]
    Permanent { attempts: u32, error: E },

    /// The primary path gave up and the fallback producer failed too.
    #[error("fallback failed after {attempts} attempt(s): {fallback} (last primary error: {primary})")]
    FallbackFailed {
        attempts: u32,
        primary: AttemptError<E>,
        fallback: E,
    },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Aborted { attempts }
            | RetryError::Exhausted { attempts, .. }
            | RetryError::Permanent { attempts, .. }
            | RetryError::FallbackFailed { attempts, .. } => *attempts,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RetryError::Aborted { .. })
    }

    /// True when the primary path ended on a timed-out attempt.
    pub fn is_timeout(&self) -> bool {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error.is_timeout(),
            RetryError::FallbackFailed { primary, .. } => primary.is_timeout(),
            _ => false,
        }
    }
}

/// How the primary path stopped when it did not succeed.
enum GaveUp<E> {
    Exhausted(AttemptError<E>),
    Permanent(E),
}

impl<E> GaveUp<E> {
    fn into_error(self, attempts: u32) -> RetryError<E> {
        match self {
            GaveUp::Exhausted(last_error) => RetryError::Exhausted {
                attempts,
                last_error,
            },
            GaveUp::Permanent(error) => RetryError::Permanent { attempts, error },
        }
    }

    fn into_attempt_error(self) -> AttemptError<E> {
        match self {
            GaveUp::Exhausted(e) => e,
            GaveUp::Permanent(e) => AttemptError::Operation(e),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Runner
// ────────────────────────────────────────────────────────────────────────────

type RetryCallback<'a, E> = Box<dyn FnMut(&AttemptError<E>, u32, Duration) + Send + 'a>;
type RetryPredicate<'a, E> = Box<dyn Fn(&E) -> bool + Send + Sync + 'a>;

/// Configurable retried call. Build one per call; it is consumed by `run`.
pub struct Retry<'a, E> {
    policy: &'a RetryPolicy,
    abort: Option<&'a AbortSignal>,
    on_retry: Option<RetryCallback<'a, E>>,
    retry_if: Option<RetryPredicate<'a, E>>,
}

impl<'a, E> Retry<'a, E> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            abort: None,
            on_retry: None,
            retry_if: None,
        }
    }

    pub fn abort_on(mut self, signal: &'a AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    /// Observer called as `(error, failed_attempt, delay)` before each wait.
    /// It cannot change the delay.
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&AttemptError<E>, u32, Duration) + Send + 'a,
    {
        self.on_retry = Some(Box::new(callback));
        self
    }

    /// Only operation errors for which `predicate` holds are retried.
    /// Timeouts are always retried.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'a,
    {
        self.retry_if = Some(Box::new(predicate));
        self
    }

    pub async fn run<T, F, Fut>(self, operation: F) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute(operation, None::<fn() -> std::future::Ready<Result<T, E>>>)
            .await
    }

    /// Like `run`, but once the primary path gives up (exhausted or a
    /// non-retryable error) the fallback is invoked once and its value
    /// returned with `from_fallback = true`. Never invoked after an abort.
    pub async fn run_with_fallback<T, F, Fut, G, GFut>(
        self,
        operation: F,
        fallback: G,
    ) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T, E>>,
    {
        self.execute(operation, Some(fallback)).await
    }

    async fn execute<T, F, Fut, G, GFut>(
        mut self,
        mut operation: F,
        fallback: Option<G>,
    ) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.policy.attempts_allowed();
        let mut attempts = 0u32;

        let gave_up = loop {
            if is_aborted(self.abort) {
                debug!(attempts, "Retry aborted before next attempt");
                return Err(RetryError::Aborted { attempts });
            }

            attempts += 1;
            let failure = match attempt(&mut operation, self.policy.timeout).await {
                Ok(data) => {
                    return Ok(RetryOutcome {
                        data,
                        attempts,
                        from_fallback: false,
                    })
                }
                Err(failure) => failure,
            };

            let failure = match failure {
                AttemptError::Operation(e) if !self.is_retryable(&e) => {
                    debug!(attempts, "Attempt failed with a non-retryable error");
                    break GaveUp::Permanent(e);
                }
                other => other,
            };

            if attempts >= max_attempts {
                break GaveUp::Exhausted(failure);
            }

            let delay = self.policy.delay_for_attempt(attempts);
            warn!(
                "Attempt {}/{} failed ({}), retrying after {}ms",
                attempts,
                max_attempts,
                if failure.is_timeout() { "timeout" } else { "error" },
                delay.as_millis()
            );
            if let Some(callback) = self.on_retry.as_mut() {
                callback(&failure, attempts, delay);
            }
            drop(failure);

            if !wait(delay, self.abort).await {
                debug!(attempts, "Retry aborted while waiting");
                return Err(RetryError::Aborted { attempts });
            }
        };

        if is_aborted(self.abort) {
            return Err(RetryError::Aborted { attempts });
        }

        let Some(fallback) = fallback else {
            return Err(gave_up.into_error(attempts));
        };

        info!(attempts, "Primary path gave up, using fallback");
        match fallback().await {
            Ok(data) => Ok(RetryOutcome {
                data,
                attempts,
                from_fallback: true,
            }),
            Err(fallback_error) => Err(RetryError::FallbackFailed {
                attempts,
                primary: gave_up.into_attempt_error(),
                fallback: fallback_error,
            }),
        }
    }

    fn is_retryable(&self, error: &E) -> bool {
        self.retry_if.as_ref().map_or(true, |predicate| predicate(error))
    }
}

fn is_aborted(signal: Option<&AbortSignal>) -> bool {
    signal.is_some_and(CancellationToken::is_cancelled)
}

async fn attempt<T, E, F, Fut>(operation: &mut F, timeout: Option<Duration>) -> Result<T, AttemptError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let pending = operation();
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, pending).await {
            Ok(result) => result.map_err(AttemptError::Operation),
            Err(_) => Err(AttemptError::Timeout(limit)),
        },
        None => pending.await.map_err(AttemptError::Operation),
    }
}

/// Sleeps for `delay`. Returns false if the abort signal fired first.
async fn wait(delay: Duration, signal: Option<&AbortSignal>) -> bool {
    match signal {
        Some(signal) => tokio::select! {
            biased;
            _ = signal.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        },
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shorthands
// ────────────────────────────────────────────────────────────────────────────

/// Retries `operation` under `policy` with no cancellation and no fallback.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<RetryOutcome<T>, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Retry::new(policy).run(operation).await
}

/// Retries `operation` under `policy`, then falls back to `fallback`.
pub async fn retry_with_fallback<T, E, F, Fut, G, GFut>(
    policy: &RetryPolicy,
    operation: F,
    fallback: G,
) -> Result<RetryOutcome<T>, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    G: FnOnce() -> GFut,
    GFut: Future<Output = Result<T, E>>,
{
    Retry::new(policy).run_with_fallback(operation, fallback).await
}
