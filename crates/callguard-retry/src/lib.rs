//! Classified-error retry for outbound calls.
//!
//! A [`RetryExecutor`] runs a fallible async operation with a bounded
//! attempt budget. Whether a failure is worth retrying is decided by an
//! allow-list over [`ErrorKind`], never by string matching; backoff grows
//! exponentially with symmetric jitter, and a rate-limit failure carrying a
//! server-declared retry-after hint is never retried sooner than the hint.
//!
//! After the budget is spent, or on the first non-retryable failure, the
//! *original* error is returned unmodified so callers can still match on
//! its kind.
//!
//! # Examples
//!
//! ```
//! use callguard_core::ProviderError;
//! use callguard_retry::RetryExecutor;
//!
//! # async fn example() -> Result<(), ProviderError> {
//! let executor = RetryExecutor::for_ai().name("listing-analysis").build();
//!
//! let analysis = executor
//!     .execute(|| async { Ok::<_, ProviderError>("verdict") })
//!     .await?;
//! assert_eq!(analysis, "verdict");
//! # Ok(())
//! # }
//! ```

mod config;
mod events;
mod policy;

pub use config::RetryExecutorBuilder;
pub use events::RetryEvent;
pub use policy::{RetryPolicy, RetryPolicyUpdate};

use callguard_core::events::EventListeners;
use callguard_core::{ErrorKind, ProviderError};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

/// What the per-call retry observer sees before each backoff sleep.
///
/// Observers are for logging only; returning from the callback never
/// influences whether or when the retry happens.
#[derive(Debug, Clone)]
pub struct RetryNotice {
    /// The attempt that just failed (1-indexed).
    pub attempt: u32,
    /// The error that attempt produced.
    pub error: ProviderError,
    /// How long the executor will sleep before the next attempt.
    pub next_delay: Duration,
}

struct Inner {
    policy: Mutex<RetryPolicy>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

/// Bounded-attempt retry executor over the provider error taxonomy.
///
/// Cloning is cheap and clones share the same policy, so a configuration
/// update through any clone is visible to calls in flight from the next
/// attempt on.
#[derive(Clone)]
pub struct RetryExecutor {
    inner: Arc<Inner>,
}

impl RetryExecutor {
    /// Creates a new builder with the default policy.
    pub fn builder() -> RetryExecutorBuilder {
        RetryExecutorBuilder::new()
    }

    /// Preset for calls against an AI backend: 3 attempts, retrying
    /// network, timeout, and rate-limit failures.
    pub fn for_ai() -> RetryExecutorBuilder {
        RetryExecutorBuilder::with_policy(RetryPolicy {
            max_attempts: 3,
            retryable: [ErrorKind::Network, ErrorKind::Timeout, ErrorKind::RateLimited]
                .into_iter()
                .collect(),
            ..RetryPolicy::default()
        })
    }

    /// Preset for flaky transports: 5 attempts, retrying network and
    /// timeout failures only.
    pub fn for_network() -> RetryExecutorBuilder {
        RetryExecutorBuilder::with_policy(RetryPolicy {
            max_attempts: 5,
            retryable: [ErrorKind::Network, ErrorKind::Timeout].into_iter().collect(),
            ..RetryPolicy::default()
        })
    }

    /// Preset for quota-constrained backends: 2 attempts, a 5-second base
    /// delay, retrying rate-limit failures only.
    pub fn for_rate_limits() -> RetryExecutorBuilder {
        RetryExecutorBuilder::with_policy(RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_secs(5),
            retryable: [ErrorKind::RateLimited].into_iter().collect(),
            ..RetryPolicy::default()
        })
    }

    pub(crate) fn new(
        policy: RetryPolicy,
        event_listeners: EventListeners<RetryEvent>,
        name: String,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy: Mutex::new(policy),
                event_listeners,
                name,
            }),
        }
    }

    /// Executes `op` under this executor's policy.
    pub async fn execute<F, Fut, T>(&self, op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.execute_observed(op, |_| {}).await
    }

    /// Executes `op`, reporting each scheduled retry to `observer`.
    ///
    /// The observer exists for caller-side logging of intermediate
    /// attempts; it cannot veto or reshape the retry.
    pub async fn execute_observed<F, Fut, T, O>(
        &self,
        mut op: F,
        observer: O,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
        O: Fn(&RetryNotice),
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Ok(value) => {
                    self.emit_succeeded(attempt);
                    return Ok(value);
                }
                Err(error) => {
                    let policy = self.inner.policy.lock().unwrap().clone();
                    let kind = error.kind();

                    if !policy.is_retryable(kind) {
                        self.emit_not_retried(kind);
                        return Err(error);
                    }
                    if attempt >= policy.max_attempts {
                        self.emit_exhausted(attempt);
                        return Err(error);
                    }

                    let delay = policy.next_delay(attempt, &error);
                    observer(&RetryNotice {
                        attempt,
                        error: error.clone(),
                        next_delay: delay,
                    });
                    self.emit_retrying(attempt, delay, kind);

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Returns a snapshot of the current policy.
    pub fn config(&self) -> RetryPolicy {
        self.inner.policy.lock().unwrap().clone()
    }

    /// Applies a partial policy update, effective from the next attempt.
    ///
    /// # Panics
    ///
    /// Panics if the merged policy is invalid.
    pub fn update(&self, update: RetryPolicyUpdate) {
        let mut policy = self.inner.policy.lock().unwrap();
        update.merge_into(&mut policy);
    }

    /// The configured name of this executor instance.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn emit_retrying(&self, attempt: u32, delay: Duration, kind: ErrorKind) {
        let event = RetryEvent::Retrying {
            source: self.inner.name.clone(),
            timestamp: std::time::Instant::now(),
            attempt,
            delay,
        };
        self.inner.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            counter!(
                "retry_attempts_total",
                "executor" => self.inner.name.clone(),
                "kind" => kind.as_str()
            )
            .increment(1);
            histogram!("retry_backoff_seconds", "executor" => self.inner.name.clone())
                .record(delay.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(
            executor = %self.inner.name,
            attempt,
            kind = %kind,
            ?delay,
            "attempt failed, retrying"
        );

        #[cfg(not(any(feature = "metrics", feature = "tracing")))]
        let _ = kind;
    }

    fn emit_succeeded(&self, attempts: u32) {
        let event = RetryEvent::Succeeded {
            source: self.inner.name.clone(),
            timestamp: std::time::Instant::now(),
            attempts,
        };
        self.inner.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        counter!("retry_success_total", "executor" => self.inner.name.clone()).increment(1);

        #[cfg(feature = "tracing")]
        if attempts > 1 {
            tracing::debug!(executor = %self.inner.name, attempts, "succeeded after retries");
        }
    }

    fn emit_exhausted(&self, attempts: u32) {
        let event = RetryEvent::Exhausted {
            source: self.inner.name.clone(),
            timestamp: std::time::Instant::now(),
            attempts,
        };
        self.inner.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        counter!("retry_exhausted_total", "executor" => self.inner.name.clone()).increment(1);

        #[cfg(feature = "tracing")]
        tracing::warn!(executor = %self.inner.name, attempts, "attempt budget spent");
    }

    fn emit_not_retried(&self, kind: ErrorKind) {
        let event = RetryEvent::NotRetried {
            source: self.inner.name.clone(),
            timestamp: std::time::Instant::now(),
            kind,
        };
        self.inner.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        counter!(
            "retry_skipped_total",
            "executor" => self.inner.name.clone(),
            "kind" => kind.as_str()
        )
        .increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(executor = %self.inner.name, kind = %kind, "error not retryable");
    }
}
