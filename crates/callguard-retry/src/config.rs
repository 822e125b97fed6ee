use crate::events::RetryEvent;
use crate::policy::RetryPolicy;
use callguard_core::events::{EventListeners, FnListener};
use callguard_core::ErrorKind;
use std::collections::HashSet;
use std::time::Duration;

/// Builder for a [`RetryExecutor`](crate::RetryExecutor).
///
/// Obtained from [`RetryExecutor::builder`](crate::RetryExecutor::builder)
/// or from one of the preset constructors
/// ([`for_ai`](crate::RetryExecutor::for_ai),
/// [`for_network`](crate::RetryExecutor::for_network),
/// [`for_rate_limits`](crate::RetryExecutor::for_rate_limits)); every setter
/// overrides the preset's default for that field.
pub struct RetryExecutorBuilder {
    policy: RetryPolicy,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl Default for RetryExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutorBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - base_delay: 1s, max_delay: 30s, backoff_multiplier: 2.0
    /// - jitter_ratio: 0.2
    /// - retryable: {Network, Timeout}
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    pub(crate) fn with_policy(policy: RetryPolicy) -> Self {
        Self {
            policy,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the total attempt budget.
    ///
    /// This includes the initial attempt, so max_attempts=3 means
    /// 1 initial attempt + 2 retries.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    /// Sets the delay before the first retry.
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.policy.base_delay = base_delay;
        self
    }

    /// Sets the cap on the computed exponential delay.
    ///
    /// A server-declared retry-after hint may still exceed this cap; the
    /// hint is authoritative.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.policy.max_delay = max_delay;
        self
    }

    /// Sets the backoff growth factor.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.policy.backoff_multiplier = multiplier;
        self
    }

    /// Sets the symmetric jitter fraction (0.2 = ±20%).
    pub fn jitter_ratio(mut self, ratio: f64) -> Self {
        self.policy.jitter_ratio = ratio;
        self
    }

    /// Replaces the retryable allow-list.
    pub fn retryable<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ErrorKind>,
    {
        self.policy.retryable = kinds.into_iter().collect::<HashSet<_>>();
        self
    }

    /// Adds one kind to the retryable allow-list.
    pub fn retry_on(mut self, kind: ErrorKind) -> Self {
        self.policy.retryable.insert(kind);
        self
    }

    /// Sets the name for this executor instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each backoff sleep.
    ///
    /// # Callback Signature
    /// `Fn(u32, Duration)` - Called with the failed attempt number
    /// (1-indexed) and the delay before the next attempt.
    ///
    /// # Example
    /// ```rust,no_run
    /// use callguard_retry::RetryExecutor;
    ///
    /// let executor = RetryExecutor::for_ai()
    ///     .on_retry(|attempt, delay| {
    ///         println!("attempt {} failed, next in {:?}", attempt, delay);
    ///     })
    ///     .build();
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retrying { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when the operation succeeds.
    ///
    /// # Callback Signature
    /// `Fn(u32)` - Called with the total number of attempts made; 1 means
    /// success on the first try.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Succeeded { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when the attempt budget is spent.
    ///
    /// The original error of the final attempt is returned to the caller
    /// after this callback runs.
    ///
    /// # Callback Signature
    /// `Fn(u32)` - Called with the total number of attempts made.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when an error is not retried because
    /// its kind is outside the allow-list.
    ///
    /// # Callback Signature
    /// `Fn(ErrorKind)` - Called with the kind of the failing error.
    pub fn on_not_retried<F>(mut self, f: F) -> Self
    where
        F: Fn(ErrorKind) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::NotRetried { kind, .. } = event {
                f(*kind);
            }
        }));
        self
    }

    /// Builds the retry executor.
    ///
    /// # Panics
    ///
    /// Panics if the assembled policy is invalid (`max_attempts` of zero,
    /// `max_delay` below `base_delay`, multiplier below 1.0, or a jitter
    /// ratio outside `0.0..=1.0`).
    pub fn build(self) -> crate::RetryExecutor {
        self.policy.validate();
        crate::RetryExecutor::new(self.policy, self.event_listeners, self.name)
    }
}
