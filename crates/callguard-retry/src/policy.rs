use callguard_core::{ErrorKind, ProviderError};
use std::collections::HashSet;
use std::time::Duration;

/// Retry policy: attempt budget, backoff shape, and the retryable
/// allow-list.
///
/// Classification is an allow-list over [`ErrorKind`]: an error is retried
/// iff its kind is present in `retryable`. Kinds absent from the set,
/// including [`ErrorKind::Other`], fail fast, so failures of unanticipated
/// shapes surface immediately instead of being silently absorbed.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempt budget: the first try plus all retries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap on the computed exponential delay.
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
    /// Symmetric jitter as a fraction of the computed delay (0.2 = ±20%).
    pub jitter_ratio: f64,
    /// Error kinds worth retrying.
    pub retryable: HashSet<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_ratio: 0.2,
            retryable: HashSet::from([ErrorKind::Network, ErrorKind::Timeout]),
        }
    }
}

impl RetryPolicy {
    pub(crate) fn validate(&self) {
        assert!(self.max_attempts >= 1, "max_attempts must be at least 1");
        assert!(
            self.max_delay >= self.base_delay,
            "max_delay must not be smaller than base_delay"
        );
        assert!(
            self.backoff_multiplier >= 1.0,
            "backoff_multiplier must be at least 1.0"
        );
        assert!(
            (0.0..=1.0).contains(&self.jitter_ratio),
            "jitter_ratio must be within 0.0..=1.0"
        );
    }

    /// Returns `true` if errors of `kind` are retried under this policy.
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// The un-jittered exponential delay after the given attempt (1-based).
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.powi(exponent);
        let raw = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(raw.min(self.max_delay.as_secs_f64()))
    }

    /// The delay to sleep after a failed attempt: exponential backoff,
    /// perturbed by symmetric jitter, floored by the server's retry-after
    /// hint when the error carries one. The hint is authoritative and never
    /// shortened.
    pub(crate) fn next_delay(&self, attempt: u32, error: &ProviderError) -> Duration {
        let jittered = self.jitter(self.backoff(attempt));
        match error.retry_after() {
            Some(floor) => jittered.max(floor),
            None => jittered,
        }
    }

    fn jitter(&self, delay: Duration) -> Duration {
        if self.jitter_ratio == 0.0 || delay.is_zero() {
            return delay;
        }
        use rand::Rng;
        let spread = delay.as_secs_f64() * self.jitter_ratio;
        let low = (delay.as_secs_f64() - spread).max(0.0);
        let high = delay.as_secs_f64() + spread;
        Duration::from_secs_f64(rand::rng().random_range(low..=high))
    }
}

/// A partial update merged over an existing policy.
///
/// Fields left as `None` keep their current value, so an empty update is a
/// no-op.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicyUpdate {
    pub max_attempts: Option<u32>,
    pub base_delay: Option<Duration>,
    pub max_delay: Option<Duration>,
    pub backoff_multiplier: Option<f64>,
    pub jitter_ratio: Option<f64>,
    pub retryable: Option<HashSet<ErrorKind>>,
}

impl RetryPolicyUpdate {
    pub(crate) fn merge_into(self, policy: &mut RetryPolicy) {
        if let Some(max_attempts) = self.max_attempts {
            policy.max_attempts = max_attempts;
        }
        if let Some(base_delay) = self.base_delay {
            policy.base_delay = base_delay;
        }
        if let Some(max_delay) = self.max_delay {
            policy.max_delay = max_delay;
        }
        if let Some(backoff_multiplier) = self.backoff_multiplier {
            policy.backoff_multiplier = backoff_multiplier;
        }
        if let Some(jitter_ratio) = self.jitter_ratio {
            policy.jitter_ratio = jitter_ratio;
        }
        if let Some(retryable) = self.retryable {
            policy.retryable = retryable;
        }
        policy.validate();
    }
}
