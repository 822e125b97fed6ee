//! The provider error taxonomy.
//!
//! Every outbound call governed by callguard fails with a [`ProviderError`].
//! The variants are a closed set: retry policy is decided by matching on
//! [`ErrorKind`], never by inspecting messages or downcasting, so adding a
//! variant forces every classification site to be revisited at compile time.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A failure from the wrapped backend, classified for admission and retry
/// decisions.
///
/// `Authentication` and `InvalidInput` indicate a defect retries cannot fix
/// and are treated as non-retryable by every built-in retry preset.
/// `RateLimited` may carry the server-declared minimum wait; when present it
/// is authoritative and is never shortened by locally computed backoff.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The backend rejected our credentials.
    #[error("authentication rejected: {message}")]
    Authentication {
        /// Human-readable detail from the backend.
        message: String,
    },

    /// The request payload failed the backend's validation.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Human-readable detail from the backend.
        message: String,
    },

    /// The request never completed at the transport level.
    #[error("network failure: {message}")]
    Network {
        /// Human-readable detail, typically from the HTTP client.
        message: String,
    },

    /// The backend did not answer in time.
    #[error("request timed out: {message}")]
    Timeout {
        /// Human-readable detail.
        message: String,
    },

    /// The backend shed the request for exceeding its quota.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Server-declared minimum wait before the next attempt, if the
        /// response carried one.
        retry_after: Option<Duration>,
        /// Human-readable detail.
        message: String,
    },

    /// Anything the taxonomy does not recognize. Non-retryable unless a
    /// policy opts in explicitly.
    #[error("{message}")]
    Other {
        /// Human-readable detail.
        message: String,
    },
}

impl ProviderError {
    /// An authentication failure.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// An input-validation failure.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// A transport-level failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// A timeout raised by the wrapped operation itself.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// A rate-limit rejection, optionally carrying the server's
    /// retry-after hint.
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            retry_after,
            message: message.into(),
        }
    }

    /// An unclassified failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// The classification kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Authentication { .. } => ErrorKind::Authentication,
            ProviderError::InvalidInput { .. } => ErrorKind::InvalidInput,
            ProviderError::Network { .. } => ErrorKind::Network,
            ProviderError::Timeout { .. } => ErrorKind::Timeout,
            ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
            ProviderError::Other { .. } => ErrorKind::Other,
        }
    }

    /// The server-declared minimum wait, for rate-limit failures that
    /// carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns `true` if this is a rate-limit rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }
}

/// Field-less mirror of the [`ProviderError`] variants.
///
/// Used wherever a set of kinds is needed, most importantly the retryable
/// allow-list on a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Authentication failures.
    Authentication,
    /// Input-validation failures.
    InvalidInput,
    /// Transport-level failures.
    Network,
    /// Timeouts.
    Timeout,
    /// Rate-limit rejections.
    RateLimited,
    /// Unclassified failures.
    Other,
}

impl ErrorKind {
    /// Stable lowercase label, used in metrics and tracing fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
