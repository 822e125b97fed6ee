use callguard_core::events::CallEvent;
use callguard_core::ErrorKind;
use std::time::{Duration, Instant};

/// Events emitted by the retry executor.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry is about to be scheduled after a failed attempt.
    Retrying {
        source: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    /// The operation succeeded, on the first try or after retries.
    Succeeded {
        source: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// The operation failed and the attempt budget is spent.
    Exhausted {
        source: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// An error occurred whose kind is not in the retryable allow-list.
    NotRetried {
        source: String,
        timestamp: Instant,
        kind: ErrorKind,
    },
}

impl CallEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retrying { .. } => "retrying",
            RetryEvent::Succeeded { .. } => "succeeded",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::NotRetried { .. } => "not_retried",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retrying { timestamp, .. }
            | RetryEvent::Succeeded { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::NotRetried { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RetryEvent::Retrying { source, .. }
            | RetryEvent::Succeeded { source, .. }
            | RetryEvent::Exhausted { source, .. }
            | RetryEvent::NotRetried { source, .. } => source,
        }
    }
}
