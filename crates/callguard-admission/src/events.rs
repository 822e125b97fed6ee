use callguard_core::events::CallEvent;
use std::time::{Duration, Instant};

/// Events emitted by the admission controller.
#[derive(Debug, Clone)]
pub enum AdmissionEvent {
    /// A caller was admitted without queueing.
    Admitted {
        source: String,
        timestamp: Instant,
        waited: Duration,
    },
    /// A caller found the window full and joined the wait queue.
    Queued {
        source: String,
        timestamp: Instant,
        depth: usize,
    },
    /// A queued caller was released in FIFO order.
    Released {
        source: String,
        timestamp: Instant,
        waited: Duration,
    },
}

impl CallEvent for AdmissionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AdmissionEvent::Admitted { .. } => "admitted",
            AdmissionEvent::Queued { .. } => "queued",
            AdmissionEvent::Released { .. } => "released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            AdmissionEvent::Admitted { timestamp, .. }
            | AdmissionEvent::Queued { timestamp, .. }
            | AdmissionEvent::Released { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            AdmissionEvent::Admitted { source, .. }
            | AdmissionEvent::Queued { source, .. }
            | AdmissionEvent::Released { source, .. } => source,
        }
    }
}
