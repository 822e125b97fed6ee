use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Length of the trailing accounting window.
pub(crate) const WINDOW: Duration = Duration::from_secs(60);

/// Bounds for the drain loop's polling sleep.
pub(crate) const POLL_FLOOR: Duration = Duration::from_secs(1);
pub(crate) const POLL_CEILING: Duration = Duration::from_secs(5);

/// One successful admission inside the trailing window.
///
/// Created when a permitted call completes successfully, pruned once older
/// than the window, never mutated in between.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AdmissionRecord {
    pub(crate) at: Instant,
    pub(crate) count: u32,
}

/// Internal state for the admission controller.
///
/// Guarded by a mutex in the controller; none of these methods block or
/// await.
#[derive(Debug)]
pub(crate) struct WindowState {
    /// Successful-call budget per trailing window.
    pub(crate) requests_per_minute: u32,
    /// Sliding log of successful admissions, oldest first.
    pub(crate) window: VecDeque<AdmissionRecord>,
    /// Permits handed out but not yet settled (recorded or dropped).
    pub(crate) in_flight: u32,
    /// Suspended callers, oldest first.
    pub(crate) queue: VecDeque<oneshot::Sender<()>>,
    /// Single-flight flag for the queue-drain task.
    pub(crate) draining: bool,
}

impl WindowState {
    pub(crate) fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            window: VecDeque::new(),
            in_flight: 0,
            queue: VecDeque::new(),
            draining: false,
        }
    }

    /// Drops records that have aged out of the trailing window.
    pub(crate) fn prune(&mut self, now: Instant) {
        while let Some(front) = self.window.front() {
            if front.at + WINDOW <= now {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Successful calls currently inside the window.
    pub(crate) fn window_total(&self) -> u32 {
        self.window.iter().map(|record| record.count).sum()
    }

    /// Whether a new caller may be admitted right now.
    ///
    /// Counts unsettled permits alongside window records so a burst of
    /// concurrent callers cannot all pass before the first one records.
    pub(crate) fn gate_open(&self) -> bool {
        self.window_total() + self.in_flight < self.requests_per_minute
    }

    /// When the oldest record leaves the window; `now` if the window is
    /// empty.
    pub(crate) fn reset_at(&self, now: Instant) -> Instant {
        self.window
            .front()
            .map(|record| record.at + WINDOW)
            .unwrap_or(now)
    }

    /// Sleep bound for the drain loop: `min(5s, max(1s, reset_at - now))`.
    pub(crate) fn poll_delay(&self, now: Instant) -> Duration {
        self.reset_at(now)
            .saturating_duration_since(now)
            .clamp(POLL_FLOOR, POLL_CEILING)
    }

    /// Appends a record for one successfully completed call.
    pub(crate) fn record(&mut self, now: Instant) {
        self.window.push_back(AdmissionRecord { at: now, count: 1 });
    }
}
