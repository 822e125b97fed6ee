//! Sliding-window admission control for outbound calls.
//!
//! An [`AdmissionController`] enforces an N-successful-calls-per-60-seconds
//! budget. Bursts beyond the budget are absorbed by a FIFO wait queue, never
//! rejected: callers suspend in [`AdmissionController::await_admission`]
//! until the window has room for them.
//!
//! Quota accounting reflects *successful throughput*: a call records against
//! the window only after it completes successfully, so a failing backend
//! does not eat the budget. The flip side, documented rather than hidden, is
//! that attempted throughput can transiently exceed the configured ceiling
//! while calls keep failing.
//!
//! # Examples
//!
//! ```
//! use callguard_admission::AdmissionConfig;
//!
//! # async fn example() -> Result<(), std::io::Error> {
//! let controller = AdmissionConfig::builder()
//!     .requests_per_minute(30)
//!     .name("analysis-api")
//!     .on_queued(|depth| println!("{} callers waiting", depth))
//!     .build();
//!
//! let answer = controller
//!     .run(|| async { Ok::<_, std::io::Error>("analyzed") })
//!     .await?;
//! assert_eq!(answer, "analyzed");
//! # Ok(())
//! # }
//! ```

mod config;
mod events;
mod window;

pub use config::{AdmissionConfig, AdmissionConfigBuilder, AdmissionConfigUpdate};
pub use events::AdmissionEvent;

use callguard_core::events::EventListeners;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use window::WindowState;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

/// Point-in-time view of the admission window, computed on demand.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionStatus {
    /// Successful calls recorded inside the trailing 60-second window.
    pub requests_in_window: u32,
    /// Remaining budget before new successes would exceed the window.
    pub requests_remaining: u32,
    /// When the oldest record leaves the window; now if the window is empty.
    pub reset_at: Instant,
}

struct Shared {
    state: Mutex<WindowState>,
    /// Wakes the drain loop early when a permit is dropped unrecorded or the
    /// configuration changes.
    slot_freed: Notify,
    event_listeners: EventListeners<AdmissionEvent>,
    name: String,
}

/// Sliding-window admission controller with a FIFO wait queue.
///
/// Cloning is cheap and clones share the same window, queue, and
/// configuration. One controller instance is meant to be owned by one
/// resilient wrapper; independent instances do not share quota.
#[derive(Clone)]
pub struct AdmissionController {
    shared: Arc<Shared>,
}

impl AdmissionController {
    /// Creates a new builder for configuring an admission controller.
    pub fn builder() -> AdmissionConfigBuilder {
        AdmissionConfigBuilder::new()
    }

    pub(crate) fn new(config: AdmissionConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(WindowState::new(config.requests_per_minute)),
                slot_freed: Notify::new(),
                event_listeners: config.event_listeners,
                name: config.name,
            }),
        }
    }

    /// Returns `true` if the trailing window currently has room for another
    /// successful call.
    ///
    /// The only side effect is pruning expired records. Note that a `true`
    /// answer is advisory under concurrency: in-flight admitted calls that
    /// have not settled yet do not show up here.
    pub fn can_admit(&self) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        state.prune(Instant::now());
        state.window_total() < state.requests_per_minute
    }

    /// Suspends until the window has room, then returns a permit occupying
    /// one slot.
    ///
    /// Resolves immediately when capacity is available; otherwise the caller
    /// joins a FIFO queue and a single drain task releases waiters strictly
    /// in arrival order, never before capacity exists. Call
    /// [`AdmissionPermit::record`] once the permitted operation succeeded;
    /// dropping the permit instead frees the slot without recording.
    pub async fn await_admission(&self) -> AdmissionPermit {
        let start = Instant::now();
        loop {
            let rx = {
                let mut state = self.shared.state.lock().unwrap();
                state.prune(Instant::now());
                // Queued callers go first: a newcomer may only take the fast
                // path when nobody is already waiting.
                if state.queue.is_empty() && state.gate_open() {
                    state.in_flight += 1;
                    drop(state);
                    let waited = start.elapsed();
                    self.emit_admitted(waited);
                    return self.permit(waited);
                }

                let (tx, rx) = oneshot::channel();
                state.queue.push_back(tx);
                let depth = state.queue.len();
                self.ensure_drain(&mut state);
                drop(state);
                self.emit_queued(depth);
                rx
            };

            match rx.await {
                Ok(()) => {
                    // The drain transferred our slot before waking us.
                    let waited = start.elapsed();
                    self.emit_released(waited);
                    return self.permit(waited);
                }
                // A reset dropped the queue; re-enter admission from the gate.
                Err(_) => continue,
            }
        }
    }

    /// Runs `op` under admission control.
    ///
    /// On success the call is recorded against the window; on failure the
    /// slot is freed without recording and the error is returned untouched.
    pub async fn run<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.await_admission().await;
        match op().await {
            Ok(value) => {
                permit.record();
                Ok(value)
            }
            Err(error) => Err(error),
        }
    }

    /// Returns a snapshot of the window.
    pub fn status(&self) -> AdmissionStatus {
        let mut state = self.shared.state.lock().unwrap();
        let now = Instant::now();
        state.prune(now);
        let in_window = state.window_total();
        AdmissionStatus {
            requests_in_window: in_window,
            requests_remaining: state.requests_per_minute.saturating_sub(in_window),
            reset_at: state.reset_at(now),
        }
    }

    /// Clears the recorded history and the wait queue.
    ///
    /// Queued callers are not abandoned: each re-enters admission from the
    /// gate, which is usually open right after the history is cleared. Test
    /// isolation only; never called in normal operation.
    pub fn reset(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.window.clear();
        state.queue.clear();
        drop(state);
        self.shared.slot_freed.notify_one();
    }

    /// Applies a partial configuration update, effective immediately.
    ///
    /// # Panics
    ///
    /// Panics if the update sets `requests_per_minute` to zero.
    pub fn update(&self, update: AdmissionConfigUpdate) {
        if let Some(limit) = update.requests_per_minute {
            assert!(limit >= 1, "requests_per_minute must be at least 1");
            let mut state = self.shared.state.lock().unwrap();
            state.requests_per_minute = limit;
            drop(state);
            // A raised budget may unblock queued callers before the next poll.
            self.shared.slot_freed.notify_one();
        }
    }

    /// The configured per-window budget.
    pub fn requests_per_minute(&self) -> u32 {
        self.shared.state.lock().unwrap().requests_per_minute
    }

    /// The configured name of this controller instance.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    fn permit(&self, waited: Duration) -> AdmissionPermit {
        AdmissionPermit {
            shared: Arc::clone(&self.shared),
            waited,
            settled: false,
        }
    }

    fn ensure_drain(&self, state: &mut WindowState) {
        if !state.draining {
            state.draining = true;
            tokio::spawn(drain(Arc::clone(&self.shared)));
        }
    }

    fn emit_admitted(&self, waited: Duration) {
        let event = AdmissionEvent::Admitted {
            source: self.shared.name.clone(),
            timestamp: std::time::Instant::now(),
            waited,
        };
        self.shared.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            counter!("admission_granted_total", "controller" => self.shared.name.clone())
                .increment(1);
            histogram!("admission_wait_seconds", "controller" => self.shared.name.clone())
                .record(waited.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(controller = %self.shared.name, ?waited, "admitted");
    }

    fn emit_queued(&self, depth: usize) {
        let event = AdmissionEvent::Queued {
            source: self.shared.name.clone(),
            timestamp: std::time::Instant::now(),
            depth,
        };
        self.shared.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        counter!("admission_queued_total", "controller" => self.shared.name.clone()).increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(controller = %self.shared.name, depth, "window full, caller queued");
    }

    fn emit_released(&self, waited: Duration) {
        let event = AdmissionEvent::Released {
            source: self.shared.name.clone(),
            timestamp: std::time::Instant::now(),
            waited,
        };
        self.shared.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            counter!("admission_granted_total", "controller" => self.shared.name.clone())
                .increment(1);
            histogram!("admission_wait_seconds", "controller" => self.shared.name.clone())
                .record(waited.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(controller = %self.shared.name, ?waited, "queued caller released");
    }
}

/// One occupied admission slot.
///
/// Holding a permit means the caller was admitted and the slot is accounted
/// against the gate. [`record`](AdmissionPermit::record) converts it into a
/// window record after a successful call; dropping it (failure, abandoned
/// future) frees the slot without touching the window.
pub struct AdmissionPermit {
    shared: Arc<Shared>,
    waited: Duration,
    settled: bool,
}

impl AdmissionPermit {
    /// How long the caller waited for admission.
    pub fn waited(&self) -> Duration {
        self.waited
    }

    /// Records the permitted call as a success in the trailing window.
    pub fn record(mut self) {
        let mut state = self.shared.state.lock().unwrap();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.record(Instant::now());
        drop(state);
        self.settled = true;
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Failed or abandoned call: free the slot without recording it.
        let Ok(mut state) = self.shared.state.lock() else {
            return;
        };
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.shared.slot_freed.notify_one();
    }
}

/// Queue-drain loop, at most one per controller (single-flight).
///
/// Releases the oldest waiter whenever the gate opens, otherwise sleeps
/// `min(5s, max(1s, reset_at - now))` and rechecks. Waiters are handed their
/// slot before being woken, so no later arrival can overtake them and no one
/// is released before capacity exists.
async fn drain(shared: Arc<Shared>) {
    loop {
        let delay = {
            let mut state = shared.state.lock().unwrap();
            let now = Instant::now();
            state.prune(now);

            if state.queue.is_empty() {
                state.draining = false;
                return;
            }

            if state.gate_open() {
                if let Some(tx) = state.queue.pop_front() {
                    state.in_flight += 1;
                    if tx.send(()).is_err() {
                        // The waiter's future was dropped; return its slot.
                        state.in_flight -= 1;
                    }
                }
                continue;
            }

            state.poll_delay(now)
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shared.slot_freed.notified() => {}
        }
    }
}
