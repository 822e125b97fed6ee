use crate::events::AdmissionEvent;
use callguard_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the admission controller.
pub struct AdmissionConfig {
    pub(crate) requests_per_minute: u32,
    pub(crate) event_listeners: EventListeners<AdmissionEvent>,
    pub(crate) name: String,
}

impl AdmissionConfig {
    /// Creates a new builder for configuring an admission controller.
    pub fn builder() -> AdmissionConfigBuilder {
        AdmissionConfigBuilder::new()
    }
}

/// Builder for [`AdmissionConfig`].
pub struct AdmissionConfigBuilder {
    requests_per_minute: u32,
    event_listeners: EventListeners<AdmissionEvent>,
    name: String,
}

impl Default for AdmissionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - requests_per_minute: 60
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            requests_per_minute: 60,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets how many successful calls may complete inside any trailing
    /// 60-second window.
    ///
    /// Callers beyond this budget are queued, never rejected.
    pub fn requests_per_minute(mut self, limit: u32) -> Self {
        self.requests_per_minute = limit;
        self
    }

    /// Sets the name for this controller instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for callers admitted without queueing.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with the time the caller spent inside
    /// `await_admission` (close to zero on this path).
    pub fn on_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let AdmissionEvent::Admitted { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Registers a callback for callers that had to join the wait queue.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the queue depth after the caller joined
    /// (1 means it is the only waiter).
    ///
    /// # Example
    /// ```rust,no_run
    /// use callguard_admission::AdmissionConfig;
    ///
    /// let controller = AdmissionConfig::builder()
    ///     .requests_per_minute(30)
    ///     .on_queued(|depth| {
    ///         if depth > 10 {
    ///             eprintln!("admission backlog is {} deep", depth);
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_queued<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let AdmissionEvent::Queued { depth, .. } = event {
                f(*depth);
            }
        }));
        self
    }

    /// Registers a callback for queued callers released in FIFO order.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with the total time the caller waited for
    /// admission.
    pub fn on_released<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let AdmissionEvent::Released { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Builds the admission controller.
    ///
    /// # Panics
    ///
    /// Panics if `requests_per_minute` is zero.
    pub fn build(self) -> crate::AdmissionController {
        assert!(
            self.requests_per_minute >= 1,
            "requests_per_minute must be at least 1"
        );

        let config = AdmissionConfig {
            requests_per_minute: self.requests_per_minute,
            event_listeners: self.event_listeners,
            name: self.name,
        };

        crate::AdmissionController::new(config)
    }
}

/// A partial update applied over an existing configuration.
///
/// Fields left as `None` keep their current value, so
/// `controller.update(AdmissionConfigUpdate::default())` is a no-op.
#[derive(Debug, Clone, Default)]
pub struct AdmissionConfigUpdate {
    /// New window budget, effective immediately.
    pub requests_per_minute: Option<u32>,
}
