use callguard_admission::{AdmissionController, AdmissionStatus};
use callguard_core::ProviderError;
use callguard_retry::{RetryExecutor, RetryNotice, RetryPolicy};
use std::future::Future;

/// Composition root: admission control inside, retry outside.
///
/// Every call made through [`execute`](ResilientCall::execute) runs as
/// "retry around admission": each attempt re-enters the admission gate, so
/// retries cannot bypass the quota and turn into a retry storm. The wrapper
/// holds no state of its own beyond the two composed components, and it
/// never wraps or rewrites errors; whatever the innermost layer produced is
/// what the caller sees.
///
/// Both components are injected at construction and live for the wrapper's
/// lifetime. Build one wrapper per distinct target + configuration;
/// separate wrappers do not share quota.
#[derive(Clone)]
pub struct ResilientCall {
    admission: AdmissionController,
    retry: RetryExecutor,
}

impl ResilientCall {
    /// Composes an already-built admission controller and retry executor.
    pub fn new(admission: AdmissionController, retry: RetryExecutor) -> Self {
        Self { admission, retry }
    }

    /// Executes `op` under admission control with retries.
    ///
    /// `op` must be re-invocable: it is called once per attempt, and each
    /// attempt first waits for admission. A successful attempt records
    /// against the admission window; failed attempts never do.
    pub async fn execute<F, Fut, T>(&self, op: F) -> Result<T, ProviderError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.retry.execute(|| self.admission.run(&op)).await
    }

    /// Like [`execute`](Self::execute), reporting each scheduled retry to
    /// `observer`.
    pub async fn execute_observed<F, Fut, T, O>(
        &self,
        op: F,
        observer: O,
    ) -> Result<T, ProviderError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
        O: Fn(&RetryNotice),
    {
        self.retry
            .execute_observed(|| self.admission.run(&op), observer)
            .await
    }

    /// Snapshot of the admission window.
    pub fn admission_status(&self) -> AdmissionStatus {
        self.admission.status()
    }

    /// Snapshot of the retry policy.
    pub fn retry_config(&self) -> RetryPolicy {
        self.retry.config()
    }

    /// The composed admission controller.
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// The composed retry executor.
    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }
}
