//! Attempt budgets and error classification.

use callguard_core::{ErrorKind, ProviderError};
use callguard_retry::RetryExecutor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counted_failures(
    failures: u32,
    error: ProviderError,
) -> (
    Arc<AtomicU32>,
    impl FnMut() -> std::future::Ready<Result<&'static str, ProviderError>>,
) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let op = move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            std::future::ready(Err(error.clone()))
        } else {
            std::future::ready(Ok("success"))
        }
    };
    (calls, op)
}

#[tokio::test(start_paused = true)]
async fn recovers_after_two_network_failures() {
    let executor = RetryExecutor::builder()
        .max_attempts(3)
        .base_delay(Duration::from_secs(1))
        .backoff_multiplier(2.0)
        .build();
    let (calls, op) = counted_failures(2, ProviderError::network("reset"));

    let result = executor.execute(op).await;
    assert_eq!(result.unwrap(), "success");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn authentication_is_invoked_exactly_once() {
    let executor = RetryExecutor::for_ai().build();
    let (calls, op) = counted_failures(10, ProviderError::authentication("expired key"));

    let error = executor.execute(op).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Authentication);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn validation_is_invoked_exactly_once() {
    let executor = RetryExecutor::for_ai().build();
    let (calls, op) = counted_failures(10, ProviderError::invalid_input("prompt too long"));

    let error = executor.execute(op).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidInput);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unclassified_errors_fail_fast_by_default() {
    let executor = RetryExecutor::builder().max_attempts(5).build();
    let (calls, op) = counted_failures(10, ProviderError::other("surprise"));

    let error = executor.execute(op).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Other);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unclassified_errors_retry_once_opted_in() {
    let executor = RetryExecutor::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(10))
        .retry_on(ErrorKind::Other)
        .build();
    let (calls, op) = counted_failures(2, ProviderError::other("surprise"));

    assert!(executor.execute(op).await.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_surfaces_the_original_error() {
    let executor = RetryExecutor::builder()
        .max_attempts(2)
        .base_delay(Duration::from_millis(10))
        .build();
    let (calls, op) = counted_failures(10, ProviderError::network("connection refused by host"));

    let error = executor.execute(op).await.unwrap_err();
    // The final error is the untouched original, message included.
    assert_eq!(error.to_string(), "network failure: connection refused by host");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn single_attempt_budget_never_retries() {
    let executor = RetryExecutor::builder().max_attempts(1).build();
    let (calls, op) = counted_failures(1, ProviderError::timeout("deadline"));

    assert!(executor.execute(op).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
