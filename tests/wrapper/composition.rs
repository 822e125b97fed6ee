//! Retry-around-admission ordering and error transparency.

use callguard::ResilientCall;
use callguard_admission::AdmissionConfig;
use callguard_core::{ErrorKind, ProviderError};
use callguard_retry::RetryExecutor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn wrapper(limit: u32) -> ResilientCall {
    ResilientCall::new(
        AdmissionConfig::builder().requests_per_minute(limit).build(),
        RetryExecutor::for_ai()
            .base_delay(Duration::from_millis(100))
            .jitter_ratio(0.0)
            .build(),
    )
}

#[tokio::test(start_paused = true)]
async fn every_attempt_passes_the_admission_gate() {
    let call = wrapper(1);

    // Occupy the whole window with a direct success.
    call.admission()
        .run(|| async { Ok::<_, ProviderError>(()) })
        .await
        .unwrap();

    let start = Instant::now();
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&attempts);

    call.execute(move || {
        let sink = Arc::clone(&sink);
        async move {
            let mut attempts = sink.lock().unwrap();
            attempts.push(Instant::now());
            if attempts.len() == 1 {
                Err(ProviderError::network("reset"))
            } else {
                Ok(())
            }
        }
    })
    .await
    .unwrap();

    let attempts = attempts.lock().unwrap();
    assert_eq!(attempts.len(), 2);
    // Even the FIRST attempt waited out the occupied window: admission is
    // inside the retry loop, not in front of it.
    assert!(attempts[0] - start >= Duration::from_secs(55));
    assert!(attempts[1] > attempts[0]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_wrapped_calls_share_the_quota() {
    let call = wrapper(2);
    let start = Instant::now();
    let immediate = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let call = call.clone();
        let immediate = Arc::clone(&immediate);
        handles.push(tokio::spawn(async move {
            call.execute(|| async { Ok::<_, ProviderError>(()) })
                .await
                .unwrap();
            if start.elapsed() < Duration::from_secs(1) {
                immediate.fetch_add(1, Ordering::SeqCst);
            }
        }));
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(immediate.load(Ordering::SeqCst), 2);
    assert_eq!(call.admission_status().requests_in_window, 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_rate_limit_error_keeps_its_hint() {
    let call = ResilientCall::new(
        AdmissionConfig::builder().requests_per_minute(10).build(),
        RetryExecutor::for_rate_limits().jitter_ratio(0.0).build(),
    );

    let error = call
        .execute(|| async {
            Err::<(), _>(ProviderError::rate_limited(
                "quota exceeded",
                Some(Duration::from_secs(3)),
            ))
        })
        .await
        .unwrap_err();

    // The wrapper returned the innermost error untouched.
    assert_eq!(error.kind(), ErrorKind::RateLimited);
    assert_eq!(error.retry_after(), Some(Duration::from_secs(3)));
    assert_eq!(error.to_string(), "rate limited: quota exceeded");
}

#[tokio::test(start_paused = true)]
async fn non_retryable_failures_spend_no_quota_and_no_time() {
    let call = wrapper(5);
    let start = Instant::now();

    let error = call
        .execute(|| async { Err::<(), _>(ProviderError::invalid_input("empty prompt")) })
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InvalidInput);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(call.admission_status().requests_in_window, 0);
}

#[tokio::test(start_paused = true)]
async fn observer_reports_attempts_through_the_composition() {
    let call = wrapper(5);
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notices);

    call.execute_observed(
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ProviderError::timeout("deadline"))
                } else {
                    Ok(())
                }
            }
        },
        move |notice| {
            sink.lock().unwrap().push((notice.attempt, notice.error.kind()));
        },
    )
    .await
    .unwrap();

    assert_eq!(*notices.lock().unwrap(), vec![(1, ErrorKind::Timeout)]);
}

#[tokio::test(start_paused = true)]
async fn introspection_is_read_only_and_current() {
    let call = wrapper(3);
    assert_eq!(call.admission_status().requests_remaining, 3);
    assert_eq!(call.retry_config().max_attempts, 3);

    call.execute(|| async { Ok::<_, ProviderError>(()) })
        .await
        .unwrap();
    assert_eq!(call.admission_status().requests_remaining, 2);
}
