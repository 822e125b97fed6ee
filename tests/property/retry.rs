//! Property tests for the retry executor.
//!
//! Invariants tested:
//! - The operation is never invoked more than `max_attempts` times
//! - Non-retryable kinds are invoked exactly once
//! - A recovery inside the budget always returns the success value

use callguard_core::{ErrorKind, ProviderError};
use callguard_retry::RetryExecutor;
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("runtime")
}

fn non_retryable_error() -> impl Strategy<Value = ProviderError> {
    prop_oneof![
        Just(ProviderError::authentication("bad key")),
        Just(ProviderError::invalid_input("bad payload")),
        Just(ProviderError::other("unexpected")),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: invocations = min(failures + 1, max_attempts) for a
    /// retryable failure kind.
    #[test]
    fn invocations_never_exceed_the_budget(
        max_attempts in 1u32..=6,
        failures in 0u32..=10,
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = RetryExecutor::builder()
                .max_attempts(max_attempts)
                .base_delay(Duration::from_millis(10))
                .build();

            let calls = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&calls);
            let result = executor
                .execute(move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < failures {
                            Err(ProviderError::network("reset"))
                        } else {
                            Ok(())
                        }
                    }
                })
                .await;

            let expected = (failures + 1).min(max_attempts);
            prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
            prop_assert_eq!(result.is_ok(), failures < max_attempts);
            Ok(())
        })?;
    }

    /// Property: kinds outside the allow-list fail on the first attempt,
    /// whatever the configured budget.
    #[test]
    fn non_retryable_kinds_fail_on_first_attempt(
        max_attempts in 1u32..=6,
        error in non_retryable_error(),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = RetryExecutor::for_ai()
                .max_attempts(max_attempts)
                .base_delay(Duration::from_millis(10))
                .build();

            let calls = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&calls);
            let expected_kind = error.kind();
            let returned = executor
                .execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let error = error.clone();
                    async move { Err::<(), _>(error) }
                })
                .await
                .unwrap_err();

            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            prop_assert_eq!(returned.kind(), expected_kind);
            Ok(())
        })?;
    }

    /// Property: a retry-after hint always floors the observed delay,
    /// regardless of the configured backoff parameters.
    #[test]
    fn retry_after_is_always_honored(
        base_ms in 1u64..=2_000,
        hint_secs in 1u64..=20,
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = RetryExecutor::for_ai()
                .base_delay(Duration::from_millis(base_ms))
                .max_delay(Duration::from_secs(30))
                .build();

            let calls = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&calls);
            let start = tokio::time::Instant::now();
            executor
                .execute(move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Err(ProviderError::rate_limited(
                                "quota",
                                Some(Duration::from_secs(hint_secs)),
                            ))
                        } else {
                            Ok(())
                        }
                    }
                })
                .await
                .unwrap();

            prop_assert!(start.elapsed() >= Duration::from_secs(hint_secs));
            Ok(())
        })?;
    }

    /// Property: the retryable allow-list alone decides classification.
    #[test]
    fn allow_list_is_authoritative(retry_rate_limits in proptest::bool::ANY) {
        let rt = paused_runtime();
        rt.block_on(async {
            let mut builder = RetryExecutor::builder()
                .max_attempts(2)
                .base_delay(Duration::from_millis(10))
                .retryable([ErrorKind::Network]);
            if retry_rate_limits {
                builder = builder.retry_on(ErrorKind::RateLimited);
            }
            let executor = builder.build();

            let calls = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&calls);
            let _ = executor
                .execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(ProviderError::rate_limited("quota", None)) }
                })
                .await;

            let expected = if retry_rate_limits { 2 } else { 1 };
            prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
            Ok(())
        })?;
    }
}
