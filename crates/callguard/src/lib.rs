//! Admission-controlled, retrying call wrapper for rate-limited backends.
//!
//! `callguard` composes two patterns around an arbitrary outbound async
//! operation, leaving its input/output contract untouched:
//!
//! - **Admission control** ([`callguard_admission`]): an
//!   N-successful-calls-per-minute sliding window that queues excess demand
//!   FIFO instead of rejecting it.
//! - **Classified retry** ([`callguard_retry`]): bounded attempts decided by
//!   an allow-list over the provider error taxonomy, with exponential
//!   backoff, jitter, and server-declared retry-after floors.
//!
//! The composition order is fixed: retry on the outside, admission on the
//! inside, so **every retry attempt re-enters the admission gate**. A
//! backend that answers "rate limited" cannot be hammered by retries that
//! skip the queue.
//!
//! # Example
//!
//! ```
//! use callguard::ResilientCall;
//! use callguard_admission::AdmissionConfig;
//! use callguard_core::ProviderError;
//! use callguard_retry::RetryExecutor;
//!
//! # async fn example() -> Result<(), ProviderError> {
//! let call = ResilientCall::new(
//!     AdmissionConfig::builder()
//!         .requests_per_minute(30)
//!         .name("listing-analysis")
//!         .build(),
//!     RetryExecutor::for_ai().name("listing-analysis").build(),
//! );
//!
//! let verdict = call
//!     .execute(|| async { Ok::<_, ProviderError>("good deal") })
//!     .await?;
//! assert_eq!(verdict, "good deal");
//! # Ok(())
//! # }
//! ```
//!
//! For Tower stacks, [`ResilientCallLayer`] applies the same policy to any
//! `Service<Req, Error = ProviderError>`.

mod layer;
mod wrapper;

pub use layer::{ResilientCallLayer, ResilientService};
pub use wrapper::ResilientCall;

// Re-export the component crates so downstreams need only one dependency.
pub use callguard_admission as admission;
pub use callguard_core as core;
pub use callguard_retry as retry;

pub use callguard_core::{ErrorKind, ProviderError};
