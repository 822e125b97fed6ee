use crate::ResilientCall;
use callguard_core::ProviderError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// A Tower [`Layer`] that routes every request through a [`ResilientCall`].
///
/// The wrapped service gains admission control and classified retries with
/// no change to its request/response contract; its error type must already
/// be [`ProviderError`] so attempts can be classified.
///
/// # Examples
///
/// ```
/// use callguard::{ResilientCall, ResilientCallLayer};
/// use callguard_admission::AdmissionConfig;
/// use callguard_core::ProviderError;
/// use callguard_retry::RetryExecutor;
/// use tower::ServiceBuilder;
///
/// # async fn example() {
/// let call = ResilientCall::new(
///     AdmissionConfig::builder().requests_per_minute(30).build(),
///     RetryExecutor::for_ai().build(),
/// );
///
/// let service = ServiceBuilder::new()
///     .layer(ResilientCallLayer::new(call))
///     .service(tower::service_fn(|prompt: String| async move {
///         Ok::<_, ProviderError>(format!("analysis of {}", prompt))
///     }));
/// # let _ = service;
/// # }
/// ```
#[derive(Clone)]
pub struct ResilientCallLayer {
    call: Arc<ResilientCall>,
}

impl ResilientCallLayer {
    /// Creates a new layer around an already-composed wrapper.
    pub fn new(call: ResilientCall) -> Self {
        Self {
            call: Arc::new(call),
        }
    }
}

impl<S> Layer<S> for ResilientCallLayer {
    type Service = ResilientService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ResilientService {
            inner: service,
            call: Arc::clone(&self.call),
        }
    }
}

/// A Tower [`Service`] produced by [`ResilientCallLayer`].
pub struct ResilientService<S> {
    inner: S,
    call: Arc<ResilientCall>,
}

impl<S> Clone for ResilientService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            call: Arc::clone(&self.call),
        }
    }
}

impl<S, Req> Service<Req> for ResilientService<S>
where
    S: Service<Req, Error = ProviderError> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = ProviderError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let call = Arc::clone(&self.call);
        let service = self.inner.clone();

        Box::pin(async move {
            let admission = call.admission().clone();
            let retry = call.retry().clone();
            retry
                .execute(move || {
                    // One admission pass and one fresh service clone per
                    // attempt, so retries queue like any other caller.
                    let admission = admission.clone();
                    let mut service = service.clone();
                    let req = req.clone();
                    async move {
                        admission
                            .run(move || async move { service.call(req).await })
                            .await
                    }
                })
                .await
        })
    }
}
