//! Tower integration.
//!
//! [`DomainLayer`] runs every call of the wrapped service under a domain's
//! protection: failures and panics are reported on the domain's error channel
//! and still returned to the caller as [`DomainError`].
//!
//! ```rust,ignore
//! let svc = ServiceBuilder::new()
//!     .layer(DomainLayer::new(domain.clone()))
//!     .service_fn(fetch);
//! ```

use std::task::{Context, Poll};

use tower::{Layer, Service};
use tracing::trace;
use warden_core::{BoxError, Domain, DomainError};

use crate::handler::BoxFuture;

/// A tower [`Layer`] that reports the inner service's failures to a domain.
#[derive(Debug, Clone)]
pub struct DomainLayer {
    domain: Domain,
}

impl DomainLayer {
    /// Creates a layer reporting to `domain`.
    pub fn new(domain: Domain) -> Self {
        Self { domain }
    }
}

impl<S> Layer<S> for DomainLayer {
    type Service = DomainService<S>;

    fn layer(&self, inner: S) -> DomainService<S> {
        DomainService {
            domain: self.domain.clone(),
            inner,
        }
    }
}

/// The [`Service`] produced by [`DomainLayer`].
#[derive(Debug, Clone)]
pub struct DomainService<S> {
    domain: Domain,
    inner: S,
}

impl<S> DomainService<S> {
    /// Wraps `inner` directly.
    pub fn new(domain: Domain, inner: S) -> Self {
        Self { domain, inner }
    }

    /// Returns the domain failures are reported to.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Returns the wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes the wrapper, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Req> Service<Req> for DomainService<S>
where
    S: Service<Req>,
    S::Error: Into<BoxError> + Send,
    S::Response: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = DomainError;
    type Future = BoxFuture<'static, Result<S::Response, DomainError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(|err| {
            let err = DomainError::rejected(err);
            trace!(error = %err, "Inner service not ready");
            self.domain.report(err.clone());
            err
        })
    }

    fn call(&mut self, req: Req) -> Self::Future {
        self.domain.run_async(|| self.inner.call(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio_test::{assert_ready_err, assert_ready_ok};
    use tower::{ServiceExt, service_fn};
    use warden_core::ErrorOrigin;

    fn collecting_domain() -> (Domain, Arc<Mutex<Vec<DomainError>>>) {
        let domain = Domain::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        domain.on_error(move |err| sink.lock().push(err.clone()));
        (domain, seen)
    }

    struct Overloaded;

    impl Service<()> for Overloaded {
        type Response = ();
        type Error = BoxError;
        type Future = BoxFuture<'static, Result<(), BoxError>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), BoxError>> {
            Poll::Ready(Err("overloaded".into()))
        }

        fn call(&mut self, _req: ()) -> Self::Future {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let (domain, seen) = collecting_domain();
        let svc = DomainLayer::new(domain)
            .layer(service_fn(|x: u32| async move { Ok::<_, BoxError>(x * 2) }));

        let value = svc.oneshot(21).await.unwrap();
        assert_eq!(value, 42);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failure_reported_and_returned() {
        let (domain, seen) = collecting_domain();
        let svc = DomainLayer::new(domain)
            .layer(service_fn(|_: ()| async { Err::<(), BoxError>("boom".into()) }));

        let err = svc.oneshot(()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.origin(), ErrorOrigin::Rejected);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ptr_eq(&err));
    }

    #[tokio::test]
    async fn test_readiness() {
        let (domain, seen) = collecting_domain();
        let mut task = tokio_test::task::spawn(());

        let mut ready = DomainService::new(
            domain.clone(),
            service_fn(|_: ()| async { Ok::<_, BoxError>(()) }),
        );
        assert_ready_ok!(task.enter(|cx, _| ready.poll_ready(cx)));

        let mut unready = DomainLayer::new(domain).layer(Overloaded);
        let err = assert_ready_err!(task.enter(|cx, _| unready.poll_ready(cx)));
        assert_eq!(err.to_string(), "overloaded");
        assert_eq!(seen.lock().len(), 1);
    }
}
