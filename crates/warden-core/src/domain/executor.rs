//! Protected asynchronous execution.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use tracing::{Instrument, trace};

use super::Domain;
use crate::foundation::{DomainError, DomainResult, ErrorOrigin, IntoOutcome};

impl Domain {
    /// Runs a future-returning operation under the domain's protection.
    ///
    /// `f` is called immediately. If it panics before producing a future, the
    /// panic is reported right away and the returned future fails with the
    /// same error. Otherwise the returned future drives `f`'s future:
    ///
    /// - on success it resolves with the value and nothing is reported;
    /// - on failure (an `Err` or a panic) the error is reported on the error
    ///   channel first, then the returned future fails with that same error.
    ///
    /// ```rust,ignore
    /// let body = domain
    ///     .run_async(|| async { fetch("https://example.com").await })
    ///     .await?;
    /// ```
    pub fn run_async<F, Fut, R>(&self, f: F) -> BoxFuture<'static, DomainResult<R::Output>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoOutcome + Send,
        R::Output: Send + 'static,
    {
        let fut = match self.guard(ErrorOrigin::Raised, || Ok(f())) {
            Ok(fut) => fut,
            Err(err) => {
                self.report(err.clone());
                return future::ready(Err(err)).boxed();
            }
        };

        let domain = self.clone();
        let span = self.span().clone();
        async move {
            let settled = if domain.options().capture_panics {
                AssertUnwindSafe(fut).catch_unwind().await
            } else {
                Ok(fut.await)
            };

            let outcome = match settled {
                Ok(value) => value
                    .into_outcome()
                    .map_err(|err| DomainError::new(ErrorOrigin::Rejected, err)),
                Err(payload) => Err(DomainError::from_panic(ErrorOrigin::Rejected, payload)),
            };

            if let Err(err) = &outcome {
                trace!(error = %err, "Async operation failed");
                domain.report(err.clone());
            }
            outcome
        }
        .instrument(span)
        .boxed()
    }
}
