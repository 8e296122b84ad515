//! Protected synchronous calls: `bind`, `intercept` and `run`.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use tracing::trace;

use super::Domain;
use crate::foundation::{BoxError, DomainError, ErrorOrigin, IntoOutcome};

impl Domain {
    /// Runs `f` in a protected frame and converts any failure into a
    /// [`DomainError`] tagged with `origin`, without reporting it.
    ///
    /// Panics are caught only when the domain captures panics; otherwise they
    /// keep unwinding.
    pub(crate) fn guard<T>(
        &self,
        origin: ErrorOrigin,
        f: impl FnOnce() -> Result<T, BoxError>,
    ) -> Result<T, DomainError> {
        let _enter = self.span().enter();
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(DomainError::new(origin, err)),
            Err(payload) if self.options().capture_panics => {
                Err(DomainError::from_panic(origin, payload))
            }
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Wraps a side-effecting callable so that its failures go to the error
    /// channel instead of the caller.
    ///
    /// The wrapped callable discards `f`'s return value. Only synchronous
    /// failures are captured; use [`run_async`](Self::run_async) for futures.
    ///
    /// ```rust,ignore
    /// let on_row = domain.bind(|(id, value): (u32, String)| store(id, value));
    /// on_row((1, "a".into()));
    /// ```
    pub fn bind<A, F, R>(&self, f: F) -> impl Fn(A) + Send + Sync + use<A, F, R>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        let domain = self.clone();
        move |args: A| {
            if let Err(err) = domain.guard(ErrorOrigin::Raised, || f(args).into_outcome()) {
                domain.report(err);
            }
        }
    }

    /// Wraps a callable using the error-first convention.
    ///
    /// The wrapped callable takes a `Result`: an `Err` is reported as an
    /// upstream error and `f` is never called; an `Ok` is passed on to `f`,
    /// whose own failures are reported like [`bind`](Self::bind).
    pub fn intercept<A, E, F, R>(
        &self,
        f: F,
    ) -> impl Fn(Result<A, E>) + Send + Sync + use<A, E, F, R>
    where
        E: Into<BoxError>,
        F: Fn(A) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        let domain = self.clone();
        move |input: Result<A, E>| match input {
            Err(upstream) => {
                trace!("Intercepted upstream error");
                domain.report(DomainError::upstream(upstream));
            }
            Ok(args) => {
                if let Err(err) = domain.guard(ErrorOrigin::Raised, || f(args).into_outcome()) {
                    domain.report(err);
                }
            }
        }
    }

    /// Invokes `f` immediately in a protected frame.
    ///
    /// Returns the domain for chaining.
    pub fn run<F, R>(&self, f: F) -> &Self
    where
        F: FnOnce() -> R,
        R: IntoOutcome,
    {
        if let Err(err) = self.guard(ErrorOrigin::Raised, || f().into_outcome()) {
            self.report(err);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn collecting_domain() -> (Domain, Arc<Mutex<Vec<DomainError>>>) {
        let domain = Domain::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        domain.on_error(move |err| sink.lock().push(err.clone()));
        (domain, seen)
    }

    #[test]
    fn test_run_reports_thrown_error() {
        let (domain, seen) = collecting_domain();
        domain.run(|| Err::<(), _>("a thrown error"));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].to_string(), "a thrown error");
        assert_eq!(seen[0].origin(), ErrorOrigin::Raised);
    }

    #[test]
    fn test_run_captures_panic() {
        let (domain, seen) = collecting_domain();
        domain.run(|| -> Result<(), BoxError> { panic!("kaboom") });

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_panic());
        assert_eq!(seen[0].to_string(), "panicked: kaboom");
    }

    #[test]
    fn test_bind_passes_args_and_absorbs_error() {
        let (domain, seen) = collecting_domain();
        let received = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&received);

        let wrapped = domain.bind(move |(msg, a, b): (&'static str, i32, i32)| {
            *slot.lock() = Some((msg, a, b));
            Err::<(), _>("a thrown error")
        });
        wrapped(("a passed error", 2, 3));

        assert_eq!(*received.lock(), Some(("a passed error", 2, 3)));
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].to_string(), "a thrown error");
    }

    #[test]
    fn test_bind_success_reports_nothing() {
        let (domain, seen) = collecting_domain();
        let wrapped = domain.bind(|n: u32| assert_eq!(n, 4));
        wrapped(4);
        wrapped(4);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_bind_panic_never_escapes() {
        let (domain, seen) = collecting_domain();
        let wrapped = domain.bind(|_: ()| -> Result<(), BoxError> { panic!("inside bind") });
        wrapped(());
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_intercept_ok_calls_function() {
        let (domain, seen) = collecting_domain();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let wrapped = domain.intercept::<(i32, i32), BoxError, _, _>(move |(a, b)| {
            assert_eq!((a, b), (2, 3));
            c.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("a thrown error")
        });
        wrapped(Ok((2, 3)));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].origin(), ErrorOrigin::Raised);
    }

    #[test]
    fn test_intercept_err_skips_function() {
        let (domain, seen) = collecting_domain();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let wrapped = domain.intercept::<(i32, i32), &str, _, _>(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        wrapped(Err("a passed error"));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].to_string(), "a passed error");
        assert_eq!(seen[0].origin(), ErrorOrigin::Upstream);
    }

    #[test]
    fn test_panics_propagate_when_capture_disabled() {
        let domain = Domain::builder().capture_panics(false).build();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            domain.run(|| -> Result<(), BoxError> { panic!("not captured") });
        }));
        assert!(outcome.is_err());
    }
}
