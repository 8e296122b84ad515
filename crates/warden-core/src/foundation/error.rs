//! Unified error types for the Warden core.
//!
//! Every failure a domain observes is normalised into a [`DomainError`]: a
//! shared, clonable handle to the original error plus an [`ErrorOrigin`] tag
//! describing how it was caught. Clones share identity, so a listener on the
//! error channel and a caller holding the returned future see the very same
//! error.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error type accepted from user code.
pub type BoxError = Box<dyn StdError + Send + Sync>;

// =============================================================================
// Error Origin
// =============================================================================

/// How an error reached the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorOrigin {
    /// Raised synchronously inside a protected callable.
    Raised,
    /// Handed in through the error-first convention.
    Upstream,
    /// An asynchronous operation failed.
    Rejected,
    /// Emitted by an attached error source.
    Source,
}

impl ErrorOrigin {
    /// Returns the origin as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raised => "raised",
            Self::Upstream => "upstream",
            Self::Rejected => "rejected",
            Self::Source => "source",
        }
    }
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Panics
// =============================================================================

/// A panic caught inside a protected frame.
#[derive(Debug, Clone, Error)]
#[error("panicked: {message}")]
pub struct Panicked {
    /// The panic message, when the payload was a string.
    pub message: String,
}

impl Panicked {
    /// Builds a `Panicked` error from a `catch_unwind` payload.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        Self { message }
    }
}

// =============================================================================
// Domain Error
// =============================================================================

/// An error delivered on a domain's error channel.
#[derive(Clone)]
pub struct DomainError {
    origin: ErrorOrigin,
    inner: Arc<dyn StdError + Send + Sync>,
}

impl DomainError {
    /// Wraps `err` with the given origin.
    ///
    /// Wrapping an existing `DomainError` keeps its inner error, so identity
    /// survives re-tagging.
    pub fn new(origin: ErrorOrigin, err: impl Into<BoxError>) -> Self {
        let boxed: BoxError = err.into();
        match boxed.downcast::<DomainError>() {
            Ok(existing) => (*existing).with_origin(origin),
            Err(other) => Self {
                origin,
                inner: Arc::from(other),
            },
        }
    }

    /// Creates a `Raised` error.
    pub fn raised(err: impl Into<BoxError>) -> Self {
        Self::new(ErrorOrigin::Raised, err)
    }

    /// Creates an `Upstream` error.
    pub fn upstream(err: impl Into<BoxError>) -> Self {
        Self::new(ErrorOrigin::Upstream, err)
    }

    /// Creates a `Rejected` error.
    pub fn rejected(err: impl Into<BoxError>) -> Self {
        Self::new(ErrorOrigin::Rejected, err)
    }

    /// Creates a `Source` error.
    pub fn source(err: impl Into<BoxError>) -> Self {
        Self::new(ErrorOrigin::Source, err)
    }

    /// Creates an error from a caught panic payload.
    pub fn from_panic(origin: ErrorOrigin, payload: Box<dyn Any + Send>) -> Self {
        Self::new(origin, Panicked::from_payload(payload))
    }

    /// Returns a copy tagged with a different origin, sharing the same inner error.
    pub fn with_origin(mut self, origin: ErrorOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Returns how this error reached the domain.
    pub fn origin(&self) -> ErrorOrigin {
        self.origin
    }

    /// Returns `true` if this error was produced by a caught panic.
    pub fn is_panic(&self) -> bool {
        self.inner.is::<Panicked>()
    }

    /// Attempts to downcast the inner error to a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Returns `true` if both handles point at the same inner error.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the shared inner error.
    pub fn inner(&self) -> &Arc<dyn StdError + Send + Sync> {
        &self.inner
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainError")
            .field("origin", &self.origin)
            .field("error", &self.inner)
            .finish()
    }
}

impl StdError for DomainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for protected operations.
pub type DomainResult<T> = Result<T, DomainError>;
