//! Handler system for event sequencers.
//!
//! [`EventHandler`] is implemented for async functions and closures taking up
//! to eight parameters, similar to Axum's handler system. Each parameter is
//! deserialized from the event's positional [`EventArgs`]; a parameter of type
//! `Option<T>` accepts a missing argument.
//!
//! Calling a handler extracts its arguments and invokes the function right
//! away; the returned future only drives the function's own future.
//!
//! # Example
//!
//! ```rust,ignore
//! // No parameters
//! async fn tick() {}
//!
//! // Positional parameters, fallible
//! async fn resize(width: u32, height: u32) -> Result<(), BoxError> {
//!     // ...
//!     Ok(())
//! }
//!
//! let boxed = into_handler(resize);
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use futures::future;
use serde::de::DeserializeOwned;
use serde_json::Value;
use warden_core::{BoxError, EventArgs, IntoOutcome};

use crate::error::{ExtractError, ExtractResult};

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler invocation settles to.
pub type HandlerResult = Result<(), BoxError>;

// ============================================================================
// EventHandler Trait
// ============================================================================

/// An asynchronous handler for a named event.
///
/// # Blanket Implementation
///
/// Implemented for functions that:
/// - take 0-8 parameters implementing [`DeserializeOwned`]
/// - return a future resolving to `()` or `Result<T, E>` with `E: Into<BoxError>`
pub trait EventHandler<T>: Clone + Send + Sync + 'static {
    /// Extracts the arguments and calls the handler.
    ///
    /// An extraction failure yields an already-failed future and the handler
    /// is not called.
    fn call(self, args: EventArgs) -> BoxFuture<'static, HandlerResult>;
}

// ============================================================================
// Type Erasure
// ============================================================================

/// A wrapper that erases the parameter marker of an [`EventHandler`].
pub struct HandlerFn<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerFn<F, T> {
    /// Creates a new handler function wrapper.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, T> Clone for HandlerFn<F, T> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

/// A type-erased handler that can be stored in a handler table.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Type-erased handler trait for dynamic dispatch.
pub trait ErasedHandler: Send + Sync {
    /// Starts one invocation of the handler.
    fn call(&self, args: EventArgs) -> BoxFuture<'static, HandlerResult>;
}

impl<F, T> ErasedHandler for HandlerFn<F, T>
where
    F: EventHandler<T>,
    T: 'static,
{
    fn call(&self, args: EventArgs) -> BoxFuture<'static, HandlerResult> {
        self.f.clone().call(args)
    }
}

/// Converts a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: EventHandler<T>,
    T: 'static,
{
    Arc::new(HandlerFn::new(f))
}

// ============================================================================
// Argument Extraction
// ============================================================================

/// Deserializes the argument at `index` into `T`.
///
/// A missing argument is presented as `null`, so `Option<T>` parameters see
/// `None`; any other type reports [`ExtractError::Missing`].
pub fn extract_arg<T: DeserializeOwned>(args: &EventArgs, index: usize) -> ExtractResult<T> {
    match args.get(index) {
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|err| ExtractError::Deserialize {
                index,
                reason: err.to_string(),
            })
        }
        None => serde_json::from_value(Value::Null).map_err(|_| ExtractError::Missing { index }),
    }
}

// ============================================================================
// EventHandler implementations for functions (Axum-style)
// ============================================================================

impl<F, Fut, R> EventHandler<()> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + 'static,
{
    fn call(self, _args: EventArgs) -> BoxFuture<'static, HandlerResult> {
        let fut = (self)();
        Box::pin(async move { fut.await.into_outcome().map(drop) })
    }
}

/// Generates `EventHandler` implementations for functions of different arities.
macro_rules! impl_event_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_mut, unused_assignments)]
        impl<F, Fut, R, $($ty,)*> EventHandler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoOutcome + 'static,
            $( $ty: DeserializeOwned + Send + 'static, )*
        {
            fn call(self, args: EventArgs) -> BoxFuture<'static, HandlerResult> {
                let mut index = 0;
                $(
                    let $ty = match extract_arg::<$ty>(&args, index) {
                        Ok(value) => value,
                        Err(err) => return Box::pin(future::ready(Err::<(), BoxError>(err.into()))),
                    };
                    index += 1;
                )*

                let fut = (self)($($ty,)*);
                Box::pin(async move { fut.await.into_outcome().map(drop) })
            }
        }
    };
}

impl_event_handler!(T1);
impl_event_handler!(T1, T2);
impl_event_handler!(T1, T2, T3);
impl_event_handler!(T1, T2, T3, T4);
impl_event_handler!(T1, T2, T3, T4, T5);
impl_event_handler!(T1, T2, T3, T4, T5, T6);
impl_event_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_event_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
