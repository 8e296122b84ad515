//! # Warden Core
//!
//! Error-aggregation domains for asynchronous Rust.
//!
//! A [`Domain`] is a named scope that collects every failure from the work
//! attached to it and broadcasts each one on a single [`ErrorChannel`].
//! Callers of the attached work never see those failures directly.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Errors**: the shared [`DomainError`] with its [`ErrorOrigin`] tag
//! - **Event Surface**: named, ordered listeners ([`EventEmitter`])
//! - **Error Channel**: the `"error"` broadcast ([`ErrorChannel`])
//! - **Outcomes**: what counts as failure for a callable ([`IntoOutcome`])
//!
//! ### Domain Layer
//!
//! - **Protected Calls**: [`Domain::bind`], [`Domain::intercept`], [`Domain::run`]
//! - **Async Execution**: [`Domain::run_async`]
//! - **Error Sources**: [`Domain::add`] and [`Domain::remove`] via [`ErrorSource`]
//!
//! ```text
//! ┌─────────────┐     ┌────────┐     ┌──────────────┐     ┌───────────┐
//! │  callables  │────▶│ Domain │────▶│ ErrorChannel │────▶│ listeners │
//! │  futures    │────▶│        │     └──────────────┘     └───────────┘
//! │  emitters   │────▶│        │
//! └─────────────┘     └────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let domain = Domain::builder().name("jobs").build();
//!     domain.on_error(|err| eprintln!("[{}] {err}", err.origin()));
//!
//!     domain.run(|| Err::<(), _>("sync failure"));
//!
//!     let _ = domain
//!         .run_async(|| async { Err::<(), _>("async failure") })
//!         .await;
//! }
//! ```

pub mod domain;
pub mod foundation;

pub use domain::{
    Attachment, Domain, DomainBuilder, DomainId, DomainOptions, DomainState, ErrorListener,
    ErrorSource, WeakDomain, create,
};
pub use foundation::{
    BoxError, DomainError, DomainResult, ERROR_EVENT, ErrorChannel, ErrorOrigin, EventArgs,
    EventEmitter, IntoOutcome, Listener, ListenerId, Panicked,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::domain::{Attachment, Domain, DomainOptions, ErrorSource, create};
    pub use super::foundation::*;
}
