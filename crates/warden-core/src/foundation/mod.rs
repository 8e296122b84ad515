//! Foundation layer: error types, the event surface, and the error channel.

pub mod args;
pub mod channel;
pub mod emitter;
pub mod error;
pub mod outcome;

pub use args::EventArgs;
pub use channel::{ERROR_EVENT, ErrorChannel};
pub use emitter::{EventEmitter, Listener, ListenerId};
pub use error::{BoxError, DomainError, DomainResult, ErrorOrigin, Panicked};
pub use outcome::IntoOutcome;
