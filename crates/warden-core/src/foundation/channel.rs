//! The per-domain error channel.

use std::fmt;

use tracing::{debug, trace, warn};

use super::emitter::{EventEmitter, ListenerId};
use super::error::DomainError;

/// Event name failures are published under.
pub const ERROR_EVENT: &str = "error";

/// Broadcast point for a domain's failures.
///
/// Every [`report`](Self::report) is delivered to all listeners attached at
/// that moment. Nothing is buffered; with no listener attached the error is
/// dropped (and logged).
#[derive(Clone)]
pub struct ErrorChannel {
    emitter: EventEmitter<DomainError>,
    warn_unobserved: bool,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorChannel {
    /// Creates a channel that warns about unobserved errors.
    pub fn new() -> Self {
        Self {
            emitter: EventEmitter::new(),
            warn_unobserved: true,
        }
    }

    /// Sets whether unobserved errors are logged at `warn` (otherwise `debug`).
    pub fn warn_unobserved(mut self, enabled: bool) -> Self {
        self.warn_unobserved = enabled;
        self
    }

    /// Attaches an error listener.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DomainError) + Send + Sync + 'static,
    {
        self.emitter.on(ERROR_EVENT, listener)
    }

    /// Detaches an error listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.emitter.remove_listener(ERROR_EVENT, id)
    }

    /// Broadcasts `error` to every attached listener.
    pub fn report(&self, error: DomainError) {
        trace!(origin = %error.origin(), error = %error, "Reporting error");
        if self.emitter.emit(ERROR_EVENT, &error) {
            return;
        }
        if self.warn_unobserved {
            warn!(origin = %error.origin(), error = %error, "Unobserved domain error");
        } else {
            debug!(origin = %error.origin(), error = %error, "Unobserved domain error");
        }
    }

    /// Returns the number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.emitter.listener_count(ERROR_EVENT)
    }

    /// Detaches every listener.
    pub fn clear(&self) {
        self.emitter.remove_all_listeners();
    }
}

impl fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("listeners", &self.listener_count())
            .field("warn_unobserved", &self.warn_unobserved)
            .finish()
    }
}
