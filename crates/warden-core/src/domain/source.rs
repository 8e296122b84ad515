//! External error sources attached to a domain.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::Domain;
use crate::foundation::{DomainError, ERROR_EVENT, ErrorOrigin, EventEmitter, ListenerId};

/// A type-erased error listener handed to an [`ErrorSource`].
pub type ErrorListener = Arc<dyn Fn(&DomainError) + Send + Sync>;

/// Anything that announces errors to listeners.
pub trait ErrorSource {
    /// Attaches an error listener.
    fn on_error_listener(&self, listener: ErrorListener) -> ListenerId;

    /// Detaches an error listener.
    fn remove_error_listener(&self, id: ListenerId) -> bool;
}

/// Emitters announce errors on their `"error"` event.
impl<T> ErrorSource for EventEmitter<T>
where
    T: StdError + Clone + Send + Sync + 'static,
{
    fn on_error_listener(&self, listener: ErrorListener) -> ListenerId {
        self.on(ERROR_EVENT, move |err: &T| {
            listener(&DomainError::source(err.clone()));
        })
    }

    fn remove_error_listener(&self, id: ListenerId) -> bool {
        self.remove_listener(ERROR_EVENT, id)
    }
}

/// Domains can be nested: a child domain's failures flow into its parent.
impl ErrorSource for Domain {
    fn on_error_listener(&self, listener: ErrorListener) -> ListenerId {
        self.channel().subscribe(move |err| listener(err))
    }

    fn remove_error_listener(&self, id: ListenerId) -> bool {
        Domain::remove_error_listener(self, id)
    }
}

/// Proof that a source is attached to a domain.
///
/// Returned by [`Domain::add`] and consumed by [`Domain::remove`].
#[must_use = "dropping an Attachment leaves the source attached with no way to remove it"]
pub struct Attachment {
    key: u64,
    listener: ListenerId,
    active: Arc<AtomicBool>,
}

impl Attachment {
    /// Returns `true` while errors from the source are still forwarded.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("listener", &self.listener)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Domain {
    /// Forwards every error `source` announces to this domain's error channel.
    pub fn add<S>(&self, source: &S) -> Attachment
    where
        S: ErrorSource + ?Sized,
    {
        let (key, active) = self.register_attachment();
        let domain = self.downgrade();
        let flag = Arc::clone(&active);

        let listener = source.on_error_listener(Arc::new(move |err: &DomainError| {
            if !flag.load(Ordering::SeqCst) {
                return;
            }
            if let Some(domain) = domain.upgrade() {
                domain.report(err.clone().with_origin(ErrorOrigin::Source));
            }
        }));

        debug!(parent: self.span(), listener = %listener, "Error source attached");
        Attachment {
            key,
            listener,
            active,
        }
    }

    /// Stops forwarding errors from `source`.
    ///
    /// Once this returns, no further error from the source reaches the
    /// channel, including emissions already in progress on other threads.
    pub fn remove<S>(&self, source: &S, attachment: Attachment) -> bool
    where
        S: ErrorSource + ?Sized,
    {
        attachment.active.store(false, Ordering::SeqCst);
        self.release_attachment(attachment.key);
        let removed = source.remove_error_listener(attachment.listener);
        debug!(parent: self.span(), listener = %attachment.listener, removed, "Error source removed");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use thiserror::Error;

    #[derive(Debug, Clone, Error)]
    #[error("{0}")]
    struct EmitterError(&'static str);

    fn collecting_domain() -> (Domain, Arc<Mutex<Vec<DomainError>>>) {
        let domain = Domain::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        domain.on_error(move |err| sink.lock().push(err.clone()));
        (domain, seen)
    }

    #[test]
    fn test_added_emitter_forwards_errors() {
        let (domain, seen) = collecting_domain();
        let emitter = EventEmitter::<EmitterError>::new();

        let _attachment = domain.add(&emitter);
        emitter.emit(ERROR_EVENT, &EmitterError("an emitted error"));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].to_string(), "an emitted error");
        assert_eq!(seen[0].origin(), ErrorOrigin::Source);
    }

    #[test]
    fn test_removed_emitter_no_longer_forwards() {
        let (domain, seen) = collecting_domain();
        let emitter = EventEmitter::<EmitterError>::new();
        let own_hits = Arc::new(Mutex::new(0));
        {
            let own_hits = Arc::clone(&own_hits);
            emitter.on(ERROR_EVENT, move |_| *own_hits.lock() += 1);
        }

        let attachment = domain.add(&emitter);
        assert_eq!(domain.source_count(), 1);
        assert!(domain.remove(&emitter, attachment));
        assert_eq!(domain.source_count(), 0);

        emitter.emit(
            ERROR_EVENT,
            &EmitterError("This error should not go to the domain"),
        );

        assert_eq!(*own_hits.lock(), 1);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_removal_during_emission_blocks_late_delivery() {
        let (domain, seen) = collecting_domain();
        let emitter = EventEmitter::<EmitterError>::new();
        let pending: Arc<Mutex<Option<Attachment>>> = Arc::new(Mutex::new(None));

        // Attached first, so it runs before the forwarding listener in the same emit.
        {
            let domain = domain.clone();
            let handle = emitter.clone();
            let pending = Arc::clone(&pending);
            emitter.on(ERROR_EVENT, move |_| {
                if let Some(attachment) = pending.lock().take() {
                    domain.remove(&handle, attachment);
                }
            });
        }
        *pending.lock() = Some(domain.add(&emitter));

        emitter.emit(ERROR_EVENT, &EmitterError("raced"));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_nested_domain_flows_into_parent() {
        let (parent, seen) = collecting_domain();
        let child = Domain::new();

        let attachment = parent.add(&child);
        child.run(|| Err::<(), _>("child failure"));
        assert_eq!(seen.lock().len(), 1);

        parent.remove(&child, attachment);
        child.run(|| Err::<(), _>("after removal"));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_dispose_deactivates_attachments() {
        let (domain, _seen) = collecting_domain();
        let emitter = EventEmitter::<EmitterError>::new();

        let attachment = domain.add(&emitter);
        domain.dispose();
        assert!(!attachment.is_active());

        let late = Arc::new(Mutex::new(0));
        {
            let late = Arc::clone(&late);
            domain.on_error(move |_| *late.lock() += 1);
        }
        emitter.emit(ERROR_EVENT, &EmitterError("after dispose"));
        assert_eq!(*late.lock(), 0);
    }
}
