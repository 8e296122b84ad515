//! Error-aggregation domains.
//!
//! A [`Domain`] funnels the failures of everything attached to it into one
//! [`ErrorChannel`]. Operations join a domain in three ways:
//!
//! - synchronous callables via [`bind`](Domain::bind), [`intercept`](Domain::intercept)
//!   and [`run`](Domain::run)
//! - asynchronous operations via [`run_async`](Domain::run_async)
//! - external error sources via [`add`](Domain::add)
//!
//! ```text
//! ┌──────────────┐
//! │ bind / run   │──┐
//! ├──────────────┤  │     ┌──────────────┐     ┌───────────┐
//! │ intercept    │──┼────▶│ ErrorChannel │────▶│ listeners │
//! ├──────────────┤  │     └──────────────┘     └───────────┘
//! │ run_async    │──┤
//! ├──────────────┤  │
//! │ add(source)  │──┘
//! └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_core::Domain;
//!
//! let domain = Domain::new();
//! domain.on_error(|err| eprintln!("caught: {err}"));
//!
//! let save = domain.bind(|path: &str| std::fs::write(path, b"data"));
//! save("/read-only/file"); // failure goes to the listener, not the caller
//! ```

mod executor;
mod protect;
mod source;

pub use source::{Attachment, ErrorListener, ErrorSource};

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{Level, Span, debug, span};
use uuid::Uuid;

use crate::foundation::{DomainError, ErrorChannel, EventArgs, EventEmitter, ListenerId};

// =============================================================================
// Identity & State
// =============================================================================

/// Unique identity of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainId(Uuid);

impl DomainId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle state of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    /// Accepting listeners and reporting errors.
    Active,
    /// [`dispose`](Domain::dispose) has been called.
    Disposed,
}

// =============================================================================
// Options & Builder
// =============================================================================

/// Behavioural options for a domain.
#[derive(Debug, Clone)]
pub struct DomainOptions {
    /// Human-readable name, used in logs.
    pub name: Option<String>,
    /// Catch panics inside protected frames and report them.
    pub capture_panics: bool,
    /// Log unobserved errors at `warn` instead of `debug`.
    pub warn_unobserved: bool,
}

impl Default for DomainOptions {
    fn default() -> Self {
        Self {
            name: None,
            capture_panics: true,
            warn_unobserved: true,
        }
    }
}

/// Builder for [`Domain`].
#[derive(Debug, Default)]
pub struct DomainBuilder {
    options: DomainOptions,
}

impl DomainBuilder {
    /// Sets the domain name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    /// Sets whether panics are captured (default: `true`).
    pub fn capture_panics(mut self, enabled: bool) -> Self {
        self.options.capture_panics = enabled;
        self
    }

    /// Sets whether unobserved errors log at `warn` (default: `true`).
    pub fn warn_unobserved(mut self, enabled: bool) -> Self {
        self.options.warn_unobserved = enabled;
        self
    }

    /// Replaces all options at once.
    pub fn options(mut self, options: DomainOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the domain.
    pub fn build(self) -> Domain {
        Domain::with_options(self.options)
    }
}

// =============================================================================
// Domain
// =============================================================================

struct DomainInner {
    id: DomainId,
    options: DomainOptions,
    channel: ErrorChannel,
    events: EventEmitter<EventArgs>,
    state: Mutex<DomainState>,
    /// Forwarding flags of attached sources, keyed by attachment number.
    attachments: Mutex<HashMap<u64, Arc<AtomicBool>>>,
    next_attachment: AtomicU64,
    span: Span,
}

/// An error-aggregation scope.
///
/// `Domain` is a cheap handle; clones refer to the same domain.
#[derive(Clone)]
pub struct Domain {
    inner: Arc<DomainInner>,
}

impl Default for Domain {
    fn default() -> Self {
        Self::new()
    }
}

impl Domain {
    /// Creates a domain with default options.
    pub fn new() -> Self {
        Self::with_options(DomainOptions::default())
    }

    /// Creates a domain builder.
    pub fn builder() -> DomainBuilder {
        DomainBuilder::default()
    }

    /// Creates a domain with the given options.
    pub fn with_options(options: DomainOptions) -> Self {
        let id = DomainId::generate();
        let span = span!(
            Level::DEBUG,
            "domain",
            id = %id,
            name = options.name.as_deref().unwrap_or("unnamed")
        );
        let channel = ErrorChannel::new().warn_unobserved(options.warn_unobserved);

        debug!(parent: &span, capture_panics = options.capture_panics, "Domain created");

        Self {
            inner: Arc::new(DomainInner {
                id,
                options,
                channel,
                events: EventEmitter::new(),
                state: Mutex::new(DomainState::Active),
                attachments: Mutex::new(HashMap::new()),
                next_attachment: AtomicU64::new(1),
                span,
            }),
        }
    }

    /// Returns the domain's identity.
    pub fn id(&self) -> DomainId {
        self.inner.id
    }

    /// Returns the domain's name, if set.
    pub fn name(&self) -> Option<&str> {
        self.inner.options.name.as_deref()
    }

    /// Returns the options this domain was built with.
    pub fn options(&self) -> &DomainOptions {
        &self.inner.options
    }

    /// Returns the tracing span protected frames run in.
    pub fn span(&self) -> &Span {
        &self.inner.span
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> DomainState {
        *self.inner.state.lock()
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.state() == DomainState::Disposed
    }

    /// Returns the error channel.
    pub fn channel(&self) -> &ErrorChannel {
        &self.inner.channel
    }

    /// Returns the domain's named event surface.
    pub fn events(&self) -> &EventEmitter<EventArgs> {
        &self.inner.events
    }

    /// Attaches an error listener.
    pub fn on_error<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DomainError) + Send + Sync + 'static,
    {
        self.inner.channel.subscribe(listener)
    }

    /// Detaches an error listener.
    pub fn remove_error_listener(&self, id: ListenerId) -> bool {
        self.inner.channel.unsubscribe(id)
    }

    /// Broadcasts `error` on the error channel.
    pub fn report(&self, error: DomainError) {
        let _enter = self.inner.span.enter();
        if self.is_disposed() {
            debug!(error = %error, "Report on disposed domain");
        }
        self.inner.channel.report(error);
    }

    /// Detaches every error listener, every event listener, and every source.
    ///
    /// In-flight asynchronous work is not interrupted; failures it reports
    /// later reach only listeners attached after disposal.
    pub fn dispose(&self) -> &Self {
        let mut state = self.inner.state.lock();
        if *state == DomainState::Disposed {
            return self;
        }
        *state = DomainState::Disposed;
        drop(state);

        self.inner.channel.clear();
        self.inner.events.remove_all_listeners();
        let attachments: Vec<_> = self.inner.attachments.lock().drain().collect();
        for (_, active) in &attachments {
            active.store(false, Ordering::SeqCst);
        }

        debug!(parent: &self.inner.span, sources = attachments.len(), "Domain disposed");
        self
    }

    /// Lifecycle marker; does nothing.
    pub fn enter(&self) -> &Self {
        self
    }

    /// Lifecycle marker; does nothing.
    pub fn exit(&self) -> &Self {
        self
    }

    /// Returns the number of attached error sources.
    pub fn source_count(&self) -> usize {
        self.inner.attachments.lock().len()
    }

    /// Creates a non-owning handle.
    pub fn downgrade(&self) -> WeakDomain {
        WeakDomain {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn register_attachment(&self) -> (u64, Arc<AtomicBool>) {
        let key = self.inner.next_attachment.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.inner
            .attachments
            .lock()
            .insert(key, Arc::clone(&active));
        (key, active)
    }

    fn release_attachment(&self, key: u64) {
        self.inner.attachments.lock().remove(&key);
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.inner.id)
            .field("name", &self.inner.options.name)
            .field("state", &self.state())
            .field("error_listeners", &self.inner.channel.listener_count())
            .field("sources", &self.source_count())
            .finish()
    }
}

/// A non-owning handle to a [`Domain`].
///
/// Listeners the domain itself stores hold this form to avoid reference cycles.
#[derive(Clone, Debug, Default)]
pub struct WeakDomain {
    inner: Weak<DomainInner>,
}

impl WeakDomain {
    /// Returns the domain if it is still alive.
    pub fn upgrade(&self) -> Option<Domain> {
        self.inner.upgrade().map(|inner| Domain { inner })
    }
}

/// Creates a new domain with default options.
pub fn create() -> Domain {
    Domain::new()
}
