//! Generic named publish/subscribe primitive.
//!
//! [`EventEmitter<T>`] is the event surface every domain is built on. Listeners
//! are attached per event name and invoked synchronously, in attachment order,
//! whenever that name is emitted.
//!
//! ```rust,ignore
//! use warden_core::EventEmitter;
//!
//! let emitter = EventEmitter::<String>::new();
//! let id = emitter.on("greet", |name: &String| println!("hello {name}"));
//!
//! emitter.emit("greet", &"world".to_string());
//! emitter.remove_listener("greet", id);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

/// A type-erased listener.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies one attached listener, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

struct EmitterInner<T> {
    /// Listeners per event name, in attachment order.
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener<T>)>>>,
    next_id: AtomicU64,
}

/// A named event emitter.
///
/// Cloning is cheap; clones share the same listener registry.
pub struct EventEmitter<T> {
    inner: Arc<EmitterInner<T>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventEmitter<T> {
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Attaches a listener for `event`.
    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_boxed(event, Arc::new(listener))
    }

    /// Attaches a pre-built listener for `event`.
    pub fn on_boxed(&self, event: impl Into<String>, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let event = event.into();
        trace!(event = %event, listener = %id, "Attaching listener");
        self.inner
            .listeners
            .lock()
            .entry(event)
            .or_default()
            .push((id, listener));
        id
    }

    /// Detaches a listener. Returns `false` if it was not attached to `event`.
    pub fn remove_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Synchronously calls every listener attached to `event`.
    ///
    /// Listeners run outside the registry lock against a snapshot taken at
    /// emission time, so they may attach or detach listeners freely.
    ///
    /// Returns `true` if at least one listener ran.
    pub fn emit(&self, event: &str, payload: &T) -> bool {
        let snapshot: Vec<Listener<T>> = match self.inner.listeners.lock().get(event) {
            Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return false,
        };

        trace!(event = %event, listeners = snapshot.len(), "Emitting event");
        for listener in &snapshot {
            listener(payload);
        }
        !snapshot.is_empty()
    }

    /// Detaches every listener for every event.
    pub fn remove_all_listeners(&self) {
        self.inner.listeners.lock().clear();
    }

    /// Detaches every listener for `event`.
    pub fn remove_all_listeners_for(&self, event: &str) {
        self.inner.listeners.lock().remove(event);
    }

    /// Returns the number of listeners attached to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .get(event)
            .map_or(0, |list| list.len())
    }

    /// Returns the names of all events with at least one listener.
    pub fn event_names(&self) -> Vec<String> {
        self.inner.listeners.lock().keys().cloned().collect()
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.inner.listeners.lock();
        f.debug_struct("EventEmitter")
            .field("events", &listeners.len())
            .field(
                "listeners",
                &listeners.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_listeners() {
        let emitter = EventEmitter::<u32>::new();
        assert!(!emitter.emit("nothing", &1));
    }

    #[test]
    fn test_listeners_run_in_attachment_order() {
        let emitter = EventEmitter::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            emitter.on("tick", move |n: &u32| seen.lock().push(format!("{tag}:{n}")));
        }

        assert!(emitter.emit("tick", &7));
        assert_eq!(*seen.lock(), vec!["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn test_remove_listener() {
        let emitter = EventEmitter::<()>::new();
        let id = emitter.on("a", |_| {});
        emitter.on("a", |_| {});

        assert!(emitter.remove_listener("a", id));
        assert!(!emitter.remove_listener("a", id));
        assert!(!emitter.remove_listener("b", id));
        assert_eq!(emitter.listener_count("a"), 1);
    }

    #[test]
    fn test_remove_all_listeners() {
        let emitter = EventEmitter::<()>::new();
        emitter.on("a", |_| {});
        emitter.on("b", |_| {});

        emitter.remove_all_listeners_for("a");
        assert_eq!(emitter.event_names(), vec!["b".to_string()]);

        emitter.remove_all_listeners();
        assert!(emitter.event_names().is_empty());
        assert!(!emitter.emit("b", &()));
    }

    #[test]
    fn test_listener_may_detach_itself_during_emit() {
        let emitter = EventEmitter::<()>::new();
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicU64::new(0));

        let id = {
            let handle = emitter.clone();
            let slot = Arc::clone(&slot);
            let hits = Arc::clone(&hits);
            emitter.on("once", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *slot.lock() {
                    handle.remove_listener("once", id);
                }
            })
        };
        *slot.lock() = Some(id);

        emitter.emit("once", &());
        emitter.emit("once", &());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
