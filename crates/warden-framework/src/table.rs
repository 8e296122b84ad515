//! Event handler tables.

use std::collections::HashSet;
use std::fmt;

use crate::error::{SequencerError, SequencerResult};
use crate::handler::{BoxedHandler, EventHandler, into_handler};

/// An ordered mapping from event name to asynchronous handler.
///
/// The table is only a description; it is validated when a
/// [`Sequencer`](crate::Sequencer) is built from it.
///
/// ```rust,ignore
/// let table = HandlerTable::new()
///     .on("event1", || async { sleep(Duration::from_millis(40)).await })
///     .on("event2", |n: u32| async move { println!("{n}") });
/// ```
#[derive(Clone, Default)]
pub struct HandlerTable {
    entries: Vec<(String, BoxedHandler)>,
}

impl HandlerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for `event` (builder pattern).
    pub fn on<H, T>(mut self, event: impl Into<String>, handler: H) -> Self
    where
        H: EventHandler<T>,
        T: 'static,
    {
        self.insert(event, into_handler(handler));
        self
    }

    /// Adds an already boxed handler for `event`.
    pub fn insert(&mut self, event: impl Into<String>, handler: BoxedHandler) {
        self.entries.push((event.into(), handler));
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the event names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Checks that every name is non-empty and unique.
    pub fn validate(&self) -> SequencerResult<()> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for (name, _) in &self.entries {
            if name.is_empty() {
                return Err(SequencerError::EmptyEventName);
            }
            if !seen.insert(name.as_str()) {
                return Err(SequencerError::DuplicateEvent { name: name.clone() });
            }
        }
        Ok(())
    }

    pub(crate) fn into_entries(self) -> Vec<(String, BoxedHandler)> {
        self.entries
    }
}

impl<S: Into<String>> FromIterator<(S, BoxedHandler)> for HandlerTable {
    fn from_iter<I: IntoIterator<Item = (S, BoxedHandler)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, handler)| (name.into(), handler))
                .collect(),
        }
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
