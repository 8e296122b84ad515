//! Positional arguments carried by a named event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arguments passed along with an emitted event.
///
/// Arguments are stored as JSON values so handlers can extract them into any
/// deserializable type. An optional sender tag lets a listener tell which
/// emitter fired the event; it is not part of the serialized form.
///
/// ```rust,ignore
/// let args = EventArgs::new().with(2).with("three");
/// assert_eq!(args.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventArgs {
    values: Vec<Value>,
    #[serde(skip)]
    sender: Option<u64>,
}

impl EventArgs {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument (builder pattern).
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Appends an argument.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    /// Tags the arguments with the emitter that sends them.
    pub fn sent_by(mut self, sender: u64) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Returns the sender tag, if any.
    pub fn sender(&self) -> Option<u64> {
        self.sender
    }

    /// Returns the argument at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the arguments as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

impl From<Vec<Value>> for EventArgs {
    fn from(values: Vec<Value>) -> Self {
        Self {
            values,
            sender: None,
        }
    }
}

impl<V: Into<Value>> FromIterator<V> for EventArgs {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        iter.into_iter()
            .map(Into::into)
            .collect::<Vec<Value>>()
            .into()
    }
}
