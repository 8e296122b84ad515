//! Error types for the Warden framework.

use thiserror::Error;

/// Errors raised while building or driving a [`Sequencer`](crate::Sequencer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// A handler table entry has an empty event name.
    #[error("event name must not be empty")]
    EmptyEventName,

    /// The same event name appears twice in a handler table.
    #[error("duplicate handler for event '{name}'")]
    DuplicateEvent {
        /// The repeated event name.
        name: String,
    },

    /// A strict sequencer was asked to emit an event it has no handler for.
    #[error("no handler registered for event '{name}'")]
    UnknownEvent {
        /// The unknown event name.
        name: String,
    },

    /// The sequencer was created outside a tokio runtime.
    #[error("a sequencer must be created inside a tokio runtime")]
    NoRuntime,
}

/// Result type for sequencer operations.
pub type SequencerResult<T> = Result<T, SequencerError>;

/// Errors that can occur while extracting handler parameters from event arguments.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The event carried fewer arguments than the handler expects.
    #[error("missing event argument at position {index}")]
    Missing {
        /// Zero-based parameter position.
        index: usize,
    },

    /// An argument did not deserialize into the parameter type.
    #[error("event argument at position {index} is invalid: {reason}")]
    Deserialize {
        /// Zero-based parameter position.
        index: usize,
        /// The deserializer's message.
        reason: String,
    },
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
