//! # Warden Framework
//!
//! Higher-level components built on [`warden_core`] domains.
//!
//! This layer provides:
//! - Axum-style asynchronous event handlers with positional argument extraction
//! - Handler tables and the async event [`Sequencer`], which tracks emission
//!   and completion order across concurrently running handlers
//! - A tower [`DomainLayer`] that reports service failures to a domain

pub mod error;
pub mod handler;
pub mod layer;
pub mod sequencer;
pub mod table;

pub use error::{ExtractError, ExtractResult, SequencerError, SequencerResult};
pub use handler::{
    BoxFuture, BoxedHandler, ErasedHandler, EventHandler, HandlerFn, HandlerResult, extract_arg,
    into_handler,
};
pub use layer::{DomainLayer, DomainService};
pub use sequencer::{SequenceReport, Sequencer, SequencerExt, SequencerOptions};
pub use table::HandlerTable;
