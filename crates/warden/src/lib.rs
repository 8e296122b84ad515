//! # Warden
//!
//! Error-aggregation domains and ordered async event sequencing for Rust.
//!
//! ## Overview
//!
//! A domain is a scope that gathers the failures of everything attached to
//! it (wrapped callables, futures, error-emitting sources) and delivers them
//! to a single set of error listeners. Callers of protected work never see
//! those failures; the domain's listeners do.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────────────────┐     ┌──────────────┐
//! │   Runtime    │────▶│ Domain "jobs"                │────▶│ ErrorChannel │──▶ listeners
//! │ (config,log) │     │  bind / intercept / run      │     └──────────────┘
//! └──────────────┘     │  run_async                   │            ▲
//!                      │  Sequencer (async handlers)  │────────────┘
//!                      └──────────────────────────────┘
//! ```
//!
//! - **Core** ([`core`]): domains, the error channel and the event emitter
//! - **Framework** ([`framework`]): the async event sequencer, handler tables
//!   and a tower layer
//! - **Runtime** ([`runtime`]): configuration, logging and a domain factory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use warden::prelude::*;
//!
//! async fn fetch(id: u64) -> Result<(), BoxError> {
//!     Err(format!("record {id} missing").into())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RuntimeError> {
//!     let runtime = WardenRuntime::new();
//!     let domain = runtime.create_domain("sync");
//!     domain.on_error(|err| error!(%err, origin = %err.origin(), "sync failed"));
//!
//!     let table = HandlerTable::new().on("fetch", fetch);
//!     let sequencer = runtime.sequencer(&domain, table)?;
//!     sequencer.emit_with("fetch", EventArgs::new().with(7))?;
//!
//!     let report = sequencer.wait_for_completion().await;
//!     info!(?report, "done");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use warden_core as core;
pub use warden_framework as framework;
pub use warden_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use warden::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use warden_runtime::{RuntimeError, RuntimeResult, WardenConfig, WardenRuntime};

    // Domains and their error channel
    pub use warden_core::{
        Attachment, BoxError, Domain, DomainError, DomainResult, ErrorOrigin, ErrorSource,
        EventArgs, EventEmitter, IntoOutcome, create,
    };

    // Sequencing
    pub use warden_framework::{
        DomainLayer, EventHandler, HandlerTable, SequenceReport, Sequencer, SequencerError,
        SequencerExt, SequencerOptions,
    };

    // Logging macros
    pub use warden_runtime::prelude::*;
}
