//! Warden Runtime - configuration and logging for Warden applications.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`): defaults, files, profiles and
//!   `WARDEN_` environment variables
//! - Logging setup on `tracing-subscriber`, with optional rolling log files
//! - `WardenRuntime`, a factory for domains and sequencers that carry the
//!   configured defaults
//!
//! ```rust,ignore
//! use warden_runtime::WardenRuntime;
//! use warden_framework::HandlerTable;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = WardenRuntime::new();
//!     let domain = runtime.create_domain("jobs");
//!     domain.on_error(|err| tracing::error!(%err, "job failed"));
//!
//!     let table = HandlerTable::new().on("tick", || async { /* ... */ });
//!     let sequencer = runtime.sequencer(&domain, table)?;
//!     sequencer.emit_events(["tick", "tick"])?;
//!     sequencer.wait_for_completion().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DomainConfig, LoggingConfig, Profile,
    SequencerConfig, WardenConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, RuntimeStats, WardenRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
