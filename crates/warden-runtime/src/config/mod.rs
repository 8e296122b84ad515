//! Configuration for Warden applications.
//!
//! Settings are layered with figment from defaults, config files, and
//! `WARDEN_*` environment variables, then validated.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DomainConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SequencerConfig,
    SpanEventConfig, WardenConfig,
};
pub use validation::validate_config;
