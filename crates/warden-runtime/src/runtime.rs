//! Runtime entry point: configuration, logging and a factory for domains
//! and sequencers that carry the configured defaults.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use warden_runtime::WardenRuntime;
//!
//! // Auto-loads warden.toml from the current directory
//! let runtime = WardenRuntime::new();
//!
//! // Custom configuration path
//! let runtime = WardenRuntime::builder()
//!     .config_file("config/warden.toml")
//!     .profile("production")
//!     .build()?;
//!
//! let domain = runtime.create_domain("jobs");
//! ```

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};
use warden_core::Domain;
use warden_framework::{HandlerTable, Sequencer};

use crate::config::{ConfigLoader, WardenConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// Owns the loaded configuration and hands out domains and sequencers
/// built from it.
///
/// ```rust,ignore
/// let runtime = WardenRuntime::new();
/// let domain = runtime.create_domain("ingest");
/// domain.on_error(|err| tracing::error!(%err, "ingest failed"));
/// ```
pub struct WardenRuntime {
    config: WardenConfig,
    domains_created: AtomicUsize,
    sequencers_created: AtomicUsize,
}

impl WardenRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// This will:
    /// 1. Search for `warden.toml` in the current directory
    /// 2. Initialize logging based on the configuration
    ///
    /// If the configuration cannot be loaded, default settings are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                WardenConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging.
    ///
    /// Logging setup is skipped if a global subscriber is already installed.
    pub fn from_config(config: &WardenConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            strict_sequencers = config.sequencer.strict,
            "Runtime initialized from configuration"
        );

        Self::with_config(config.clone())
    }

    fn with_config(config: WardenConfig) -> Self {
        Self {
            config,
            domains_created: AtomicUsize::new(0),
            sequencers_created: AtomicUsize::new(0),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Creates a domain named `name` with the configured domain defaults.
    pub fn create_domain(&self, name: &str) -> Domain {
        let domain = Domain::with_options(self.config.domain.to_options(name));
        self.domains_created.fetch_add(1, Ordering::Relaxed);
        debug!(domain = %domain.id(), name = ?domain.name(), "Runtime created domain");
        domain
    }

    /// Creates a sequencer on `domain` using the configured sequencer options.
    ///
    /// Must be called inside a tokio runtime.
    pub fn sequencer(&self, domain: &Domain, table: HandlerTable) -> RuntimeResult<Sequencer> {
        let sequencer = Sequencer::with_options(domain, table, self.config.sequencer.to_options())?;
        self.sequencers_created.fetch_add(1, Ordering::Relaxed);
        Ok(sequencer)
    }

    /// Returns counters of what this runtime has created.
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            domains: self.domains_created.load(Ordering::Relaxed),
            sequencers: self.sequencers_created.load(Ordering::Relaxed),
        }
    }
}

impl Default for WardenRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WardenRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WardenRuntime")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics about a runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Domains created through the runtime.
    pub domains: usize,
    /// Sequencers created through the runtime.
    pub sequencers: usize,
}

impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Domains: {}, Sequencers: {}",
            self.domains, self.sequencers
        )
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `WardenRuntime` with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = WardenRuntime::builder()
///     .config_file("config/warden.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: WardenConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<WardenRuntime> {
        let config = self.config_loader.load()?;
        if self.init_logging {
            Ok(WardenRuntime::from_config(&config))
        } else {
            Ok(WardenRuntime::with_config(config))
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::config::{DomainConfig, SequencerConfig};
    use crate::error::RuntimeError;
    use warden_framework::SequencerError;

    fn quiet(config: WardenConfig) -> WardenRuntime {
        WardenRuntime::builder()
            .without_env()
            .without_logging()
            .merge(config)
            .build()
            .expect("runtime builds")
    }

    #[test]
    fn test_domain_defaults_from_config() {
        let runtime = quiet(WardenConfig {
            domain: DomainConfig {
                capture_panics: false,
                name_prefix: Some("svc".into()),
                ..Default::default()
            },
            ..Default::default()
        });

        let domain = runtime.create_domain("jobs");
        assert_eq!(domain.name(), Some("svc.jobs"));
        assert!(!domain.options().capture_panics);
        assert_eq!(runtime.stats().domains, 1);
    }

    #[tokio::test]
    async fn test_strict_sequencer_from_config() {
        let runtime = quiet(WardenConfig {
            sequencer: SequencerConfig { strict: true },
            ..Default::default()
        });
        let domain = runtime.create_domain("seq");

        let table = HandlerTable::new().on("known", || async {});
        let sequencer = runtime.sequencer(&domain, table).expect("sequencer");
        assert!(sequencer.options().strict);
        assert!(matches!(
            sequencer.emit_events(["unknown"]),
            Err(SequencerError::UnknownEvent { .. })
        ));

        assert_eq!(
            runtime.stats(),
            RuntimeStats {
                domains: 1,
                sequencers: 1
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_table_is_runtime_error() {
        let runtime = quiet(WardenConfig::default());
        let domain = runtime.create_domain("seq");
        let table = HandlerTable::new()
            .on("dup", || async {})
            .on("dup", || async {});

        assert!(matches!(
            runtime.sequencer(&domain, table),
            Err(RuntimeError::Sequencer(SequencerError::DuplicateEvent { .. }))
        ));
        assert_eq!(runtime.stats().sequencers, 0);
    }

    #[test]
    fn test_builder_reads_config_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "warden.toml",
                r#"
                [domain]
                name_prefix = "app"

                [sequencer]
                strict = true
                "#,
            )?;

            let runtime = WardenRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .without_logging()
                .build()
                .map_err(|e| e.to_string())?;

            assert!(runtime.config().sequencer.strict);
            assert_eq!(runtime.create_domain("x").name(), Some("app.x"));
            Ok(())
        });
    }

    #[test]
    fn test_builder_surfaces_config_errors() {
        let result = WardenRuntime::builder()
            .config_file("definitely/missing/warden.toml")
            .without_env()
            .without_logging()
            .build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_stats_display() {
        let stats = RuntimeStats {
            domains: 3,
            sequencers: 1,
        };
        assert_eq!(stats.to_string(), "Domains: 3, Sequencers: 1");
    }
}
