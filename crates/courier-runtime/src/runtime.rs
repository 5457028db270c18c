//! Runtime wiring from configuration to router.
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let runtime = CourierRuntime::builder()
//!     .config_file("config/courier.toml")
//!     .init_logging(true)
//!     .build()?;
//!
//! let router = runtime
//!     .router_builder()
//!     .handler(OrderHandler)
//!     .correlation_scope(MyTelemetry::new())
//!     .build();
//! ```

use std::path::Path;

use courier_framework::{MessageRouter, RouterBuilder, RouterOptions};
use tracing::info;

use crate::config::{ConfigLoader, CourierConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging::LoggingBuilder;

/// Validated configuration plus the router options derived from it.
#[derive(Debug, Clone)]
pub struct CourierRuntime {
    config: CourierConfig,
    router_options: RouterOptions,
}

impl CourierRuntime {
    /// Loads configuration from the default locations.
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from already loaded configuration.
    ///
    /// Fails when the configuration is invalid, for example when the
    /// correlation format is unknown.
    pub fn from_config(config: CourierConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        let router_options = config.routing.to_router_options()?;

        Ok(Self {
            config,
            router_options,
        })
    }

    /// Installs the global log subscriber described by the configuration.
    pub fn init_logging(&self) -> RuntimeResult<()> {
        LoggingBuilder::from_config(&self.config.logging).try_init()?;

        info!(
            log_level = %self.config.logging.level,
            log_format = ?self.config.logging.format,
            operation_name = %self.router_options.telemetry.operation_name,
            correlation_format = %self.router_options.correlation.format,
            "Courier runtime initialized"
        );
        Ok(())
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    pub fn router_options(&self) -> &RouterOptions {
        &self.router_options
    }

    /// A router builder preset with the configured options.
    pub fn router_builder(&self) -> RouterBuilder {
        MessageRouter::builder().options(self.router_options.clone())
    }
}

/// Builder for [`CourierRuntime`].
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            init_logging: false,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Installs the log subscriber during [`build`](Self::build).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    pub fn build(self) -> RuntimeResult<CourierRuntime> {
        let runtime = CourierRuntime::from_config(self.loader.load()?)?;
        if self.init_logging {
            runtime.init_logging()?;
        }
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
