//! Configuration for the Courier runtime.
//!
//! Settings are layered from defaults, configuration files and `COURIER_*`
//! environment variables with figment, then validated before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    CorrelationConfig, CourierConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    RoutingConfig, SpanEventConfig,
};
pub use validation::validate_config;
