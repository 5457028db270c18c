//! Courier Runtime - configuration and logging for the Courier message router.
//!
//! This crate provides:
//! - Layered configuration (`courier.toml`, `COURIER_*` environment variables)
//! - Configuration validation, including the correlation format
//! - Log subscriber setup (`LoggingBuilder`)
//! - [`CourierRuntime`], which turns configuration into router options
//!
//! ```ignore
//! use courier_runtime::CourierRuntime;
//!
//! let runtime = CourierRuntime::builder().init_logging(true).build()?;
//! let router = runtime.router_builder().handler(OrderHandler).build();
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, CourierConfig, LoggingConfig, RoutingConfig,
};
pub use error::{LoggingError, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{CourierRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span types.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
