//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use courier_core::{CorrelationOptions, HierarchicalOptions, MessageCorrelationFormat};
use courier_framework::{DEFAULT_OPERATION_NAME, RouterOptions, TelemetryOptions};
use serde::{Deserialize, Serialize};

use super::error::ConfigResult;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Log subscriber settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Router settings.
    #[serde(default)]
    pub routing: RoutingConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; otherwise written as `full`.
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `logging.file_path`.
    File,
}

/// How often file output starts a new file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Log subscriber settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Per-target levels, e.g. `courier_framework = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,
}

// =============================================================================
// Routing
// =============================================================================

/// Router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Name of the request operation reported to telemetry.
    #[serde(default = "default_operation_name")]
    pub operation_name: String,

    #[serde(default)]
    pub correlation: CorrelationConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            operation_name: default_operation_name(),
            correlation: CorrelationConfig::default(),
        }
    }
}

impl RoutingConfig {
    /// Converts to router options.
    ///
    /// Fails when the correlation format is not a known format name.
    pub fn to_router_options(&self) -> ConfigResult<RouterOptions> {
        let format: MessageCorrelationFormat = self.correlation.format.parse()?;

        Ok(RouterOptions {
            telemetry: TelemetryOptions {
                operation_name: self.operation_name.clone(),
            },
            correlation: CorrelationOptions {
                format,
                hierarchical: HierarchicalOptions {
                    transaction_id_property: self.correlation.transaction_id_property.clone(),
                    operation_parent_id_property: self
                        .correlation
                        .operation_parent_id_property
                        .clone(),
                    operation_id_property: self.correlation.operation_id_property.clone(),
                },
            },
        })
    }
}

fn default_operation_name() -> String {
    DEFAULT_OPERATION_NAME.to_string()
}

/// How correlation is read from inbound message properties.
///
/// The format is kept as text so that an unknown name is reported by
/// validation rather than as a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// `w3c` or `hierarchical`, case-insensitive.
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_transaction_id_property")]
    pub transaction_id_property: String,

    #[serde(default = "default_operation_parent_id_property")]
    pub operation_parent_id_property: String,

    #[serde(default = "default_operation_id_property")]
    pub operation_id_property: String,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        let hierarchical = HierarchicalOptions::default();
        Self {
            format: default_format(),
            transaction_id_property: hierarchical.transaction_id_property,
            operation_parent_id_property: hierarchical.operation_parent_id_property,
            operation_id_property: hierarchical.operation_id_property,
        }
    }
}

fn default_format() -> String {
    MessageCorrelationFormat::default().as_str().to_string()
}

fn default_transaction_id_property() -> String {
    HierarchicalOptions::default().transaction_id_property
}

fn default_operation_parent_id_property() -> String {
    HierarchicalOptions::default().operation_parent_id_property
}

fn default_operation_id_property() -> String {
    HierarchicalOptions::default().operation_id_property
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use courier_core::properties;

    #[test]
    fn test_default_routing_options() {
        let options = RoutingConfig::default().to_router_options().unwrap();

        assert_eq!(options, RouterOptions::default());
        assert_eq!(options.telemetry.operation_name, "Process");
        assert_eq!(options.correlation.format, MessageCorrelationFormat::W3C);
        assert_eq!(
            options.correlation.hierarchical.transaction_id_property,
            properties::TRANSACTION_ID
        );
    }

    #[test]
    fn test_hierarchical_options_carry_property_names() {
        let routing = RoutingConfig {
            operation_name: "Ingest".into(),
            correlation: CorrelationConfig {
                format: "Hierarchical".into(),
                transaction_id_property: "X-Transaction".into(),
                ..CorrelationConfig::default()
            },
        };

        let options = routing.to_router_options().unwrap();
        assert_eq!(options.telemetry.operation_name, "Ingest");
        assert_eq!(options.correlation.format, MessageCorrelationFormat::Hierarchical);
        assert_eq!(options.correlation.hierarchical.transaction_id_property, "X-Transaction");
        assert_eq!(
            options.correlation.hierarchical.operation_parent_id_property,
            properties::OPERATION_PARENT_ID
        );
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let mut routing = RoutingConfig::default();
        routing.correlation.format = "zipkin".into();

        let err = routing.to_router_options().unwrap_err();
        assert!(matches!(err, ConfigError::CorrelationFormat(_)));
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::default().to_tracing_level(), tracing::Level::INFO);
    }
}
