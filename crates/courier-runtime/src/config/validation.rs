//! Configuration validation.

use courier_core::MessageCorrelationFormat;

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, LogOutput, LoggingConfig, RoutingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_routing_config(&config.routing)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter targets cannot be blank"));
    }

    Ok(())
}

fn validate_routing_config(routing: &RoutingConfig) -> ConfigResult<()> {
    require("routing.operation_name", &routing.operation_name)?;

    let correlation = &routing.correlation;
    correlation.format.parse::<MessageCorrelationFormat>()?;
    require(
        "routing.correlation.transaction_id_property",
        &correlation.transaction_id_property,
    )?;
    require(
        "routing.correlation.operation_parent_id_property",
        &correlation.operation_parent_id_property,
    )?;
    require(
        "routing.correlation.operation_id_property",
        &correlation.operation_id_property,
    )?;

    Ok(())
}

fn require(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::missing_field(field));
    }
    Ok(())
}
