//! Configuration error types.

use std::path::PathBuf;

use courier_core::CorrelationFormatError;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Sources could not be merged or extracted.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A value is present but unusable.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// A required value is blank.
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// The correlation format is not one of the supported names.
    #[error(transparent)]
    CorrelationFormat(#[from] CorrelationFormatError),
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::ParseError(error.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
