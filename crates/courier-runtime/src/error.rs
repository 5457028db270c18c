//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while installing the log subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The log file could not be opened.
    #[error("Failed to open log file: {0}")]
    FileAppender(#[from] tracing_appender::rolling::InitError),

    /// A global subscriber is already installed.
    #[error("Failed to install log subscriber: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
