//! Error types shared by the Courier core.
//!
//! Routing-level errors (no matching handler, handler failure, cancellation)
//! live in `courier-framework`.

use thiserror::Error;

// =============================================================================
// Argument Errors
// =============================================================================

/// A required input was missing or malformed.
///
/// Raised before any processing or side effect takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A required identifier was empty or whitespace.
    #[error("requires a non-blank {name}")]
    Blank {
        /// Name of the offending argument.
        name: &'static str,
    },

    /// A value was present but could not be used.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Name of the offending argument.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ArgumentError {
    /// Creates a blank-argument error.
    pub fn blank(name: &'static str) -> Self {
        Self::Blank { name }
    }

    /// Creates an invalid-argument error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Fails with [`ArgumentError::Blank`] when `value` is empty or whitespace.
pub fn require_non_blank(value: &str, name: &'static str) -> ArgumentResult<()> {
    if value.trim().is_empty() {
        Err(ArgumentError::blank(name))
    } else {
        Ok(())
    }
}

// =============================================================================
// Correlation Format Errors
// =============================================================================

/// An unrecognized correlation format was configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized message correlation format '{0}', expected 'W3C' or 'Hierarchical'")]
pub struct CorrelationFormatError(pub String);

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for argument validation.
pub type ArgumentResult<T> = Result<T, ArgumentError>;
