//! Error types for the Courier framework.

use courier_core::{ArgumentError, BoxError};
use thiserror::Error;

/// Returned by a handler that stopped because it was cancelled.
///
/// The router recognises this error, and any handler error raised while the
/// cancellation token is cancelled, and reports [`RouterError::Cancelled`]
/// instead of a handler failure.
#[derive(Debug, Clone, Copy, Error)]
#[error("message processing was cancelled")]
pub struct OperationCancelled;

/// Errors surfaced by [`MessageRouter`](crate::router::MessageRouter).
#[derive(Debug, Error)]
pub enum RouterError {
    /// A required input was blank.
    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),

    /// No registration accepted the message and no fallback is configured.
    #[error(
        "no message handler matched message '{message_id}' with context type '{context_type}' \
         (registered message types: [{message_types}])"
    )]
    NoHandlerMatched {
        /// Id of the unrouted message.
        message_id: String,
        /// Concrete type of the message context.
        context_type: &'static str,
        /// Message types of all registrations, in order.
        message_types: String,
    },

    /// The selected handler, or the fallback, returned an error.
    #[error("message handler '{handler}' failed: {source}")]
    HandlerFailed {
        /// Name of the failing handler.
        handler: String,
        /// The error returned by the handler.
        #[source]
        source: BoxError,
    },

    /// Processing stopped because the operation was cancelled.
    #[error("message processing was cancelled")]
    Cancelled,
}

impl RouterError {
    /// Whether this error is the distinguished cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for routing operations.
pub type RouterResult<T> = Result<T, RouterError>;
