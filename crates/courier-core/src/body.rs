//! Deserialization result contracts.
//!
//! A deserializer never raises for an ordinary format error. It returns a
//! [`MessageBodyResult`] instead, so a failing candidate handler is simply
//! skipped while the others are still evaluated.

use std::any::Any;
use std::error::Error;

/// A boxed error that can cross task boundaries.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A type-erased deserialized message.
pub type DeserializedMessage = Box<dyn Any + Send + Sync>;

const DEFAULT_FAILURE: &str = "message body could not be deserialized";

fn failure_message(message: String) -> String {
    if message.trim().is_empty() {
        DEFAULT_FAILURE.to_string()
    } else {
        message
    }
}

// =============================================================================
// Message Body Result
// =============================================================================

/// Outcome of deserializing a message body.
#[derive(Debug)]
pub enum MessageBodyResult {
    /// The body was deserialized.
    Success(DeserializedMessage),

    /// The body could not be deserialized.
    Failure {
        /// Non-blank description of the failure.
        error_message: String,
        /// Underlying codec error, if any.
        cause: Option<BoxError>,
    },
}

impl MessageBodyResult {
    /// A successful result holding `message`.
    pub fn success<T: Any + Send + Sync>(message: T) -> Self {
        Self::Success(Box::new(message))
    }

    /// A failed result with a description.
    pub fn failure(error_message: impl Into<String>) -> Self {
        Self::Failure {
            error_message: failure_message(error_message.into()),
            cause: None,
        }
    }

    /// A failed result caused by `error`.
    pub fn failure_from(error: impl Into<BoxError>) -> Self {
        let cause = error.into();
        Self::Failure {
            error_message: failure_message(cause.to_string()),
            cause: Some(cause),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure description, if failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error_message, .. } => Some(error_message),
        }
    }

    /// The underlying error, if failed with one.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            Self::Failure {
                cause: Some(cause), ..
            } => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Borrows the message as `T`, if successful and of that type.
    pub fn message<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Success(message) => message.downcast_ref::<T>(),
            Self::Failure { .. } => None,
        }
    }
}

// =============================================================================
// Legacy String-Body Result
// =============================================================================

/// Result shape of string-body serializers.
///
/// Converted into [`MessageBodyResult`] by its `From` implementation, which
/// keeps the message, the error message or the underlying error.
#[derive(Debug, Default)]
pub struct MessageResult {
    deserialized_message: Option<DeserializedMessage>,
    error_message: Option<String>,
    error: Option<BoxError>,
}

impl MessageResult {
    pub fn success<T: Any + Send + Sync>(message: T) -> Self {
        Self {
            deserialized_message: Some(Box::new(message)),
            ..Self::default()
        }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            error_message: Some(error_message.into()),
            ..Self::default()
        }
    }

    pub fn failure_from(error: impl Into<BoxError>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.deserialized_message.is_some()
    }
}

impl From<MessageResult> for MessageBodyResult {
    fn from(result: MessageResult) -> Self {
        match result {
            MessageResult {
                deserialized_message: Some(message),
                ..
            } => Self::Success(message),
            MessageResult {
                error: Some(error),
                error_message,
                ..
            } => Self::Failure {
                error_message: failure_message(error_message.unwrap_or_else(|| error.to_string())),
                cause: Some(error),
            },
            MessageResult { error_message, .. } => {
                Self::failure(error_message.unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Order {
        id: u32,
    }

    #[test]
    fn test_success_downcasts() {
        let result = MessageBodyResult::success(Order { id: 7 });
        assert!(result.is_success());
        assert_eq!(result.message::<Order>(), Some(&Order { id: 7 }));
        assert_eq!(result.message::<String>(), None);
    }

    #[test]
    fn test_failure_carries_cause() {
        let cause = serde_json::from_str::<u32>("nope").unwrap_err();
        let expected = cause.to_string();
        let result = MessageBodyResult::failure_from(cause);

        assert!(!result.is_success());
        assert_eq!(result.error_message(), Some(expected.as_str()));
        assert!(result.cause().is_some());
    }

    #[test]
    fn test_blank_failure_gets_description() {
        let result = MessageBodyResult::failure("  ");
        assert_eq!(result.error_message(), Some(DEFAULT_FAILURE));
    }

    #[test]
    fn test_legacy_success_is_preserved() {
        let result: MessageBodyResult = MessageResult::success(Order { id: 1 }).into();
        assert_eq!(result.message::<Order>(), Some(&Order { id: 1 }));
    }

    #[test]
    fn test_legacy_error_message_is_preserved() {
        let result: MessageBodyResult = MessageResult::failure("bad order").into();
        assert_eq!(result.error_message(), Some("bad order"));
        assert!(result.cause().is_none());
    }

    #[test]
    fn test_legacy_error_is_preserved() {
        let result: MessageBodyResult = MessageResult::failure_from("broken codec").into();
        assert_eq!(result.error_message(), Some("broken codec"));
        assert_eq!(result.cause().map(|e| e.to_string()).as_deref(), Some("broken codec"));
    }
}
