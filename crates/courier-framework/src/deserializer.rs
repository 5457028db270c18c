//! Body deserialization pipeline.
//!
//! A [`MessageBodyDeserializer`] turns the raw body of a message into a typed
//! candidate. Registrations without a custom deserializer use
//! [`JsonBodyDeserializer`], which decodes the body with the encoding named
//! by the context before parsing it. String-based serializers plug in through
//! [`LegacySerializerAdapter`].
//!
//! Deserializers report format errors as [`MessageBodyResult::Failure`].
//! [`deserialize_guarded`] additionally turns a panicking deserializer into a
//! failure, so a broken deserializer only disqualifies its own registration.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use courier_core::{MessageBodyResult, MessageContext, MessageResult};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use tracing::warn;

// ============================================================================
// Deserializer Contract
// ============================================================================

/// Converts a raw message body into a typed message.
#[async_trait]
pub trait MessageBodyDeserializer: Send + Sync + 'static {
    /// Deserializes `body`, never panicking on malformed input.
    async fn deserialize_message(
        &self,
        body: &[u8],
        context: &dyn MessageContext,
    ) -> MessageBodyResult;
}

/// Runs `deserializer`, converting a panic into a failed result.
pub async fn deserialize_guarded(
    deserializer: &dyn MessageBodyDeserializer,
    body: &[u8],
    context: &dyn MessageContext,
) -> MessageBodyResult {
    match AssertUnwindSafe(deserializer.deserialize_message(body, context))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            warn!(
                message_id = context.message_id(),
                reason = %reason,
                "Message body deserializer panicked"
            );
            MessageBodyResult::failure(format!("message body deserializer panicked: {reason}"))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// JSON Deserializer
// ============================================================================

/// Deserializes JSON bodies into `M`.
///
/// A literal `null` body is a failure, since it carries no message.
pub struct JsonBodyDeserializer<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> JsonBodyDeserializer<M> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<M> Default for JsonBodyDeserializer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for JsonBodyDeserializer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonBodyDeserializer")
            .field("message_type", &std::any::type_name::<M>())
            .finish()
    }
}

#[async_trait]
impl<M> MessageBodyDeserializer for JsonBodyDeserializer<M>
where
    M: DeserializeOwned + Send + Sync + 'static,
{
    async fn deserialize_message(
        &self,
        body: &[u8],
        context: &dyn MessageContext,
    ) -> MessageBodyResult {
        let text = context.encoding_or_default().decode(body);
        if text.trim() == "null" {
            return MessageBodyResult::failure("message body is JSON null");
        }

        match serde_json::from_str::<M>(&text) {
            Ok(message) => MessageBodyResult::success(message),
            Err(error) => MessageBodyResult::failure_from(error),
        }
    }
}

// ============================================================================
// Legacy String-Body Serializers
// ============================================================================

/// A serializer working on decoded string bodies.
#[async_trait]
pub trait LegacyBodySerializer: Send + Sync + 'static {
    async fn deserialize_message(&self, body: &str) -> MessageResult;
}

/// Runs a [`LegacyBodySerializer`] as a [`MessageBodyDeserializer`].
///
/// The body is decoded with the context encoding (an empty body becomes an
/// empty string) and the legacy result is converted as-is.
#[derive(Debug, Clone)]
pub struct LegacySerializerAdapter<S> {
    serializer: S,
}

impl<S: LegacyBodySerializer> LegacySerializerAdapter<S> {
    pub fn new(serializer: S) -> Self {
        Self { serializer }
    }
}

#[async_trait]
impl<S: LegacyBodySerializer> MessageBodyDeserializer for LegacySerializerAdapter<S> {
    async fn deserialize_message(
        &self,
        body: &[u8],
        context: &dyn MessageContext,
    ) -> MessageBodyResult {
        let text = if body.is_empty() {
            String::new()
        } else {
            context.encoding_or_default().decode(body)
        };

        self.serializer.deserialize_message(&text).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::properties::ENCODING;
    use courier_core::{BasicMessageContext, Properties, TextEncoding};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Order {
        id: u32,
        customer: String,
    }

    fn context(properties: Properties) -> BasicMessageContext {
        BasicMessageContext::new("message-1", "job-1", properties).unwrap()
    }

    #[tokio::test]
    async fn test_json_success() {
        let result = JsonBodyDeserializer::<Order>::new()
            .deserialize_message(br#"{"id":1,"customer":"ada"}"#, &context(Properties::new()))
            .await;

        assert_eq!(
            result.message::<Order>(),
            Some(&Order {
                id: 1,
                customer: "ada".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_json_failure_keeps_cause() {
        let result = JsonBodyDeserializer::<Order>::new()
            .deserialize_message(br#"{"sku":"x"}"#, &context(Properties::new()))
            .await;

        assert!(!result.is_success());
        assert!(result.cause().is_some());
    }

    #[tokio::test]
    async fn test_json_null_is_failure() {
        let result = JsonBodyDeserializer::<Option<Order>>::new()
            .deserialize_message(b"null", &context(Properties::new()))
            .await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_json_uses_context_encoding() {
        let properties = Properties::from([(ENCODING.to_string(), json!("utf-16"))]);
        let body = TextEncoding::Utf16Le.encode(r#"{"id":2,"customer":"grace"}"#);

        let result = JsonBodyDeserializer::<Order>::new()
            .deserialize_message(&body, &context(properties))
            .await;
        assert_eq!(result.message::<Order>().map(|o| o.id), Some(2));
    }

    #[tokio::test]
    async fn test_json_unsupported_encoding_reads_utf8() {
        let properties = Properties::from([(ENCODING.to_string(), json!("x-mac-klingon"))]);
        let result = JsonBodyDeserializer::<Order>::new()
            .deserialize_message(br#"{"id":3,"customer":"alan"}"#, &context(properties))
            .await;
        assert!(result.is_success());
    }

    struct PanickingDeserializer;

    #[async_trait]
    impl MessageBodyDeserializer for PanickingDeserializer {
        async fn deserialize_message(
            &self,
            _body: &[u8],
            _context: &dyn MessageContext,
        ) -> MessageBodyResult {
            panic!("codec exploded");
        }
    }

    #[tokio::test]
    async fn test_guard_converts_panic() {
        let result =
            deserialize_guarded(&PanickingDeserializer, b"{}", &context(Properties::new())).await;

        let message = result.error_message().unwrap();
        assert!(message.contains("codec exploded"), "{message}");
    }

    struct UppercaseSerializer;

    #[async_trait]
    impl LegacyBodySerializer for UppercaseSerializer {
        async fn deserialize_message(&self, body: &str) -> MessageResult {
            if body.is_empty() {
                MessageResult::failure("empty body")
            } else {
                MessageResult::success(body.to_uppercase())
            }
        }
    }

    #[tokio::test]
    async fn test_legacy_adapter_decodes_and_converts() {
        let adapter = LegacySerializerAdapter::new(UppercaseSerializer);
        let ctx = context(Properties::new());

        let result = adapter.deserialize_message(b"order", &ctx).await;
        assert_eq!(result.message::<String>().map(String::as_str), Some("ORDER"));

        let result = adapter.deserialize_message(b"", &ctx).await;
        assert_eq!(result.error_message(), Some("empty body"));
    }
}
