//! Handler registrations.
//!
//! A registration binds a [`MessageHandler`] to the message type it expects,
//! the context type it is declared over, its filters and its deserializer.
//! [`HandlerOptions`] is the single place where the optional parts are
//! configured. Registrations are type-erased behind [`ErasedRegistration`] so
//! the registry can hold handlers of any message and context type in one
//! ordered list.
//!
//! Matching one registration against a message runs these steps, stopping at
//! the first that fails:
//!
//! 1. The runtime context must be viewable as the declared context type.
//! 2. The deserializer must succeed.
//! 3. The deserialized message must be of the declared message type.
//! 4. Every body filter must accept the message.
//! 5. Every context filter must accept the context.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{
    BoxError, DeserializedMessage, MessageBodyResult, MessageContext, MessageCorrelationInfo,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::context::ContextView;
use crate::deserializer::{
    JsonBodyDeserializer, LegacyBodySerializer, LegacySerializerAdapter, MessageBodyDeserializer,
    deserialize_guarded,
};
use crate::handler::MessageHandler;

/// A predicate over a deserialized message.
pub type BodyFilter<M> = Arc<dyn Fn(&M) -> bool + Send + Sync>;

/// A predicate over a message context.
pub type ContextFilter<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

// ============================================================================
// Handler Options
// ============================================================================

/// Optional parts of a registration.
///
/// All body filters and all context filters must accept a message for the
/// registration to be selected.
///
/// ```rust,ignore
/// let options = HandlerOptions::<Order, BusMessageContext>::new()
///     .name("priority-orders")
///     .body_filter(|order| order.priority > 5)
///     .context_filter(|ctx| ctx.entity_path() == "orders");
/// ```
pub struct HandlerOptions<M, C: ?Sized> {
    name: Option<String>,
    body_filters: Vec<BodyFilter<M>>,
    context_filters: Vec<ContextFilter<C>>,
    deserializer: Option<Arc<dyn MessageBodyDeserializer>>,
}

impl<M, C: ?Sized> Default for HandlerOptions<M, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, C: ?Sized> HandlerOptions<M, C> {
    /// Options with no filters and the default JSON deserializer.
    pub fn new() -> Self {
        Self {
            name: None,
            body_filters: Vec::new(),
            context_filters: Vec::new(),
            deserializer: None,
        }
    }

    /// Names the registration in logs and errors.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a predicate over the deserialized message.
    pub fn body_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&M) -> bool + Send + Sync + 'static,
    {
        self.body_filters.push(Arc::new(filter));
        self
    }

    /// Adds a predicate over the message context.
    pub fn context_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.context_filters.push(Arc::new(filter));
        self
    }

    /// Replaces the default JSON deserializer.
    pub fn deserializer<D: MessageBodyDeserializer>(mut self, deserializer: D) -> Self {
        self.deserializer = Some(Arc::new(deserializer));
        self
    }

    /// Replaces the default JSON deserializer with a string-based serializer.
    pub fn legacy_serializer<S: LegacyBodySerializer>(self, serializer: S) -> Self {
        self.deserializer(LegacySerializerAdapter::new(serializer))
    }
}

impl<M, C: ?Sized> fmt::Debug for HandlerOptions<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("name", &self.name)
            .field("body_filters", &self.body_filters.len())
            .field("context_filters", &self.context_filters.len())
            .field("custom_deserializer", &self.deserializer.is_some())
            .finish()
    }
}

// ============================================================================
// Type-Erased Registration
// ============================================================================

/// Why a registration did not accept a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The context is not of the declared type.
    ContextType,
    /// The deserializer failed.
    Deserialization(String),
    /// The deserializer produced a different message type.
    MessageType,
    /// A body filter rejected the message.
    BodyFilter,
    /// A context filter rejected the context.
    ContextFilter,
}

/// Outcome of matching one registration against a message.
#[derive(Debug)]
pub enum MatchOutcome {
    /// The registration accepts the message, deserialized as shown.
    Matched(DeserializedMessage),
    /// The registration does not accept the message.
    Skipped(SkipReason),
}

/// A registration with its message and context types erased.
#[async_trait]
pub trait ErasedRegistration: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Name of the declared message type.
    fn message_type(&self) -> &'static str;

    /// Name of the declared context type.
    fn context_type(&self) -> &'static str;

    /// Whether the runtime context is of the declared context type.
    fn accepts_context(&self, context: &dyn MessageContext) -> bool;

    /// Deserializes and filters the message.
    async fn try_match(&self, body: &[u8], context: &dyn MessageContext) -> MatchOutcome;

    /// Invokes the handler with a message produced by [`try_match`](Self::try_match).
    async fn invoke(
        &self,
        message: DeserializedMessage,
        context: &dyn MessageContext,
        correlation: &MessageCorrelationInfo,
        cancellation: CancellationToken,
    ) -> Result<(), BoxError>;
}

/// A registration for handler `H` of messages `M` in contexts `C`.
pub struct HandlerRegistration<M, C: ?Sized, H> {
    handler: H,
    name: String,
    body_filters: Vec<BodyFilter<M>>,
    context_filters: Vec<ContextFilter<C>>,
    deserializer: Arc<dyn MessageBodyDeserializer>,
    _marker: PhantomData<fn(&C) -> M>,
}

impl<M, C, H> HandlerRegistration<M, C, H>
where
    M: DeserializeOwned + Send + Sync + 'static,
    C: ContextView + ?Sized,
    H: MessageHandler<M, C>,
{
    /// Creates a registration, defaulting to JSON deserialization of `M`.
    pub fn new(handler: H, options: HandlerOptions<M, C>) -> Self {
        Self {
            handler,
            name: options.name.unwrap_or_else(|| type_name::<H>().to_string()),
            body_filters: options.body_filters,
            context_filters: options.context_filters,
            deserializer: options.deserializer.unwrap_or_else(|| {
                Arc::new(JsonBodyDeserializer::<M>::new()) as Arc<dyn MessageBodyDeserializer>
            }),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<M, C, H> ErasedRegistration for HandlerRegistration<M, C, H>
where
    M: DeserializeOwned + Send + Sync + 'static,
    C: ContextView + ?Sized,
    H: MessageHandler<M, C>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn message_type(&self) -> &'static str {
        type_name::<M>()
    }

    fn context_type(&self) -> &'static str {
        C::view_name()
    }

    fn accepts_context(&self, context: &dyn MessageContext) -> bool {
        C::view(context).is_some()
    }

    async fn try_match(&self, body: &[u8], context: &dyn MessageContext) -> MatchOutcome {
        let Some(typed_context) = C::view(context) else {
            return MatchOutcome::Skipped(SkipReason::ContextType);
        };

        let message = match deserialize_guarded(self.deserializer.as_ref(), body, context).await {
            MessageBodyResult::Success(message) => message,
            MessageBodyResult::Failure { error_message, .. } => {
                return MatchOutcome::Skipped(SkipReason::Deserialization(error_message));
            }
        };

        let Some(typed_message) = message.downcast_ref::<M>() else {
            return MatchOutcome::Skipped(SkipReason::MessageType);
        };

        if !self.body_filters.iter().all(|filter| filter(typed_message)) {
            return MatchOutcome::Skipped(SkipReason::BodyFilter);
        }

        if !self
            .context_filters
            .iter()
            .all(|filter| filter(typed_context))
        {
            return MatchOutcome::Skipped(SkipReason::ContextFilter);
        }

        MatchOutcome::Matched(message)
    }

    async fn invoke(
        &self,
        message: DeserializedMessage,
        context: &dyn MessageContext,
        correlation: &MessageCorrelationInfo,
        cancellation: CancellationToken,
    ) -> Result<(), BoxError> {
        let message = message.downcast::<M>().map_err(|_| {
            BoxError::from(format!(
                "registration '{}' received a message that is not a {}",
                self.name,
                type_name::<M>()
            ))
        })?;
        let typed_context = C::view(context).ok_or_else(|| {
            BoxError::from(format!(
                "registration '{}' received a context that is not a {}",
                self.name,
                C::view_name()
            ))
        })?;

        trace!(
            handler = %self.name,
            message_type = type_name::<M>(),
            "Invoking message handler"
        );
        self.handler
            .process_message(*message, typed_context, correlation, cancellation)
            .await
    }
}

impl<M, C: ?Sized, H> fmt::Debug for HandlerRegistration<M, C, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("name", &self.name)
            .field("message_type", &type_name::<M>())
            .field("body_filters", &self.body_filters.len())
            .field("context_filters", &self.context_filters.len())
            .finish()
    }
}
