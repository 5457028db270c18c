//! The handler registry.
//!
//! Registrations are kept in the order they were added. For one message the
//! registry walks them in that order and selects the first that accepts it;
//! later registrations are not evaluated. Registrations whose declared
//! context type does not match are skipped before any deserialization.
//!
//! ```rust,ignore
//! let mut registry = MessageHandlerRegistry::new();
//! registry
//!     .add(OrderHandler)
//!     .add_with(
//!         PriorityOrderHandler,
//!         HandlerOptions::new().body_filter(|order: &Order| order.priority > 5),
//!     )
//!     .fallback(DeadLetterHandler);
//! ```
//!
//! The registry is mutated only while a router is being configured. Once
//! [`RouterBuilder::build`](crate::router::RouterBuilder::build) freezes it,
//! it is shared read-only between concurrent routing calls.

use std::fmt;
use std::sync::Arc;

use courier_core::{DeserializedMessage, MessageContext};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::context::ContextView;
use crate::handler::{FallbackMessageHandler, MessageHandler};
use crate::registration::{
    ErasedRegistration, HandlerOptions, HandlerRegistration, MatchOutcome, SkipReason,
};

/// An ordered set of handler registrations plus an optional fallback.
#[derive(Clone, Default)]
pub struct MessageHandlerRegistry {
    registrations: Vec<Arc<dyn ErasedRegistration>>,
    fallback: Option<Arc<dyn FallbackMessageHandler>>,
}

/// The registration selected for a message, with the message it produced.
pub struct SelectedHandler<'r> {
    /// The selected registration.
    pub registration: &'r dyn ErasedRegistration,
    /// Position of the registration in the registry.
    pub position: usize,
    /// The deserialized message, to be reused for invocation.
    pub message: DeserializedMessage,
}

impl MessageHandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` with default options.
    pub fn add<M, C, H>(&mut self, handler: H) -> &mut Self
    where
        M: DeserializeOwned + Send + Sync + 'static,
        C: ContextView + ?Sized,
        H: MessageHandler<M, C>,
    {
        self.add_with(handler, HandlerOptions::new())
    }

    /// Registers `handler` with filters and/or a custom deserializer.
    pub fn add_with<M, C, H>(&mut self, handler: H, options: HandlerOptions<M, C>) -> &mut Self
    where
        M: DeserializeOwned + Send + Sync + 'static,
        C: ContextView + ?Sized,
        H: MessageHandler<M, C>,
    {
        self.add_registration(Arc::new(HandlerRegistration::new(handler, options)))
    }

    /// Registers a pre-built registration.
    pub fn add_registration(&mut self, registration: Arc<dyn ErasedRegistration>) -> &mut Self {
        debug!(
            handler = registration.name(),
            message_type = registration.message_type(),
            context_type = registration.context_type(),
            position = self.registrations.len(),
            "Registered message handler"
        );
        self.registrations.push(registration);
        self
    }

    /// Sets the handler for messages no registration accepts.
    ///
    /// Replaces any previous fallback.
    pub fn fallback<F: FallbackMessageHandler>(&mut self, fallback: F) -> &mut Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Returns the fallback handler, if any.
    pub fn fallback_handler(&self) -> Option<&Arc<dyn FallbackMessageHandler>> {
        self.fallback.as_ref()
    }

    /// Returns the number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no handler is registered. The fallback is not counted.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Message types of all registrations, in order.
    pub fn message_types(&self) -> Vec<&'static str> {
        self.registrations
            .iter()
            .map(|registration| registration.message_type())
            .collect()
    }

    /// Selects the first registration accepting the message.
    ///
    /// Returns `None` when no registration accepts it. Deserialization
    /// failures only disqualify the registration that failed.
    pub async fn select(
        &self,
        body: &[u8],
        context: &dyn MessageContext,
    ) -> Option<SelectedHandler<'_>> {
        for (position, registration) in self.registrations.iter().enumerate() {
            if !registration.accepts_context(context) {
                trace!(
                    handler = registration.name(),
                    context_type = registration.context_type(),
                    "Context type not accepted, skipping"
                );
                continue;
            }

            match registration.try_match(body, context).await {
                MatchOutcome::Matched(message) => {
                    debug!(
                        handler = registration.name(),
                        message_type = registration.message_type(),
                        position,
                        "Selected message handler"
                    );
                    return Some(SelectedHandler {
                        registration: registration.as_ref(),
                        position,
                        message,
                    });
                }
                MatchOutcome::Skipped(reason) => {
                    log_skip(registration.as_ref(), &reason);
                }
            }
        }

        None
    }
}

fn log_skip(registration: &dyn ErasedRegistration, reason: &SkipReason) {
    match reason {
        SkipReason::Deserialization(error) => trace!(
            handler = registration.name(),
            message_type = registration.message_type(),
            error = %error,
            "Message body not deserializable for handler, skipping"
        ),
        other => trace!(
            handler = registration.name(),
            reason = ?other,
            "Handler did not accept message, skipping"
        ),
    }
}

impl fmt::Debug for MessageHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandlerRegistry")
            .field("registrations", &self.registrations.len())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl fmt::Debug for SelectedHandler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedHandler")
            .field("handler", &self.registration.name())
            .field("position", &self.position)
            .finish()
    }
}
