//! Handler contracts.
//!
//! A [`MessageHandler`] processes one deserialized message type `M`, declared
//! over a context type `C` (any [`ContextView`](crate::context::ContextView):
//! a concrete context, or `dyn MessageContext` to accept every context). A
//! [`FallbackMessageHandler`] receives the raw body of messages no typed
//! handler accepted.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use courier_framework::MessageHandler;
//!
//! struct OrderHandler;
//!
//! #[async_trait]
//! impl MessageHandler<Order, BusMessageContext> for OrderHandler {
//!     async fn process_message(
//!         &self,
//!         order: Order,
//!         context: &BusMessageContext,
//!         correlation: &MessageCorrelationInfo,
//!         cancellation: CancellationToken,
//!     ) -> Result<(), BoxError> {
//!         info!(order = order.id, entity = context.entity_path(), "Processing order");
//!         Ok(())
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use courier_core::{BoxError, MessageContext, MessageCorrelationInfo};
use tokio_util::sync::CancellationToken;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Processes deserialized messages of type `M` received with context `C`.
#[async_trait]
pub trait MessageHandler<M, C = dyn MessageContext>: Send + Sync + 'static
where
    M: Send + 'static,
    C: ?Sized + Sync + 'static,
{
    /// Processes one message.
    ///
    /// Handlers should stop early when `cancellation` fires, returning
    /// [`OperationCancelled`](crate::error::OperationCancelled) or any error.
    async fn process_message(
        &self,
        message: M,
        context: &C,
        correlation: &MessageCorrelationInfo,
        cancellation: CancellationToken,
    ) -> Result<(), BoxError>;
}

/// Processes the raw body of messages no typed handler accepted.
#[async_trait]
pub trait FallbackMessageHandler: Send + Sync + 'static {
    /// Handles the undecoded `body`; an error fails the routing call.
    async fn process_message(
        &self,
        body: &[u8],
        context: &dyn MessageContext,
        correlation: &MessageCorrelationInfo,
        cancellation: CancellationToken,
    ) -> Result<(), BoxError>;
}
