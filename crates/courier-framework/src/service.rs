//! Tower integration for the message router.
//!
//! [`MessageRouter`] implements `tower::Service<RouteRequest>`, so transport
//! pumps can stack ordinary tower layers (timeouts, concurrency limits,
//! buffering) in front of routing:
//!
//! ```rust,ignore
//! use tower::{ServiceBuilder, ServiceExt};
//!
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(16)
//!     .service(router);
//!
//! service.oneshot(RouteRequest::new(body, context)).await?;
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use courier_core::{MessageContext, MessageCorrelationInfo};
use tokio_util::sync::CancellationToken;
use tower::Service;

use crate::error::{RouterError, RouterResult};
use crate::handler::BoxFuture;
use crate::router::{MessageRouter, RoutingOutcome};

/// An owned routing request.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Raw message body.
    pub body: Arc<[u8]>,
    /// Delivery context.
    pub context: Arc<dyn MessageContext>,
    /// Correlation to use; read from the context properties when `None`.
    pub correlation: Option<MessageCorrelationInfo>,
    /// Cancellation passed to the handler.
    pub cancellation: CancellationToken,
}

impl RouteRequest {
    /// A request whose correlation is read from the context properties.
    pub fn new(body: impl Into<Arc<[u8]>>, context: Arc<dyn MessageContext>) -> Self {
        Self {
            body: body.into(),
            context,
            correlation: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_correlation(mut self, correlation: MessageCorrelationInfo) -> Self {
        self.correlation = Some(correlation);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

impl Service<RouteRequest> for MessageRouter {
    type Response = RoutingOutcome;
    type Error = RouterError;
    type Future = BoxFuture<'static, RouterResult<RoutingOutcome>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The registry is frozen, so the router is always ready.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: RouteRequest) -> Self::Future {
        let router = self.clone();

        Box::pin(async move {
            let context: &dyn MessageContext = &*request.context;
            match &request.correlation {
                Some(correlation) => {
                    router
                        .route_message(&request.body, context, correlation, request.cancellation)
                        .await
                }
                None => {
                    router
                        .route_message_correlated(&request.body, context, request.cancellation)
                        .await
                }
            }
        })
    }
}
