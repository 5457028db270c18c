//! The message router.
//!
//! [`MessageRouter`] is the entry point a transport pump calls for every
//! inbound message. Routing one message:
//!
//! 1. Validates the context (blank ids fail before any side effect)
//! 2. Starts the telemetry operation and publishes the correlation
//! 3. Selects the first registration accepting the message
//! 4. Invokes it with the message deserialized during selection, or invokes
//!    the fallback handler with the raw body when nothing matched
//! 5. Emits the request record and completes the operation exactly once
//!
//! # Configuration Phase
//!
//! Handlers are registered on a [`RouterBuilder`]. [`RouterBuilder::build`]
//! freezes the registry; the resulting router is cheap to clone and can be
//! shared between any number of concurrent routing calls.
//!
//! ```rust,ignore
//! use courier_framework::{HandlerOptions, MessageRouter};
//!
//! let router = MessageRouter::builder()
//!     .handler(OrderHandler)
//!     .handler_with(
//!         PriorityOrderHandler,
//!         HandlerOptions::new().body_filter(|order: &Order| order.priority > 5),
//!     )
//!     .fallback(DeadLetterHandler)
//!     .correlation_scope(MyTelemetry::new())
//!     .build();
//!
//! router
//!     .route_message(&body, &context, &correlation, cancellation)
//!     .await?;
//! ```
//!
//! `MessageRouter` also implements `tower::Service`, see
//! [`RouteRequest`](crate::service::RouteRequest).

use std::fmt;
use std::sync::Arc;

use courier_core::{
    BoxError, CorrelationOptions, MessageContext, MessageCorrelationInfo,
    MessageCorrelationResult, determine_correlation, foundation::require_non_blank,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::accessor::{CorrelationAccessor, with_correlation};
use crate::context::ContextView;
use crate::error::{OperationCancelled, RouterError, RouterResult};
use crate::handler::{FallbackMessageHandler, MessageHandler};
use crate::registration::HandlerOptions;
use crate::registry::MessageHandlerRegistry;
use crate::telemetry::{CorrelationScope, RequestGuard, RequestOutcome, TelemetryOptions};

const FALLBACK_HANDLER: &str = "fallback";

// ============================================================================
// Options and Outcomes
// ============================================================================

/// Router-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterOptions {
    /// Settings passed to the telemetry backend.
    #[serde(default)]
    pub telemetry: TelemetryOptions,

    /// How [`MessageRouter::route_message_correlated`] reads correlation.
    #[serde(default)]
    pub correlation: CorrelationOptions,
}

/// What handled a routed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// A registered handler processed the message.
    Handled {
        /// Name of the handler.
        handler: String,
        /// Message type the body was deserialized into.
        message_type: &'static str,
    },
    /// The fallback handler processed the raw body.
    Fallback,
}

// ============================================================================
// Builder
// ============================================================================

/// Configures a [`MessageRouter`].
#[derive(Default)]
pub struct RouterBuilder {
    registry: MessageHandlerRegistry,
    options: RouterOptions,
    scope: Option<Arc<dyn CorrelationScope>>,
    accessor: Option<Arc<dyn CorrelationAccessor>>,
}

impl RouterBuilder {
    /// Creates a builder with no handlers and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler with default options.
    pub fn handler<M, C, H>(mut self, handler: H) -> Self
    where
        M: DeserializeOwned + Send + Sync + 'static,
        C: ContextView + ?Sized,
        H: MessageHandler<M, C>,
    {
        self.registry.add(handler);
        self
    }

    /// Registers a handler with filters and/or a custom deserializer.
    pub fn handler_with<M, C, H>(mut self, handler: H, options: HandlerOptions<M, C>) -> Self
    where
        M: DeserializeOwned + Send + Sync + 'static,
        C: ContextView + ?Sized,
        H: MessageHandler<M, C>,
    {
        self.registry.add_with(handler, options);
        self
    }

    /// Sets the fallback handler.
    pub fn fallback<F: FallbackMessageHandler>(mut self, fallback: F) -> Self {
        self.registry.fallback(fallback);
        self
    }

    /// Replaces the registry built so far.
    pub fn registry(mut self, registry: MessageHandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets all router options.
    pub fn options(mut self, options: RouterOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the telemetry options.
    pub fn telemetry(mut self, telemetry: TelemetryOptions) -> Self {
        self.options.telemetry = telemetry;
        self
    }

    /// Sets how correlation is read from message properties.
    pub fn correlation(mut self, correlation: CorrelationOptions) -> Self {
        self.options.correlation = correlation;
        self
    }

    /// Sets the telemetry backend.
    pub fn correlation_scope<S: CorrelationScope>(mut self, scope: S) -> Self {
        self.scope = Some(Arc::new(scope));
        self
    }

    /// Sets a shared telemetry backend.
    pub fn shared_correlation_scope(mut self, scope: Arc<dyn CorrelationScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Sets an accessor told about the correlation of every message.
    pub fn correlation_accessor(mut self, accessor: Arc<dyn CorrelationAccessor>) -> Self {
        self.accessor = Some(accessor);
        self
    }

    /// Freezes the configuration into a router.
    pub fn build(self) -> MessageRouter {
        debug!(
            handlers = self.registry.len(),
            has_fallback = self.registry.fallback_handler().is_some(),
            operation_name = %self.options.telemetry.operation_name,
            correlation_format = %self.options.correlation.format,
            "Message router built"
        );

        MessageRouter {
            inner: Arc::new(RouterInner {
                registry: self.registry,
                options: self.options,
                scope: self.scope,
                accessor: self.accessor,
            }),
        }
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

struct RouterInner {
    registry: MessageHandlerRegistry,
    options: RouterOptions,
    scope: Option<Arc<dyn CorrelationScope>>,
    accessor: Option<Arc<dyn CorrelationAccessor>>,
}

/// Routes inbound messages to their handlers.
///
/// Cloning is cheap; clones share the same frozen registry.
#[derive(Clone)]
pub struct MessageRouter {
    inner: Arc<RouterInner>,
}

impl MessageRouter {
    /// Starts configuring a router.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// The frozen registry.
    pub fn registry(&self) -> &MessageHandlerRegistry {
        &self.inner.registry
    }

    /// Telemetry and correlation options fixed at build time.
    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }

    /// Routes one message.
    ///
    /// # Errors
    ///
    /// - [`RouterError::InvalidArgument`] when the context has a blank message
    ///   or job id; nothing is started in that case.
    /// - [`RouterError::NoHandlerMatched`] when no registration accepts the
    ///   message and no fallback is configured.
    /// - [`RouterError::HandlerFailed`] with the handler's error.
    /// - [`RouterError::Cancelled`] when the handler stopped because of
    ///   cancellation.
    pub async fn route_message(
        &self,
        body: &[u8],
        context: &dyn MessageContext,
        correlation: &MessageCorrelationInfo,
        cancellation: CancellationToken,
    ) -> RouterResult<RoutingOutcome> {
        require_non_blank(context.message_id(), "message id")?;
        require_non_blank(context.job_id(), "job id")?;

        let options = &self.inner.options;
        let started = match &self.inner.scope {
            Some(scope) => scope.start_operation(context, correlation, &options.telemetry),
            None => MessageCorrelationResult::detached(correlation.clone()),
        };
        let correlation = started.correlation_info().clone();
        let guard = RequestGuard::start(context, started, &options.telemetry);

        if let Some(accessor) = &self.inner.accessor {
            accessor.set_correlation_info(&correlation);
        }

        let span = info_span!(
            "route_message",
            message_id = %context.message_id(),
            job_id = %context.job_id(),
            operation_id = %correlation.operation_id(),
            transaction_id = %correlation.transaction_id(),
            operation_parent_id = correlation.operation_parent_id().unwrap_or("-"),
        );

        let result = with_correlation(
            correlation.clone(),
            self.dispatch(body, context, &correlation, cancellation),
        )
        .instrument(span.clone())
        .await;

        let outcome = match &result {
            Ok(_) => RequestOutcome::Succeeded,
            Err(RouterError::Cancelled) => RequestOutcome::Cancelled,
            Err(_) => RequestOutcome::Failed,
        };
        span.in_scope(|| guard.finish(outcome));

        result
    }

    /// Routes one message, reading its correlation from the context
    /// properties with the configured [`CorrelationOptions`].
    pub async fn route_message_correlated(
        &self,
        body: &[u8],
        context: &dyn MessageContext,
        cancellation: CancellationToken,
    ) -> RouterResult<RoutingOutcome> {
        let correlation =
            determine_correlation(context.properties(), &self.inner.options.correlation);
        self.route_message(body, context, &correlation, cancellation)
            .await
    }

    async fn dispatch(
        &self,
        body: &[u8],
        context: &dyn MessageContext,
        correlation: &MessageCorrelationInfo,
        cancellation: CancellationToken,
    ) -> RouterResult<RoutingOutcome> {
        let registry = &self.inner.registry;

        if let Some(selected) = registry.select(body, context).await {
            let handler = selected.registration.name().to_string();
            let message_type = selected.registration.message_type();

            return match selected
                .registration
                .invoke(selected.message, context, correlation, cancellation.clone())
                .await
            {
                Ok(()) => Ok(RoutingOutcome::Handled {
                    handler,
                    message_type,
                }),
                Err(error) => Err(handler_error(handler, error, &cancellation)),
            };
        }

        let Some(fallback) = registry.fallback_handler() else {
            warn!(
                context_type = context.context_type_name(),
                handlers = registry.len(),
                "No message handler matched and no fallback is configured"
            );
            return Err(RouterError::NoHandlerMatched {
                message_id: context.message_id().to_string(),
                context_type: context.context_type_name(),
                message_types: registry.message_types().join(", "),
            });
        };

        warn!("No message handler matched, using fallback handler");
        match fallback
            .process_message(body, context, correlation, cancellation.clone())
            .await
        {
            Ok(()) => Ok(RoutingOutcome::Fallback),
            Err(error) => Err(handler_error(
                FALLBACK_HANDLER.to_string(),
                error,
                &cancellation,
            )),
        }
    }
}

fn handler_error(handler: String, error: BoxError, cancellation: &CancellationToken) -> RouterError {
    if error.is::<OperationCancelled>() || cancellation.is_cancelled() {
        debug!(handler = %handler, %error, "Message handler stopped on cancellation");
        RouterError::Cancelled
    } else {
        warn!(handler = %handler, %error, "Message handler failed");
        RouterError::HandlerFailed {
            handler,
            source: error,
        }
    }
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRouter")
            .field("registry", &self.inner.registry)
            .field("options", &self.inner.options)
            .field("has_scope", &self.inner.scope.is_some())
            .field("has_accessor", &self.inner.accessor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{LatestCorrelation, current_correlation};
    use async_trait::async_trait;
    use courier_core::{
        BasicMessageContext, BusMessageContext, HierarchicalOptions, MessageCorrelationFormat,
        Properties, properties,
    };
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Order {
        id: u32,
        customer: String,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Shipment {
        tracking_code: String,
    }

    const ORDER: &[u8] = br#"{"id":42,"customer":"ada"}"#;

    /// Records every message and the correlation it was handled under.
    struct Recording<M> {
        seen: Arc<Mutex<Vec<M>>>,
        correlations: Arc<Mutex<Vec<MessageCorrelationInfo>>>,
        current: Arc<Mutex<Vec<Option<MessageCorrelationInfo>>>>,
    }

    impl<M> Recording<M> {
        fn new() -> Self {
            Self {
                seen: Arc::default(),
                correlations: Arc::default(),
                current: Arc::default(),
            }
        }

        fn handle(&self) -> Self {
            Self {
                seen: Arc::clone(&self.seen),
                correlations: Arc::clone(&self.correlations),
                current: Arc::clone(&self.current),
            }
        }

        fn count(&self) -> usize {
            self.seen.lock().len()
        }
    }

    #[async_trait]
    impl<M: Send + 'static> MessageHandler<M> for Recording<M> {
        async fn process_message(
            &self,
            message: M,
            _context: &dyn MessageContext,
            correlation: &MessageCorrelationInfo,
            _cancellation: CancellationToken,
        ) -> Result<(), BoxError> {
            self.seen.lock().push(message);
            self.correlations.lock().push(correlation.clone());
            self.current.lock().push(current_correlation());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl MessageHandler<Order> for Failing {
        async fn process_message(
            &self,
            _message: Order,
            _context: &dyn MessageContext,
            _correlation: &MessageCorrelationInfo,
            _cancellation: CancellationToken,
        ) -> Result<(), BoxError> {
            Err("database unavailable".into())
        }
    }

    /// Waits for cancellation, then reports it.
    struct WaitsForCancel;

    #[async_trait]
    impl MessageHandler<Order> for WaitsForCancel {
        async fn process_message(
            &self,
            _message: Order,
            _context: &dyn MessageContext,
            _correlation: &MessageCorrelationInfo,
            cancellation: CancellationToken,
        ) -> Result<(), BoxError> {
            cancellation.cancelled().await;
            Err(OperationCancelled.into())
        }
    }

    /// Never finishes.
    struct Stuck;

    #[async_trait]
    impl MessageHandler<Order> for Stuck {
        async fn process_message(
            &self,
            _message: Order,
            _context: &dyn MessageContext,
            _correlation: &MessageCorrelationInfo,
            _cancellation: CancellationToken,
        ) -> Result<(), BoxError> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct RecordingFallback {
        bodies: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    #[async_trait]
    impl FallbackMessageHandler for RecordingFallback {
        async fn process_message(
            &self,
            body: &[u8],
            _context: &dyn MessageContext,
            _correlation: &MessageCorrelationInfo,
            _cancellation: CancellationToken,
        ) -> Result<(), BoxError> {
            self.bodies.lock().push(body.to_vec());
            Ok(())
        }
    }

    /// Records every completion and optionally replaces the operation id.
    #[derive(Default, Clone)]
    struct RecordingScope {
        started: Arc<AtomicUsize>,
        completions: Arc<Mutex<Vec<bool>>>,
        operation_id: Option<&'static str>,
    }

    impl CorrelationScope for RecordingScope {
        fn start_operation(
            &self,
            _context: &dyn MessageContext,
            correlation: &MessageCorrelationInfo,
            _options: &TelemetryOptions,
        ) -> MessageCorrelationResult {
            self.started.fetch_add(1, Ordering::SeqCst);
            let info = match self.operation_id {
                Some(operation_id) => MessageCorrelationInfo::new(
                    operation_id,
                    correlation.transaction_id(),
                    correlation.operation_parent_id().map(str::to_string),
                )
                .unwrap(),
                None => correlation.clone(),
            };
            let completions = Arc::clone(&self.completions);
            MessageCorrelationResult::new(info, move |ok| completions.lock().push(ok))
        }
    }

    /// A context that does not validate its ids.
    #[derive(Debug)]
    struct RawContext {
        message_id: String,
        job_id: String,
        properties: Properties,
    }

    impl MessageContext for RawContext {
        fn message_id(&self) -> &str {
            &self.message_id
        }

        fn job_id(&self) -> &str {
            &self.job_id
        }

        fn properties(&self) -> &Properties {
            &self.properties
        }
    }

    fn context() -> BasicMessageContext {
        BasicMessageContext::new("message-1", "job-1", Properties::new()).unwrap()
    }

    fn correlation() -> MessageCorrelationInfo {
        MessageCorrelationInfo::new("operation-1", "transaction-1", Some("parent-1".into())).unwrap()
    }

    async fn route(router: &MessageRouter, body: &[u8]) -> RouterResult<RoutingOutcome> {
        router
            .route_message(body, &context(), &correlation(), CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_single_handler_invoked_once() {
        let orders = Recording::<Order>::new();
        let scope = RecordingScope::default();
        let router = MessageRouter::builder()
            .handler_with(orders.handle(), HandlerOptions::new().name("orders"))
            .correlation_scope(scope.clone())
            .build();

        let outcome = route(&router, ORDER).await.unwrap();

        assert_eq!(
            outcome,
            RoutingOutcome::Handled {
                handler: "orders".into(),
                message_type: std::any::type_name::<Order>(),
            }
        );
        assert_eq!(
            *orders.seen.lock(),
            vec![Order {
                id: 42,
                customer: "ada".into()
            }]
        );
        assert_eq!(*scope.completions.lock(), vec![true]);
    }

    #[tokio::test]
    async fn test_fallback_receives_unmatched_body() {
        let orders = Recording::<Order>::new();
        let fallback = RecordingFallback::default();
        let scope = RecordingScope::default();
        let router = MessageRouter::builder()
            .handler(orders.handle())
            .fallback(fallback.clone())
            .correlation_scope(scope.clone())
            .build();

        let body = br#"{"sku":"A-1"}"#;
        let outcome = route(&router, body).await.unwrap();

        assert_eq!(outcome, RoutingOutcome::Fallback);
        assert_eq!(orders.count(), 0);
        assert_eq!(*fallback.bodies.lock(), vec![body.to_vec()]);
        assert_eq!(*scope.completions.lock(), vec![true]);
    }

    #[tokio::test]
    async fn test_no_handler_matched_without_fallback() {
        let orders = Recording::<Order>::new();
        let scope = RecordingScope::default();
        let router = MessageRouter::builder()
            .handler(orders.handle())
            .correlation_scope(scope.clone())
            .build();

        let err = route(&router, b"not json").await.unwrap_err();

        match err {
            RouterError::NoHandlerMatched {
                message_id,
                context_type,
                message_types,
            } => {
                assert_eq!(message_id, "message-1");
                assert!(context_type.ends_with("BasicMessageContext"));
                assert!(message_types.ends_with("Order"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(orders.count(), 0);
        assert_eq!(*scope.completions.lock(), vec![false]);
    }

    #[tokio::test]
    async fn test_first_accepting_registration_wins() {
        let first = Recording::<Order>::new();
        let second = Recording::<Order>::new();
        let router = MessageRouter::builder()
            .handler_with(
                first.handle(),
                HandlerOptions::new().body_filter(|order: &Order| order.id > 100),
            )
            .handler(second.handle())
            .handler(first.handle())
            .build();

        route(&router, ORDER).await.unwrap();
        assert_eq!((first.count(), second.count()), (0, 1));

        route(&router, br#"{"id":500,"customer":"bob"}"#)
            .await
            .unwrap();
        assert_eq!((first.count(), second.count()), (1, 1));
    }

    #[tokio::test]
    async fn test_deserialization_failure_falls_through() {
        let shipments = Recording::<Shipment>::new();
        let orders = Recording::<Order>::new();
        let router = MessageRouter::builder()
            .handler(shipments.handle())
            .handler(orders.handle())
            .build();

        route(&router, ORDER).await.unwrap();
        assert_eq!((shipments.count(), orders.count()), (0, 1));

        route(&router, br#"{"tracking_code":"TC-9"}"#)
            .await
            .unwrap();
        assert_eq!(shipments.seen.lock()[0].tracking_code, "TC-9");
    }

    #[tokio::test]
    async fn test_context_filter_sees_concrete_context() {
        let orders = Recording::<Order>::new();
        let router = MessageRouter::builder()
            .handler_with(
                orders.handle(),
                HandlerOptions::<Order, dyn MessageContext>::new()
                    .context_filter(|context| context.job_id() == "job-2"),
            )
            .fallback(RecordingFallback::default())
            .build();

        assert_eq!(route(&router, ORDER).await.unwrap(), RoutingOutcome::Fallback);

        let other_job = BasicMessageContext::new("message-2", "job-2", Properties::new()).unwrap();
        router
            .route_message(ORDER, &other_job, &correlation(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(orders.count(), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_reported_once() {
        let scope = RecordingScope::default();
        let router = MessageRouter::builder()
            .handler_with(Failing, HandlerOptions::new().name("failing"))
            .correlation_scope(scope.clone())
            .build();

        let err = route(&router, ORDER).await.unwrap_err();

        match &err {
            RouterError::HandlerFailed { handler, source } => {
                assert_eq!(handler, "failing");
                assert_eq!(source.to_string(), "database unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(*scope.completions.lock(), vec![false]);
    }

    #[tokio::test]
    async fn test_cancellation_is_distinguished() {
        let scope = RecordingScope::default();
        let router = MessageRouter::builder()
            .handler(WaitsForCancel)
            .correlation_scope(scope.clone())
            .build();

        let cancellation = CancellationToken::new();
        let trigger = cancellation.clone();
        let context = context();
        let correlation = correlation();
        let routing = router.route_message(ORDER, &context, &correlation, cancellation);
        let (result, ()) = tokio::join!(routing, async move { trigger.cancel() });

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(*scope.completions.lock(), vec![false]);
    }

    #[tokio::test]
    async fn test_error_after_cancel_is_cancelled() {
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let router = MessageRouter::builder().handler(Failing).build();

        let err = router
            .route_message(ORDER, &context(), &correlation(), cancellation)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_routing_completes_once() {
        let scope = RecordingScope::default();
        let router = MessageRouter::builder()
            .handler(Stuck)
            .correlation_scope(scope.clone())
            .build();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), route(&router, ORDER)).await;

        assert!(timed_out.is_err());
        assert_eq!(*scope.completions.lock(), vec![false]);
    }

    #[tokio::test]
    async fn test_blank_ids_rejected_before_side_effects() {
        let orders = Recording::<Order>::new();
        let scope = RecordingScope::default();
        let router = MessageRouter::builder()
            .handler(orders.handle())
            .correlation_scope(scope.clone())
            .build();

        let context = RawContext {
            message_id: "message-1".into(),
            job_id: "  ".into(),
            properties: Properties::new(),
        };
        let err = router
            .route_message(ORDER, &context, &correlation(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RouterError::InvalidArgument(_)));
        assert_eq!(scope.started.load(Ordering::SeqCst), 0);
        assert_eq!(orders.count(), 0);
    }

    #[tokio::test]
    async fn test_handler_sees_scope_correlation() {
        let orders = Recording::<Order>::new();
        let accessor = Arc::new(LatestCorrelation::new());
        let router = MessageRouter::builder()
            .handler(orders.handle())
            .correlation_scope(RecordingScope {
                operation_id: Some("scope-operation"),
                ..RecordingScope::default()
            })
            .correlation_accessor(accessor.clone())
            .build();

        route(&router, ORDER).await.unwrap();

        let seen = orders.correlations.lock()[0].clone();
        assert_eq!(seen.operation_id(), "scope-operation");
        assert_eq!(seen.transaction_id(), "transaction-1");
        assert_eq!(seen.operation_parent_id(), Some("parent-1"));
        assert_eq!(orders.current.lock()[0].as_ref(), Some(&seen));
        assert_eq!(accessor.get(), Some(seen));
        assert!(current_correlation().is_none());
    }

    #[tokio::test]
    async fn test_route_correlated_reads_hierarchical_properties() {
        let orders = Recording::<Order>::new();
        let router = MessageRouter::builder()
            .handler(orders.handle())
            .correlation(CorrelationOptions {
                format: MessageCorrelationFormat::Hierarchical,
                hierarchical: HierarchicalOptions::default(),
            })
            .build();

        let mut props = Properties::new();
        props.insert(properties::TRANSACTION_ID.into(), json!("tx-7"));
        props.insert(properties::OPERATION_PARENT_ID.into(), json!("parent-7"));
        let context = BusMessageContext::new("message-7", "job-7", props).unwrap();

        router
            .route_message_correlated(ORDER, &context, CancellationToken::new())
            .await
            .unwrap();

        let seen = orders.correlations.lock()[0].clone();
        assert_eq!(seen.transaction_id(), "tx-7");
        assert_eq!(seen.operation_parent_id(), Some("parent-7"));
        assert!(!seen.operation_id().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_routing_shares_registry() {
        let orders = Recording::<Order>::new();
        let scope = RecordingScope::default();
        let router = MessageRouter::builder()
            .handler(orders.handle())
            .correlation_scope(scope.clone())
            .build();

        let tasks: Vec<_> = (0..32)
            .map(|id| {
                let router = router.clone();
                tokio::spawn(async move {
                    let body = format!(r#"{{"id":{id},"customer":"c{id}"}}"#);
                    let context =
                        BasicMessageContext::new(format!("message-{id}"), "job", Properties::new())
                            .unwrap();
                    router
                        .route_message(
                            body.as_bytes(),
                            &context,
                            &correlation(),
                            CancellationToken::new(),
                        )
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(orders.count(), 32);
        let completions = scope.completions.lock();
        assert_eq!(completions.len(), 32);
        assert!(completions.iter().all(|ok| *ok));
    }
}
