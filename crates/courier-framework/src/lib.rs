//! # Courier Framework
//!
//! Handler registration and message routing on top of `courier-core`.
//!
//! This layer provides:
//! - Handler contracts for typed messages and raw-body fallbacks
//! - Per-handler body and context filters
//! - The body deserialization pipeline, including the legacy string adapter
//! - [`MessageRouter`], which selects the first matching handler, invokes it
//!   and reports the outcome to a telemetry backend exactly once
//! - A `tower::Service` implementation for the router
//!
//! ```text
//! body + context ──▶ registry.select ──▶ handler ──▶ RoutingOutcome
//!                         │ no match
//!                         └──────────▶ fallback / NoHandlerMatched
//! ```

pub mod accessor;
pub mod context;
pub mod deserializer;
pub mod error;
pub mod handler;
pub mod registration;
pub mod registry;
pub mod router;
pub mod service;
pub mod telemetry;

pub use accessor::{CorrelationAccessor, LatestCorrelation, current_correlation, with_correlation};
pub use context::ContextView;
pub use deserializer::{
    JsonBodyDeserializer, LegacyBodySerializer, LegacySerializerAdapter, MessageBodyDeserializer,
    deserialize_guarded,
};
pub use error::{OperationCancelled, RouterError, RouterResult};
pub use handler::{BoxFuture, FallbackMessageHandler, MessageHandler};
pub use registration::{
    BodyFilter, ContextFilter, ErasedRegistration, HandlerOptions, HandlerRegistration,
    MatchOutcome, SkipReason,
};
pub use registry::{MessageHandlerRegistry, SelectedHandler};
pub use router::{MessageRouter, RouterBuilder, RouterOptions, RoutingOutcome};
pub use service::RouteRequest;
pub use telemetry::{
    CorrelationScope, DEFAULT_OPERATION_NAME, REQUEST_TARGET, RequestOutcome, RequestTelemetry,
    TelemetryOptions,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::{OperationCancelled, RouterError, RouterResult};
    pub use super::handler::{FallbackMessageHandler, MessageHandler};
    pub use super::registration::HandlerOptions;
    pub use super::router::{MessageRouter, RoutingOutcome};
    pub use super::telemetry::CorrelationScope;
}
