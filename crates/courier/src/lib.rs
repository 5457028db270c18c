//! # Courier
//!
//! Transport-agnostic message routing and correlation for messaging services.
//!
//! ## Overview
//!
//! A transport pump (a queue receiver, a stream consumer) hands every inbound
//! message to a [`MessageRouter`](framework::MessageRouter) together with its
//! delivery context. The router picks the first registered handler whose
//! message type, context type and filters accept the message, deserializes the
//! body once, invokes the handler and reports the outcome to a telemetry
//! backend exactly once.
//!
//! ```text
//! ┌──────────┐  body + context  ┌────────┐  first match  ┌─────────────────┐
//! │   Pump   │─────────────────▶│ Router │──────────────▶│ MessageHandler  │
//! └──────────┘                  └────────┘               └─────────────────┘
//!                                   │ no match
//!                                   └──────────────────▶ FallbackMessageHandler
//! ```
//!
//! - **Core**: message contexts, encodings, correlation (W3C and hierarchical)
//! - **Framework**: handlers, filters, deserializers, registry, router
//! - **Runtime**: configuration and log subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
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
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = CourierRuntime::builder().init_logging(true).build()?;
//!     let router = runtime.router_builder().handler(OrderHandler).build();
//!
//!     router
//!         .route_message_correlated(&body, &context, CancellationToken::new())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    // Runtime
    pub use courier_runtime::{CourierRuntime, LoggingBuilder};

    // Contexts and correlation
    pub use courier_core::prelude::*;

    // Handlers and routing
    pub use courier_framework::prelude::*;
    pub use courier_framework::{CorrelationAccessor, current_correlation};

    // Logging macros
    pub use courier_runtime::prelude::*;
}
