//! # Courier Core
//!
//! The contracts shared by every part of the Courier message router.
//!
//! ## Foundation Layer
//!
//! - **Message contexts**: the delivery context of an inbound message
//!   ([`MessageContext`], [`BusMessageContext`], [`StreamMessageContext`])
//! - **Encodings**: body text encodings resolved from message properties
//!   ([`TextEncoding`])
//! - **Property names**: reserved application property keys
//!   ([`foundation::properties`])
//!
//! ## Correlation
//!
//! - **Correlation info**: operation, transaction and parent ids
//!   ([`MessageCorrelationInfo`])
//! - **Formats**: W3C trace context and hierarchical properties
//!   ([`MessageCorrelationFormat`], [`determine_correlation`])
//! - **Completion**: exactly-once outcome reporting
//!   ([`MessageCorrelationResult`])
//!
//! ## Bodies
//!
//! - **Deserialization results** ([`MessageBodyResult`], [`MessageResult`])
//! - **Outbound messages** ([`OutboundMessageBuilder`])
//!
//! ```text
//! ┌───────────┐   properties   ┌─────────────┐
//! │  Context  │───────────────▶│ Correlation │
//! └───────────┘                └─────────────┘
//!       │ encoding
//!       ▼
//! ┌───────────┐
//! │   Body    │
//! └───────────┘
//! ```

pub mod body;
pub mod correlation;
pub mod foundation;
pub mod outbound;

pub use body::{BoxError, DeserializedMessage, MessageBodyResult, MessageResult};
pub use correlation::{
    CompletionCallback, CorrelationOptions, HierarchicalOptions, MessageCorrelationFormat,
    MessageCorrelationInfo, MessageCorrelationResult, TraceParent, determine_correlation,
};
pub use foundation::{
    ArgumentError, ArgumentResult, AsAnyContext, BasicMessageContext, BusMessageContext,
    CorrelationFormatError, EntityType, MessageContext, NOT_AVAILABLE, Properties,
    StreamMessageContext, TextEncoding, TransportIdentity, properties,
};
pub use outbound::{OutboundMessage, OutboundMessageBuilder};

/// Prelude for common imports.
pub mod prelude {
    pub use super::body::{BoxError, MessageBodyResult};
    pub use super::correlation::{
        MessageCorrelationFormat, MessageCorrelationInfo, MessageCorrelationResult,
    };
    pub use super::foundation::{
        BasicMessageContext, BusMessageContext, MessageContext, Properties, StreamMessageContext,
        TextEncoding,
    };
}
