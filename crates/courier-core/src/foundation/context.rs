//! Message context contract and the built-in transport contexts.
//!
//! Every inbound message is routed together with a [`MessageContext`]: the
//! message id, the id of the pump (job) that received it, and the application
//! properties delivered alongside the body. Transport-specific contexts add
//! their own fields on top of this contract. The router only depends on the
//! contract itself and uses [`MessageContext::as_any`] when a handler is
//! declared over a concrete context type.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_core::{BusMessageContext, EntityType, Properties};
//!
//! let context = BusMessageContext::new("message-1", "orders-pump", Properties::new())?
//!     .with_namespace("orders.servicebus.windows.net")
//!     .with_entity_path("orders")
//!     .with_entity_type(EntityType::Queue);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::encoding::TextEncoding;
use super::error::{ArgumentResult, require_non_blank};

/// Application properties delivered with a message.
pub type Properties = HashMap<String, Value>;

/// Placeholder for transport identity fields a context does not carry.
pub const NOT_AVAILABLE: &str = "<not-available>";

// =============================================================================
// Context Contract
// =============================================================================

/// Type-erasure helper implemented for every context type.
///
/// Call these through a `&dyn MessageContext`, not through a smart pointer,
/// so the concrete context type is the one observed.
pub trait AsAnyContext: Any + Send + Sync + 'static {
    /// Returns `self` as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the name of the concrete context type.
    fn context_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAnyContext for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn context_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// The delivery context of one inbound message.
///
/// Implementations are immutable after construction and guarantee that
/// [`message_id`](Self::message_id) and [`job_id`](Self::job_id) are non-blank.
pub trait MessageContext: AsAnyContext + fmt::Debug + 'static {
    /// Unique id of the message.
    fn message_id(&self) -> &str;

    /// Id of the pump that received the message.
    fn job_id(&self) -> &str;

    /// Application properties delivered with the message.
    fn properties(&self) -> &Properties;

    /// Looks up a single property.
    fn property(&self, name: &str) -> Option<&Value> {
        self.properties().get(name)
    }

    /// The body encoding named by the context, or UTF-8.
    fn encoding_or_default(&self) -> TextEncoding {
        TextEncoding::resolve(self.properties())
    }

    /// Where the message came from, for request telemetry.
    fn transport_identity(&self) -> TransportIdentity {
        TransportIdentity::default()
    }
}

/// Transport coordinates reported with every routed request.
///
/// Each field is [`NOT_AVAILABLE`] when the context does not carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportIdentity {
    /// Broker namespace.
    pub namespace: String,
    /// Queue, topic or stream name.
    pub entity: String,
    /// Consumer group, for partitioned streams.
    pub consumer_group: String,
}

impl Default for TransportIdentity {
    fn default() -> Self {
        Self {
            namespace: NOT_AVAILABLE.to_string(),
            entity: NOT_AVAILABLE.to_string(),
            consumer_group: NOT_AVAILABLE.to_string(),
        }
    }
}

fn or_not_available(value: &str) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

// =============================================================================
// Basic Context
// =============================================================================

/// A context carrying only the base contract.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicMessageContext {
    message_id: String,
    job_id: String,
    properties: Properties,
}

impl BasicMessageContext {
    /// Creates a context, rejecting blank message or job ids.
    pub fn new(
        message_id: impl Into<String>,
        job_id: impl Into<String>,
        properties: Properties,
    ) -> ArgumentResult<Self> {
        let message_id = message_id.into();
        let job_id = job_id.into();
        require_non_blank(&message_id, "message id")?;
        require_non_blank(&job_id, "job id")?;

        Ok(Self {
            message_id,
            job_id,
            properties,
        })
    }
}

impl MessageContext for BasicMessageContext {
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

// =============================================================================
// Bus Context (queues and topics)
// =============================================================================

/// Kind of broker entity a bus message was received from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntityType {
    /// Entity kind was not reported.
    #[default]
    Unknown,
    /// A point-to-point queue.
    Queue,
    /// A topic subscription.
    Topic,
}

/// Context for messages received from a queue or topic broker.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessageContext {
    base: BasicMessageContext,
    namespace: String,
    entity_path: String,
    entity_type: EntityType,
    lock_token: Option<String>,
    delivery_count: u32,
}

impl BusMessageContext {
    /// Creates a bus context, rejecting blank message or job ids.
    pub fn new(
        message_id: impl Into<String>,
        job_id: impl Into<String>,
        properties: Properties,
    ) -> ArgumentResult<Self> {
        Ok(Self {
            base: BasicMessageContext::new(message_id, job_id, properties)?,
            namespace: String::new(),
            entity_path: String::new(),
            entity_type: EntityType::Unknown,
            lock_token: None,
            delivery_count: 0,
        })
    }

    /// Sets the fully-qualified broker namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the queue or topic path.
    pub fn with_entity_path(mut self, entity_path: impl Into<String>) -> Self {
        self.entity_path = entity_path.into();
        self
    }

    /// Sets the entity kind.
    pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = entity_type;
        self
    }

    /// Sets the lock token held on the message.
    pub fn with_lock_token(mut self, lock_token: impl Into<String>) -> Self {
        self.lock_token = Some(lock_token.into());
        self
    }

    /// Sets how many times the message was delivered.
    pub fn with_delivery_count(mut self, delivery_count: u32) -> Self {
        self.delivery_count = delivery_count;
        self
    }

    /// Fully-qualified broker namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Queue or topic path.
    pub fn entity_path(&self) -> &str {
        &self.entity_path
    }

    /// Entity kind.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Lock token held on the message, if peek-locked.
    pub fn lock_token(&self) -> Option<&str> {
        self.lock_token.as_deref()
    }

    /// Number of deliveries so far.
    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }
}

impl MessageContext for BusMessageContext {
    fn message_id(&self) -> &str {
        self.base.message_id()
    }

    fn job_id(&self) -> &str {
        self.base.job_id()
    }

    fn properties(&self) -> &Properties {
        self.base.properties()
    }

    fn transport_identity(&self) -> TransportIdentity {
        TransportIdentity {
            namespace: or_not_available(&self.namespace),
            entity: or_not_available(&self.entity_path),
            consumer_group: NOT_AVAILABLE.to_string(),
        }
    }
}

// =============================================================================
// Stream Context (partitioned event streams)
// =============================================================================

/// Context for events read from a partitioned event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessageContext {
    base: BasicMessageContext,
    namespace: String,
    stream_name: String,
    consumer_group: String,
    partition_id: Option<String>,
}

impl StreamMessageContext {
    /// Creates a stream context, rejecting blank message or job ids.
    pub fn new(
        message_id: impl Into<String>,
        job_id: impl Into<String>,
        properties: Properties,
    ) -> ArgumentResult<Self> {
        Ok(Self {
            base: BasicMessageContext::new(message_id, job_id, properties)?,
            namespace: String::new(),
            stream_name: String::new(),
            consumer_group: String::new(),
            partition_id: None,
        })
    }

    /// Sets the fully-qualified namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the stream name.
    pub fn with_stream_name(mut self, stream_name: impl Into<String>) -> Self {
        self.stream_name = stream_name.into();
        self
    }

    /// Sets the consumer group the event was read through.
    pub fn with_consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = consumer_group.into();
        self
    }

    /// Sets the partition the event was read from.
    pub fn with_partition_id(mut self, partition_id: impl Into<String>) -> Self {
        self.partition_id = Some(partition_id.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    pub fn partition_id(&self) -> Option<&str> {
        self.partition_id.as_deref()
    }
}

impl MessageContext for StreamMessageContext {
    fn message_id(&self) -> &str {
        self.base.message_id()
    }

    fn job_id(&self) -> &str {
        self.base.job_id()
    }

    fn properties(&self) -> &Properties {
        self.base.properties()
    }

    fn transport_identity(&self) -> TransportIdentity {
        TransportIdentity {
            namespace: or_not_available(&self.namespace),
            entity: or_not_available(&self.stream_name),
            consumer_group: or_not_available(&self.consumer_group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::error::ArgumentError;
    use crate::foundation::properties::ENCODING;
    use serde_json::json;

    #[test]
    fn test_blank_ids_are_rejected() {
        assert_eq!(
            BasicMessageContext::new(" ", "job", Properties::new()),
            Err(ArgumentError::blank("message id"))
        );
        assert_eq!(
            BusMessageContext::new("id", "", Properties::new()),
            Err(ArgumentError::blank("job id"))
        );
    }

    #[test]
    fn test_encoding_from_properties() {
        let properties = Properties::from([(ENCODING.to_string(), json!("utf-16"))]);
        let context = BasicMessageContext::new("id", "job", properties).unwrap();
        assert_eq!(context.encoding_or_default(), TextEncoding::Utf16Le);
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let context = BusMessageContext::new("id", "job", Properties::new()).unwrap();
        let erased: &dyn MessageContext = &context;

        assert!(erased.as_any().downcast_ref::<BusMessageContext>().is_some());
        assert!(erased.as_any().downcast_ref::<StreamMessageContext>().is_none());
        assert!(erased.context_type_name().ends_with("BusMessageContext"));
    }

    #[test]
    fn test_transport_identity_defaults() {
        let basic = BasicMessageContext::new("id", "job", Properties::new()).unwrap();
        assert_eq!(basic.transport_identity(), TransportIdentity::default());

        let bus = BusMessageContext::new("id", "job", Properties::new())
            .unwrap()
            .with_namespace("ns")
            .with_entity_path("orders");
        let identity = bus.transport_identity();
        assert_eq!(identity.namespace, "ns");
        assert_eq!(identity.entity, "orders");
        assert_eq!(identity.consumer_group, NOT_AVAILABLE);

        let stream = StreamMessageContext::new("id", "job", Properties::new())
            .unwrap()
            .with_stream_name("telemetry")
            .with_consumer_group("$Default");
        let identity = stream.transport_identity();
        assert_eq!(identity.namespace, NOT_AVAILABLE);
        assert_eq!(identity.entity, "telemetry");
        assert_eq!(identity.consumer_group, "$Default");
    }
}
