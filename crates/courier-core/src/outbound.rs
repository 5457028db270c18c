//! Outbound message construction.
//!
//! [`OutboundMessageBuilder`] serializes a body to JSON and stamps the
//! properties a receiving router needs: content type, body encoding and the
//! correlation of the sending operation, either as hierarchical properties or
//! as a W3C `traceparent`.
//!
//! ```rust,ignore
//! use courier_core::OutboundMessageBuilder;
//!
//! let message = OutboundMessageBuilder::for_body(&order)
//!     .transaction_id(info.transaction_id())
//!     .operation_parent_id(info.operation_id())
//!     .build()?;
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::correlation::{MessageCorrelationInfo, TraceParent};
use crate::foundation::context::Properties;
use crate::foundation::encoding::TextEncoding;
use crate::foundation::error::ArgumentResult;
use crate::foundation::properties::{
    CONTENT_TYPE, DIAGNOSTIC_ID, ENCODING, JSON_CONTENT_TYPE, OPERATION_PARENT_ID, TRANSACTION_ID,
};

/// A message ready to hand to a transport client.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Encoded JSON body.
    pub body: Vec<u8>,
    /// Broker-level correlation id, when the operation id is sent that way.
    pub correlation_id: Option<String>,
    /// Application properties.
    pub properties: Properties,
}

/// Where the operation id is written.
#[derive(Debug, Clone)]
enum OperationIdTarget {
    CorrelationId,
    Property(String),
}

/// Builds an [`OutboundMessage`] from a serializable body.
#[derive(Debug)]
pub struct OutboundMessageBuilder<'a, T: ?Sized> {
    body: &'a T,
    encoding: TextEncoding,
    operation_id: Option<(String, OperationIdTarget)>,
    transaction_id: Option<(String, String)>,
    operation_parent_id: Option<(String, String)>,
    trace_parent: Option<TraceParent>,
}

impl<'a, T: Serialize + ?Sized> OutboundMessageBuilder<'a, T> {
    /// Starts a UTF-8 message for `body`.
    pub fn for_body(body: &'a T) -> Self {
        Self::for_body_with_encoding(body, TextEncoding::Utf8)
    }

    /// Starts a message for `body` in the given encoding.
    pub fn for_body_with_encoding(body: &'a T, encoding: TextEncoding) -> Self {
        Self {
            body,
            encoding,
            operation_id: None,
            transaction_id: None,
            operation_parent_id: None,
            trace_parent: None,
        }
    }

    /// Sends the operation id as the broker correlation id.
    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some((operation_id.into(), OperationIdTarget::CorrelationId));
        self
    }

    /// Sends the operation id in a custom property.
    pub fn operation_id_in(
        mut self,
        operation_id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        self.operation_id = Some((
            operation_id.into(),
            OperationIdTarget::Property(property.into()),
        ));
        self
    }

    /// Sends the transaction id in the `Transaction-Id` property.
    pub fn transaction_id(self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id_in(transaction_id, TRANSACTION_ID)
    }

    /// Sends the transaction id in a custom property.
    pub fn transaction_id_in(
        mut self,
        transaction_id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        self.transaction_id = Some((property.into(), transaction_id.into()));
        self
    }

    /// Sends the parent id in the `Operation-Parent-Id` property.
    pub fn operation_parent_id(self, operation_parent_id: impl Into<String>) -> Self {
        self.operation_parent_id_in(operation_parent_id, OPERATION_PARENT_ID)
    }

    /// Sends the parent id in a custom property.
    pub fn operation_parent_id_in(
        mut self,
        operation_parent_id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        self.operation_parent_id = Some((property.into(), operation_parent_id.into()));
        self
    }

    /// Continues the W3C trace of the operation in `info`.
    ///
    /// The receiver sees this operation as its parent.
    pub fn trace_parent(mut self, info: &MessageCorrelationInfo) -> ArgumentResult<Self> {
        self.trace_parent = Some(TraceParent::from_correlation(info)?);
        Ok(self)
    }

    /// Serializes the body and assembles the properties.
    pub fn build(self) -> serde_json::Result<OutboundMessage> {
        let json = serde_json::to_string(self.body)?;

        let mut properties = Properties::new();
        properties.insert(CONTENT_TYPE.to_string(), Value::from(JSON_CONTENT_TYPE));
        properties.insert(ENCODING.to_string(), Value::from(self.encoding.web_name()));

        let mut correlation_id = None;
        match self.operation_id {
            Some((id, OperationIdTarget::CorrelationId)) => correlation_id = Some(id),
            Some((id, OperationIdTarget::Property(name))) => {
                properties.insert(name, Value::from(id));
            }
            None => {}
        }

        for (name, id) in [self.transaction_id, self.operation_parent_id]
            .into_iter()
            .flatten()
        {
            properties.insert(name, Value::from(id));
        }

        if let Some(parent) = self.trace_parent {
            properties.insert(DIAGNOSTIC_ID.to_string(), Value::from(parent.to_string()));
        }

        Ok(OutboundMessage {
            body: self.encoding.encode(&json),
            correlation_id,
            properties,
        })
    }
}
