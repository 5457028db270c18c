//! Reserved application property names.
//!
//! These keys are read from and written to the property map carried by every
//! message. Hierarchical correlation property names can be overridden through
//! [`HierarchicalOptions`](crate::correlation::HierarchicalOptions).

/// Names the text encoding of the message body.
pub const ENCODING: &str = "Message-Encoding";

/// MIME type of the message body.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Transaction id for hierarchical correlation.
pub const TRANSACTION_ID: &str = "Transaction-Id";

/// Parent operation id for hierarchical correlation.
pub const OPERATION_PARENT_ID: &str = "Operation-Parent-Id";

/// Operation id for hierarchical correlation.
pub const CORRELATION_ID: &str = "CorrelationId";

/// Carries a W3C `traceparent` value as set by broker SDKs.
pub const DIAGNOSTIC_ID: &str = "Diagnostic-Id";

/// Alternate W3C `traceparent` carrier.
pub const TRACE_PARENT: &str = "traceparent";

/// Content type stamped on JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";
