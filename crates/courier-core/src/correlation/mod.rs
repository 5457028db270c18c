//! Correlation model.
//!
//! Every routed message carries a [`MessageCorrelationInfo`]: the id of the
//! operation processing it, the id of the end-to-end transaction it belongs
//! to, and optionally the id of the operation that sent it. The ids are read
//! from the message properties in one of two formats:
//!
//! - [`MessageCorrelationFormat::W3C`]: a `traceparent` value carried in the
//!   `Diagnostic-Id` (or `traceparent`) property. See [`w3c`].
//! - [`MessageCorrelationFormat::Hierarchical`]: separate transaction, parent
//!   and operation id properties. See [`hierarchical`].
//!
//! ```rust,ignore
//! use courier_core::correlation::{CorrelationOptions, determine_correlation};
//!
//! let info = determine_correlation(context.properties(), &CorrelationOptions::default());
//! ```

pub mod hierarchical;
pub mod result;
pub mod w3c;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::foundation::context::Properties;
use crate::foundation::error::{
    ArgumentError, ArgumentResult, CorrelationFormatError, require_non_blank,
};

pub use hierarchical::HierarchicalOptions;
pub use result::{CompletionCallback, MessageCorrelationResult};
pub use w3c::TraceParent;

// =============================================================================
// Correlation Info
// =============================================================================

/// Operation, transaction and parent ids of one routed message.
///
/// Deserialization applies the same checks as [`new`](Self::new).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCorrelationInfo")]
pub struct MessageCorrelationInfo {
    operation_id: String,
    transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operation_parent_id: Option<String>,
}

#[derive(Deserialize)]
struct RawCorrelationInfo {
    operation_id: String,
    transaction_id: String,
    #[serde(default)]
    operation_parent_id: Option<String>,
}

impl TryFrom<RawCorrelationInfo> for MessageCorrelationInfo {
    type Error = ArgumentError;

    fn try_from(raw: RawCorrelationInfo) -> Result<Self, Self::Error> {
        Self::new(raw.operation_id, raw.transaction_id, raw.operation_parent_id)
    }
}

impl MessageCorrelationInfo {
    /// Creates correlation info, rejecting blank operation or transaction ids.
    ///
    /// A blank parent id is treated as absent.
    pub fn new(
        operation_id: impl Into<String>,
        transaction_id: impl Into<String>,
        operation_parent_id: Option<String>,
    ) -> ArgumentResult<Self> {
        let operation_id = operation_id.into();
        let transaction_id = transaction_id.into();
        require_non_blank(&operation_id, "operation id")?;
        require_non_blank(&transaction_id, "transaction id")?;

        Ok(Self {
            operation_id,
            transaction_id,
            operation_parent_id: operation_parent_id.filter(|id| !id.trim().is_empty()),
        })
    }

    /// Id of the operation processing the message.
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Id of the end-to-end transaction.
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Id of the operation that sent the message, if known.
    pub fn operation_parent_id(&self) -> Option<&str> {
        self.operation_parent_id.as_deref()
    }
}

impl fmt::Display for MessageCorrelationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation={} transaction={} parent={}",
            self.operation_id,
            self.transaction_id,
            self.operation_parent_id.as_deref().unwrap_or("-")
        )
    }
}

// =============================================================================
// Correlation Format
// =============================================================================

/// How correlation ids are carried in message properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageCorrelationFormat {
    /// W3C trace context (`traceparent`).
    #[default]
    W3C,
    /// Separate transaction/parent/operation properties.
    Hierarchical,
}

impl MessageCorrelationFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::W3C => "W3C",
            Self::Hierarchical => "Hierarchical",
        }
    }
}

impl fmt::Display for MessageCorrelationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageCorrelationFormat {
    type Err = CorrelationFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w3c" => Ok(Self::W3C),
            "hierarchical" => Ok(Self::Hierarchical),
            _ => Err(CorrelationFormatError(s.to_string())),
        }
    }
}

impl Serialize for MessageCorrelationFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageCorrelationFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Selects the correlation format and its property names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationOptions {
    /// Format used to read correlation ids.
    #[serde(default)]
    pub format: MessageCorrelationFormat,
    /// Property names used by the hierarchical format.
    #[serde(default)]
    pub hierarchical: HierarchicalOptions,
}

impl CorrelationOptions {
    /// Options for the given format with default property names.
    pub fn new(format: MessageCorrelationFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Reads the correlation of an inbound message from its properties.
pub fn determine_correlation(
    properties: &Properties,
    options: &CorrelationOptions,
) -> MessageCorrelationInfo {
    match options.format {
        MessageCorrelationFormat::W3C => w3c::determine(properties),
        MessageCorrelationFormat::Hierarchical => {
            hierarchical::determine(properties, &options.hierarchical)
        }
    }
}

/// Reads a property as a non-blank string.
///
/// Non-string JSON values are rendered with their JSON representation.
pub(crate) fn property_text(properties: &Properties, name: &str) -> Option<String> {
    let text = match properties.get(name)? {
        Value::Null => return None,
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
