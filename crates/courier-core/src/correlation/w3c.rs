//! W3C trace-context correlation.
//!
//! The transaction id is the trace id and the parent id is the span id of the
//! `traceparent` carried by the message. The receiving operation gets a fresh
//! span id of its own. When no valid `traceparent` is present a new trace is
//! started and the message has no parent.

use std::fmt;
use std::str::FromStr;

use tracing::debug;
use uuid::Uuid;

use super::{MessageCorrelationInfo, property_text};
use crate::foundation::context::Properties;
use crate::foundation::error::{ArgumentError, ArgumentResult};
use crate::foundation::properties::{DIAGNOSTIC_ID, TRACE_PARENT};

const VERSION: &str = "00";
const TRACE_ID_LEN: usize = 32;
const SPAN_ID_LEN: usize = 16;
const SAMPLED: u8 = 0x01;

/// A parsed `traceparent` header value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceParent {
    trace_id: String,
    parent_id: String,
    flags: u8,
}

impl TraceParent {
    /// Creates a sampled traceparent, validating both ids.
    pub fn new(trace_id: impl Into<String>, parent_id: impl Into<String>) -> ArgumentResult<Self> {
        let trace_id = trace_id.into();
        let parent_id = parent_id.into();
        validate_id(&trace_id, TRACE_ID_LEN, "trace id")?;
        validate_id(&parent_id, SPAN_ID_LEN, "parent id")?;

        Ok(Self {
            trace_id,
            parent_id,
            flags: SAMPLED,
        })
    }

    /// The traceparent to send downstream from the operation in `info`.
    ///
    /// Fails unless the transaction id is a W3C trace id and the operation id
    /// a W3C span id.
    pub fn from_correlation(info: &MessageCorrelationInfo) -> ArgumentResult<Self> {
        Self::new(info.transaction_id(), info.operation_id())
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn is_sampled(&self) -> bool {
        self.flags & SAMPLED == SAMPLED
    }
}

impl FromStr for TraceParent {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ArgumentError::invalid("traceparent", reason);

        let parts: Vec<&str> = s.trim().split('-').collect();
        let [version, trace_id, parent_id, flags] = parts.as_slice() else {
            return Err(invalid("expected four '-' separated fields"));
        };

        if *version != VERSION {
            return Err(invalid("unsupported version"));
        }
        validate_id(trace_id, TRACE_ID_LEN, "trace id")?;
        validate_id(parent_id, SPAN_ID_LEN, "parent id")?;
        if flags.len() != 2 {
            return Err(invalid("flags must be two hex digits"));
        }
        let flags = u8::from_str_radix(flags, 16).map_err(|_| invalid("flags are not hex"))?;

        Ok(Self {
            trace_id: trace_id.to_string(),
            parent_id: parent_id.to_string(),
            flags,
        })
    }
}

impl fmt::Display for TraceParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{VERSION}-{}-{}-{:02x}",
            self.trace_id, self.parent_id, self.flags
        )
    }
}

fn validate_id(id: &str, len: usize, name: &'static str) -> ArgumentResult<()> {
    if id.len() != len {
        return Err(ArgumentError::invalid(
            name,
            format!("expected {len} hex digits"),
        ));
    }
    if !id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(ArgumentError::invalid(name, "expected lowercase hex digits"));
    }
    if id.bytes().all(|b| b == b'0') {
        return Err(ArgumentError::invalid(name, "must not be all zeros"));
    }
    Ok(())
}

/// Generates a random 32-digit trace id.
pub fn generate_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generates a random 16-digit span id.
pub fn generate_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SPAN_ID_LEN);
    id
}

/// Reads the traceparent carried by the message properties, if valid.
pub fn trace_parent_from(properties: &Properties) -> Option<TraceParent> {
    [DIAGNOSTIC_ID, TRACE_PARENT]
        .into_iter()
        .filter_map(|name| property_text(properties, name))
        .find_map(|raw| match raw.parse::<TraceParent>() {
            Ok(parent) => Some(parent),
            Err(error) => {
                debug!(traceparent = %raw, %error, "Ignoring malformed traceparent");
                None
            }
        })
}

pub(crate) fn determine(properties: &Properties) -> MessageCorrelationInfo {
    let operation_id = generate_span_id();

    match trace_parent_from(properties) {
        Some(parent) => MessageCorrelationInfo {
            operation_id,
            transaction_id: parent.trace_id,
            operation_parent_id: Some(parent.parent_id),
        },
        None => {
            debug!("No traceparent on message, starting a new trace");
            MessageCorrelationInfo {
                operation_id,
                transaction_id: generate_trace_id(),
                operation_parent_id: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const TRACE: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
    const SPAN: &str = "00f067aa0ba902b7";

    fn with_diagnostic_id(value: &str) -> Properties {
        Properties::from([(DIAGNOSTIC_ID.to_string(), Value::from(value))])
    }

    #[test]
    fn test_parse_valid_traceparent() {
        let parent: TraceParent = format!("00-{TRACE}-{SPAN}-01").parse().unwrap();
        assert_eq!(parent.trace_id(), TRACE);
        assert_eq!(parent.parent_id(), SPAN);
        assert!(parent.is_sampled());
        assert_eq!(parent.to_string(), format!("00-{TRACE}-{SPAN}-01"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let malformed = [
            String::new(),
            "00-abc-def-01".to_string(),
            format!("01-{TRACE}-{SPAN}-01"),
            format!("00-{}-{SPAN}-01", "0".repeat(32)),
            format!("00-{TRACE}-{SPAN}-zz"),
            format!("00-{}-{SPAN}-01", TRACE.to_uppercase()),
            format!("00-{TRACE}-{SPAN}-01-extra"),
        ];
        for raw in &malformed {
            assert!(raw.parse::<TraceParent>().is_err(), "accepted '{raw}'");
        }
    }

    #[test]
    fn test_determine_reuses_trace_context() {
        let info = determine(&with_diagnostic_id(&format!("00-{TRACE}-{SPAN}-01")));

        assert_eq!(info.transaction_id(), TRACE);
        assert_eq!(info.operation_parent_id(), Some(SPAN));
        assert_eq!(info.operation_id().len(), SPAN_ID_LEN);
        assert_ne!(info.operation_id(), SPAN);
    }

    #[test]
    fn test_determine_reads_alternate_carrier() {
        let properties = Properties::from([(
            TRACE_PARENT.to_string(),
            Value::from(format!("00-{TRACE}-{SPAN}-00")),
        )]);
        let info = determine(&properties);
        assert_eq!(info.transaction_id(), TRACE);
    }

    #[test]
    fn test_determine_starts_new_trace_without_header() {
        let info = determine(&with_diagnostic_id("not-a-traceparent"));

        assert_eq!(info.transaction_id().len(), TRACE_ID_LEN);
        assert_eq!(info.operation_parent_id(), None);
    }

    #[test]
    fn test_generated_ids_are_valid() {
        let parent = TraceParent::new(generate_trace_id(), generate_span_id()).unwrap();
        assert_eq!(parent.flags(), SAMPLED);
    }
}
