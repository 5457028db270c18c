//! Hierarchical correlation.
//!
//! Transaction and parent ids travel as separate application properties whose
//! names can be customized. A missing transaction id starts a new
//! transaction; a missing operation id is generated.

use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use super::{MessageCorrelationInfo, property_text};
use crate::foundation::context::Properties;
use crate::foundation::properties::{CORRELATION_ID, OPERATION_PARENT_ID, TRANSACTION_ID};

/// Property names read by the hierarchical format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchicalOptions {
    /// Property holding the transaction id.
    #[serde(default = "default_transaction_id_property")]
    pub transaction_id_property: String,

    /// Property holding the parent operation id.
    #[serde(default = "default_operation_parent_id_property")]
    pub operation_parent_id_property: String,

    /// Property holding the operation id.
    #[serde(default = "default_operation_id_property")]
    pub operation_id_property: String,
}

impl Default for HierarchicalOptions {
    fn default() -> Self {
        Self {
            transaction_id_property: default_transaction_id_property(),
            operation_parent_id_property: default_operation_parent_id_property(),
            operation_id_property: default_operation_id_property(),
        }
    }
}

fn default_transaction_id_property() -> String {
    TRANSACTION_ID.to_string()
}

fn default_operation_parent_id_property() -> String {
    OPERATION_PARENT_ID.to_string()
}

fn default_operation_id_property() -> String {
    CORRELATION_ID.to_string()
}

/// Generates a new hierarchical id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn determine(
    properties: &Properties,
    options: &HierarchicalOptions,
) -> MessageCorrelationInfo {
    let transaction_id = property_text(properties, &options.transaction_id_property)
        .unwrap_or_else(|| {
            trace!(
                property = %options.transaction_id_property,
                "No transaction id on message, generating one"
            );
            generate_id()
        });

    let operation_id =
        property_text(properties, &options.operation_id_property).unwrap_or_else(generate_id);

    MessageCorrelationInfo {
        operation_id,
        transaction_id,
        operation_parent_id: property_text(properties, &options.operation_parent_id_property),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_generates_unique_transaction_ids() {
        let options = HierarchicalOptions::default();
        let first = determine(&Properties::new(), &options);
        let second = determine(&Properties::new(), &options);

        assert!(!first.transaction_id().trim().is_empty());
        assert_ne!(first.transaction_id(), second.transaction_id());
        assert_eq!(first.operation_parent_id(), None);
    }

    #[test]
    fn test_reuses_existing_ids() {
        let properties = Properties::from([
            (TRANSACTION_ID.to_string(), Value::from("tx-1")),
            (OPERATION_PARENT_ID.to_string(), Value::from("parent-1")),
            (CORRELATION_ID.to_string(), Value::from("op-1")),
        ]);
        let info = determine(&properties, &HierarchicalOptions::default());

        assert_eq!(info.transaction_id(), "tx-1");
        assert_eq!(info.operation_parent_id(), Some("parent-1"));
        assert_eq!(info.operation_id(), "op-1");
    }

    #[test]
    fn test_blank_transaction_id_is_regenerated() {
        let properties = Properties::from([(TRANSACTION_ID.to_string(), Value::from(" "))]);
        let info = determine(&properties, &HierarchicalOptions::default());
        assert_ne!(info.transaction_id().trim(), "");
    }

    #[test]
    fn test_custom_property_names() {
        let options = HierarchicalOptions {
            transaction_id_property: "X-Tx".to_string(),
            operation_parent_id_property: "X-Parent".to_string(),
            ..HierarchicalOptions::default()
        };
        let properties = Properties::from([
            ("X-Tx".to_string(), Value::from("custom-tx")),
            ("X-Parent".to_string(), Value::from("custom-parent")),
            (TRANSACTION_ID.to_string(), Value::from("ignored")),
        ]);
        let info = determine(&properties, &options);

        assert_eq!(info.transaction_id(), "custom-tx");
        assert_eq!(info.operation_parent_id(), Some("custom-parent"));
    }
}
