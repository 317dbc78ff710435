//! Request and response bodies of the transactional save endpoint.

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;
use crate::ledger::DeletedItem;
use crate::node::Node;
use crate::taxonomy::NodeType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub tree: Node,
    #[serde(rename = "deletedItems", default)]
    pub deleted_items: Vec<DeletedItem>,
}

/// A temporary id and the id the store assigned to the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAssignment {
    pub temp: NodeId,
    pub assigned: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(rename = "assignedIds", default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_ids: Vec<IdAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SaveResponse {
    pub fn ok(assigned_ids: Vec<IdAssignment>) -> Self {
        Self {
            success: true,
            assigned_ids,
            error: None,
            details: None,
        }
    }

    pub fn failed(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            assigned_ids: Vec::new(),
            error: Some(error.into()),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_external_field_names() {
        let body = serde_json::json!({
            "tree": {"id": 1, "type": "statute", "name": "Act", "children": []},
            "deletedItems": [{"id": 9, "type": "part"}]
        });
        let request: SaveRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.tree.id, NodeId::new(1));
        assert_eq!(request.deleted_items[0].node_type, NodeType::Part);
    }

    #[test]
    fn failure_response_omits_assignments() {
        let json = serde_json::to_value(SaveResponse::failed("boom", None)).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }
}
