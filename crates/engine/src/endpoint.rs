//! The transactional save endpoint a session talks to.

use tracing::warn;

use statute_core::{NodeId, Node, SaveId, SaveRequest, SaveResponse};
use statute_storage::{SaveOptions, SqliteStorage, StatuteStore, StorageError};

use crate::error::EngineError;

/// One call, one atomic outcome.
///
/// `submit` returns `Ok` with `success: false` when the store refused the save;
/// `Err` is reserved for failures to reach the store at all.
pub trait SaveEndpoint {
    fn submit(
        &mut self,
        statute_id: NodeId,
        save_id: SaveId,
        request: &SaveRequest,
    ) -> Result<SaveResponse, EngineError>;

    /// The canonical tree as currently stored.
    fn fetch_tree(&mut self, statute_id: NodeId) -> Result<Node, EngineError>;
}

/// In-process endpoint backed by a SQLite store.
pub struct LocalEndpoint {
    storage: SqliteStorage,
    temp_order_offset: i64,
}

fn failure(err: &StorageError) -> SaveResponse {
    let details = if err.is_constraint() {
        Some("Order number conflict detected".to_string())
    } else {
        None
    };
    SaveResponse::failed(err.to_string(), details)
}

impl LocalEndpoint {
    pub fn new(storage: SqliteStorage, temp_order_offset: i64) -> Self {
        Self {
            storage,
            temp_order_offset,
        }
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut SqliteStorage {
        &mut self.storage
    }

    pub fn into_storage(self) -> SqliteStorage {
        self.storage
    }

    /// JSON in, status code and JSON out, for embedding behind an HTTP route.
    pub fn handle_save(&mut self, statute_id: NodeId, save_id: SaveId, body: &str) -> (u16, String) {
        let request: SaveRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "malformed save body");
                return (400, encode(&SaveResponse::failed(format!("invalid request: {err}"), None)));
            }
        };
        let response = match self.submit(statute_id, save_id, &request) {
            Ok(response) => response,
            Err(err) => SaveResponse::failed(err.to_string(), None),
        };
        let status = if response.success { 200 } else { 500 };
        (status, encode(&response))
    }
}

fn encode(response: &SaveResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| r#"{"success":false}"#.to_string())
}

impl SaveEndpoint for LocalEndpoint {
    fn submit(
        &mut self,
        statute_id: NodeId,
        save_id: SaveId,
        request: &SaveRequest,
    ) -> Result<SaveResponse, EngineError> {
        let options = SaveOptions::new(save_id).with_temp_order_offset(self.temp_order_offset);
        match self.storage.save_tree(statute_id, request, &options) {
            Ok(outcome) => Ok(SaveResponse::ok(outcome.assigned)),
            Err(err) => Ok(failure(&err)),
        }
    }

    fn fetch_tree(&mut self, statute_id: NodeId) -> Result<Node, EngineError> {
        Ok(self.storage.load_tree(statute_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statute_storage::NewStatute;

    fn endpoint() -> (LocalEndpoint, NodeId) {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let statute = storage
            .create_statute(&NewStatute {
                name: "Roads Act".into(),
                ..Default::default()
            })
            .unwrap();
        (LocalEndpoint::new(storage, 900_000), statute.id)
    }

    #[test]
    fn malformed_body_is_a_client_error() {
        let (mut endpoint, id) = endpoint();
        let (status, body) = endpoint.handle_save(id, SaveId::new(), "{not json");
        assert_eq!(status, 400);
        let response: SaveResponse = serde_json::from_str(&body).unwrap();
        assert!(!response.success);
    }

    #[test]
    fn json_round_trip_assigns_ids() {
        let (mut endpoint, id) = endpoint();
        let body = serde_json::json!({
            "tree": {
                "id": id.get(), "type": "statute", "name": "Roads Act",
                "children": [{"id": -1, "type": "part", "name": "Part One", "part_no": "1", "children": []}]
            },
            "deletedItems": []
        });
        let (status, body) = endpoint.handle_save(id, SaveId::new(), &body.to_string());
        assert_eq!(status, 200);
        let response: SaveResponse = serde_json::from_str(&body).unwrap();
        assert!(response.success);
        assert_eq!(response.assigned_ids.len(), 1);
        assert_eq!(response.assigned_ids[0].temp, NodeId::new(-1));

        let tree = endpoint.fetch_tree(id).unwrap();
        assert_eq!(tree.children[0].id, response.assigned_ids[0].assigned);
    }

    #[test]
    fn store_failure_is_reported_not_raised() {
        let (mut endpoint, id) = endpoint();
        let request = SaveRequest {
            tree: Node::new(NodeId::new(9999), statute_core::NodeType::Statute, "Ghost"),
            deleted_items: Vec::new(),
        };
        let response = endpoint.submit(id, SaveId::new(), &request).unwrap();
        assert!(!response.success);
        assert!(response.error.is_some());
    }
}
