use serde::{Deserialize, Serialize};

use crate::ids::NodeId;
use crate::node::Node;
use crate::taxonomy::NodeType;

/// A previously persisted node removed during the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeletedItem {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

/// Nodes that must be deleted from the store on the next save.
///
/// Removing a node from the in-memory tree does not persist anything; this
/// ledger is the explicit list the save protocol deletes first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeletedLedger {
    items: Vec<DeletedItem>,
}

impl DeletedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<DeletedItem>) -> Self {
        Self { items }
    }

    /// Record `node` and every persisted descendant. Returns how many entries were added.
    pub fn record_subtree(&mut self, node: &Node) -> usize {
        let before = self.items.len();
        for (id, node_type) in node.persisted_ids() {
            if !self.contains(id) {
                self.items.push(DeletedItem { id, node_type });
            }
        }
        self.items.len() - before
    }

    /// Drop the entries `record_subtree` would have added for `node`.
    pub fn revert_subtree(&mut self, node: &Node) -> usize {
        let ids: Vec<NodeId> = node.persisted_ids().into_iter().map(|(id, _)| id).collect();
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(&item.id));
        before - self.items.len()
    }

    pub fn push(&mut self, item: DeletedItem) {
        if !self.contains(item.id) {
            self.items.push(item);
        }
    }

    pub fn remove_committed(&mut self, committed: &[DeletedItem]) {
        self.items.retain(|item| !committed.contains(item));
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn items(&self) -> &[DeletedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
