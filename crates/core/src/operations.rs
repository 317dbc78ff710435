use std::collections::HashMap;

use crate::ids::NodeId;
use crate::node::{Node, NodeField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// What a mutation changed, with exactly the state needed to invert it.
///
/// Nodes are referenced by id. Only a delete keeps a full copy of the removed
/// subtree, since nothing else remains to restore it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationPayload {
    AddChild {
        parent: NodeId,
        node: NodeId,
        index: usize,
    },
    AddSibling {
        parent: NodeId,
        node: NodeId,
        index: usize,
        reference: NodeId,
    },
    Duplicate {
        parent: NodeId,
        node: NodeId,
        index: usize,
        original: NodeId,
    },
    Delete {
        parent: NodeId,
        index: usize,
        node: Node,
    },
    Move {
        parent: NodeId,
        direction: MoveDirection,
        from: usize,
        to: usize,
        /// Reorder markers of the nodes at `from` and `to` before the swap.
        previous_markers: [bool; 2],
    },
    MoveToParent {
        node: NodeId,
        old_parent: NodeId,
        old_index: usize,
        new_parent: NodeId,
        new_index: usize,
        previous_marker: bool,
    },
    Edit {
        node: NodeId,
        original: Vec<(NodeField, Option<String>)>,
        updates: Vec<(NodeField, Option<String>)>,
    },
    Renumber {
        parent: NodeId,
        previous: Vec<(NodeId, Option<String>)>,
    },
    BatchAdd {
        parent: NodeId,
        nodes: Vec<NodeId>,
    },
    AddTemplate {
        parent: NodeId,
        node: NodeId,
        template: String,
    },
}

impl OperationPayload {
    /// String name of the operation type.
    pub fn op_type_name(&self) -> &'static str {
        match self {
            Self::AddChild { .. } => "add_child",
            Self::AddSibling { .. } => "add_sibling",
            Self::Duplicate { .. } => "duplicate",
            Self::Delete { .. } => "delete",
            Self::Move {
                direction: MoveDirection::Up,
                ..
            } => "move_up",
            Self::Move {
                direction: MoveDirection::Down,
                ..
            } => "move_down",
            Self::MoveToParent { .. } => "move_to_parent",
            Self::Edit { .. } => "edit",
            Self::Renumber { .. } => "renumber",
            Self::BatchAdd { .. } => "batch_add",
            Self::AddTemplate { .. } => "add_template",
        }
    }

    /// Rewrite node ids after a save assigned permanent ids to temporary ones.
    pub fn remap_ids(&mut self, map: &HashMap<NodeId, NodeId>) {
        let remap = |id: &mut NodeId| {
            if let Some(new) = map.get(id) {
                *id = *new;
            }
        };
        match self {
            Self::AddChild { parent, node, .. } | Self::AddTemplate { parent, node, .. } => {
                remap(parent);
                remap(node);
            }
            Self::AddSibling {
                parent,
                node,
                reference,
                ..
            } => {
                remap(parent);
                remap(node);
                remap(reference);
            }
            Self::Duplicate {
                parent,
                node,
                original,
                ..
            } => {
                remap(parent);
                remap(node);
                remap(original);
            }
            Self::Delete { parent, node, .. } => {
                remap(parent);
                node.walk_mut(&mut |n| remap(&mut n.id));
            }
            Self::Move { parent, .. } => remap(parent),
            Self::Renumber { parent, previous } => {
                remap(parent);
                for (id, _) in previous {
                    remap(id);
                }
            }
            Self::MoveToParent {
                node,
                old_parent,
                new_parent,
                ..
            } => {
                remap(node);
                remap(old_parent);
                remap(new_parent);
            }
            Self::Edit { node, .. } => remap(node),
            Self::BatchAdd { parent, nodes } => {
                remap(parent);
                for id in nodes {
                    remap(id);
                }
            }
        }
    }
}

/// One entry of the undo log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub payload: OperationPayload,
    pub timestamp: u64,
}

impl OperationRecord {
    pub fn new(payload: OperationPayload, timestamp: u64) -> Self {
        Self { payload, timestamp }
    }

    pub fn op_type_name(&self) -> &'static str {
        self.payload.op_type_name()
    }
}
