use std::collections::{HashMap, VecDeque};

use statute_core::{
    operations::{OperationPayload, OperationRecord},
    tree, CoreError, DeletedLedger, Node, NodeField, NodeId,
};

/// Bounded history of operation records. There is no redo.
pub struct UndoLog {
    records: VecDeque<OperationRecord>,
    capacity: usize,
}

impl UndoLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, record: OperationRecord) {
        self.records.push_back(record);
        // Enforce depth limit by dropping oldest entry
        if self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<OperationRecord> {
        self.records.pop_back()
    }

    pub fn peek(&self) -> Option<&OperationRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn remap_ids(&mut self, map: &HashMap<NodeId, NodeId>) {
        for record in &mut self.records {
            record.payload.remap_ids(map);
        }
    }

    /// Drops the newest record matching `pred` together with every record
    /// older than it. Returns how many were dropped.
    pub fn discard_through(&mut self, pred: impl Fn(&OperationRecord) -> bool) -> usize {
        match self.records.iter().rposition(|record| pred(record)) {
            Some(index) => {
                self.records.drain(..=index);
                index + 1
            }
            None => 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationRecord> {
        self.records.iter()
    }
}

fn node_mut(root: &mut Node, id: NodeId) -> Result<&mut Node, CoreError> {
    tree::find_by_id_mut(root, id).ok_or(CoreError::NodeNotFound(id))
}

fn child_position(parent: &Node, id: NodeId) -> Result<usize, CoreError> {
    tree::child_index(parent, id).ok_or(CoreError::NodeNotFound(id))
}

fn check_index(parent: &Node, index: usize) -> Result<(), CoreError> {
    if index > parent.children.len() {
        return Err(CoreError::InvalidData(format!(
            "index {index} out of range under {}",
            parent.id
        )));
    }
    Ok(())
}

/// Applies the inverse of `payload`. Every precondition is checked before the
/// first change, so an error leaves the tree and ledger untouched.
pub fn apply_inverse(
    root: &mut Node,
    ledger: &mut DeletedLedger,
    payload: &OperationPayload,
) -> Result<(), CoreError> {
    match payload {
        OperationPayload::AddChild { parent, node, .. }
        | OperationPayload::AddSibling { parent, node, .. }
        | OperationPayload::Duplicate { parent, node, .. }
        | OperationPayload::AddTemplate { parent, node, .. } => {
            let parent = node_mut(root, *parent)?;
            let index = child_position(parent, *node)?;
            parent.children.remove(index);
        }

        OperationPayload::BatchAdd { parent, nodes } => {
            let parent = node_mut(root, *parent)?;
            for id in nodes {
                child_position(parent, *id)?;
            }
            parent.children.retain(|c| !nodes.contains(&c.id));
        }

        OperationPayload::Delete {
            parent,
            index,
            node,
        } => {
            if tree::find_by_id(root, node.id).is_some() {
                return Err(CoreError::InvalidData(format!("{} is already in the tree", node.id)));
            }
            let parent = node_mut(root, *parent)?;
            check_index(parent, *index)?;
            parent.children.insert(*index, node.clone());
            ledger.revert_subtree(node);
        }

        OperationPayload::Move {
            parent,
            from,
            to,
            previous_markers,
            ..
        } => {
            let parent = node_mut(root, *parent)?;
            if (*from).max(*to) >= parent.children.len() {
                return Err(CoreError::InvalidData(format!(
                    "swap {from}/{to} out of range under {}",
                    parent.id
                )));
            }
            parent.children.swap(*from, *to);
            parent.children[*from].order_changed = previous_markers[0];
            parent.children[*to].order_changed = previous_markers[1];
        }

        OperationPayload::MoveToParent {
            node,
            old_parent,
            old_index,
            new_parent,
            previous_marker,
            ..
        } => {
            let index = {
                let current = node_mut(root, *new_parent)?;
                child_position(current, *node)?
            };
            {
                let original = node_mut(root, *old_parent)?;
                // The node leaves `new_parent` first; when both are the same
                // parent the original index is checked against the shorter list.
                let len = original.children.len() - usize::from(old_parent == new_parent);
                if *old_index > len {
                    return Err(CoreError::InvalidData(format!(
                        "index {old_index} out of range under {old_parent}"
                    )));
                }
            }
            let mut moved = node_mut(root, *new_parent)?.children.remove(index);
            moved.order_changed = *previous_marker;
            node_mut(root, *old_parent)?.children.insert(*old_index, moved);
        }

        OperationPayload::Edit { node, original, .. } => {
            let target = node_mut(root, *node)?;
            for (field, _) in original {
                if !field.applies_to(target.node_type) {
                    return Err(CoreError::FieldNotApplicable {
                        field: field.as_str(),
                        node_type: target.node_type,
                    });
                }
            }
            for (field, value) in original {
                target.set_field(*field, value.clone())?;
            }
        }

        OperationPayload::Renumber { parent, previous } => {
            let parent = node_mut(root, *parent)?;
            for (id, _) in previous {
                child_position(parent, *id)?;
            }
            for (id, number) in previous {
                let index = child_position(parent, *id)?;
                parent.children[index].set_field(NodeField::Number, number.clone())?;
            }
        }
    }
    Ok(())
}
