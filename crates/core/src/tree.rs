//! Identity-keyed navigation over a node tree.
//!
//! Every lookup is keyed by [`NodeId`], never by field values, so two nodes
//! with identical names and numbers are never confused.

use crate::ids::NodeId;
use crate::node::Node;

pub fn find_by_id(root: &Node, id: NodeId) -> Option<&Node> {
    if root.id == id {
        return Some(root);
    }
    root.children.iter().find_map(|child| find_by_id(child, id))
}

pub fn find_by_id_mut(root: &mut Node, id: NodeId) -> Option<&mut Node> {
    if root.id == id {
        return Some(root);
    }
    for child in &mut root.children {
        if let Some(found) = find_by_id_mut(child, id) {
            return Some(found);
        }
    }
    None
}

/// The node whose children contain `id`. `None` for the root or an unknown id.
pub fn find_parent(root: &Node, id: NodeId) -> Option<&Node> {
    if root.children.iter().any(|c| c.id == id) {
        return Some(root);
    }
    root.children.iter().find_map(|child| find_parent(child, id))
}

pub fn find_parent_mut(root: &mut Node, id: NodeId) -> Option<&mut Node> {
    if root.children.iter().any(|c| c.id == id) {
        return Some(root);
    }
    for child in &mut root.children {
        if let Some(found) = find_parent_mut(child, id) {
            return Some(found);
        }
    }
    None
}

/// True when `id` is reachable strictly below `ancestor`.
pub fn is_descendant(ancestor: &Node, id: NodeId) -> bool {
    ancestor
        .children
        .iter()
        .any(|child| child.id == id || is_descendant(child, id))
}

pub fn child_index(parent: &Node, id: NodeId) -> Option<usize> {
    parent.children.iter().position(|c| c.id == id)
}

/// Pre-order list of ids, the order in which an expanded tree view lists nodes.
pub fn preorder_ids(root: &Node) -> Vec<NodeId> {
    let mut ids = Vec::new();
    root.walk(&mut |n| ids.push(n.id));
    ids
}
