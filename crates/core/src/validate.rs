use std::fmt;

use crate::ids::NodeId;
use crate::node::Node;
use crate::taxonomy::NodeType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The tree's root is not a statute.
    RootNotStatute { id: NodeId, node_type: NodeType },
    /// A node sits under a parent type that does not accept it.
    InvalidChild {
        id: NodeId,
        name: String,
        node_type: NodeType,
        parent_type: NodeType,
    },
    /// A node has an empty (or blank) name.
    EmptyName { id: NodeId, node_type: NodeType },
}

impl Violation {
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::RootNotStatute { id, .. }
            | Self::InvalidChild { id, .. }
            | Self::EmptyName { id, .. } => *id,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotStatute { node_type, .. } => {
                write!(f, "Root must be a statute, found {}", node_type.as_str())
            }
            Self::InvalidChild {
                name,
                node_type,
                parent_type,
                ..
            } => write!(
                f,
                "Invalid child type {} for parent {} in \"{}\"",
                node_type.as_str(),
                parent_type.as_str(),
                name
            ),
            Self::EmptyName { id, node_type } => {
                write!(f, "{} {} has no name", node_type.label(), id)
            }
        }
    }
}

/// Hierarchy-shape check. Collects every violation instead of stopping at the first.
pub fn validate(root: &Node) -> Vec<Violation> {
    let mut violations = Vec::new();
    if root.node_type != NodeType::Statute {
        violations.push(Violation::RootNotStatute {
            id: root.id,
            node_type: root.node_type,
        });
    }
    check_children(root, &mut violations);
    violations
}

fn check_children(parent: &Node, out: &mut Vec<Violation>) {
    for child in &parent.children {
        if !parent.node_type.accepts_child(child.node_type) {
            out.push(Violation::InvalidChild {
                id: child.id,
                name: child.name.clone(),
                node_type: child.node_type,
                parent_type: parent.node_type,
            });
        }
        check_children(child, out);
    }
}

/// Everything that must hold before a tree may be sent to the store:
/// the hierarchy check plus non-empty names.
pub fn validate_for_save(root: &Node) -> Vec<Violation> {
    let mut violations = validate(root);
    root.walk(&mut |n| {
        if n.name.trim().is_empty() {
            violations.push(Violation::EmptyName {
                id: n.id,
                node_type: n.node_type,
            });
        }
    });
    violations
}
