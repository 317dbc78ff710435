//! Counts shown in confirmation prompts and the status bar.

use crate::node::Node;

/// What a delete of one node would take with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeStats {
    pub descendants: usize,
    pub with_content: usize,
}

impl CascadeStats {
    pub fn of(node: &Node) -> Self {
        let mut stats = Self::default();
        for child in &node.children {
            child.walk(&mut |n| {
                stats.descendants += 1;
                if n.has_text_content() {
                    stats.with_content += 1;
                }
            });
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub total_nodes: usize,
    /// Depth of the deepest node; the root alone is depth 0.
    pub max_depth: usize,
    pub unsaved_nodes: usize,
    pub nodes_with_content: usize,
}

impl TreeStats {
    pub fn of(root: &Node) -> Self {
        let mut stats = Self::default();
        collect(root, 0, &mut stats);
        stats
    }
}

fn collect(node: &Node, depth: usize, stats: &mut TreeStats) {
    stats.total_nodes += 1;
    stats.max_depth = stats.max_depth.max(depth);
    if node.id.is_temporary() {
        stats.unsaved_nodes += 1;
    }
    if node.has_text_content() {
        stats.nodes_with_content += 1;
    }
    for child in &node.children {
        collect(child, depth + 1, stats);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStats {
    pub direct_children: usize,
    pub total_descendants: usize,
    pub descendants_with_content: usize,
    pub is_saved: bool,
}

impl NodeStats {
    pub fn of(node: &Node) -> Self {
        let cascade = CascadeStats::of(node);
        Self {
            direct_children: node.children.len(),
            total_descendants: cascade.descendants,
            descendants_with_content: cascade.with_content,
            is_saved: node.id.is_persisted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;
    use crate::taxonomy::NodeType;

    fn sample() -> Node {
        Node::new(NodeId::new(1), NodeType::Statute, "Act").with_child(
            Node::new(NodeId::new(2), NodeType::Part, "P").with_child(
                Node::new(NodeId::new(-1), NodeType::Chapter, "C").with_child(
                    Node::new(NodeId::new(-2), NodeType::Set, "S").with_child(
                        Node::new(NodeId::new(-3), NodeType::Section, "Sec")
                            .with_child(
                                Node::new(NodeId::new(-4), NodeType::Subsection, "a")
                                    .with_content("text"),
                            )
                            .with_child(Node::new(NodeId::new(-5), NodeType::Subsection, "b")),
                    ),
                ),
            ),
        )
    }

    #[test]
    fn cascade_counts_descendants_only() {
        let root = sample();
        let part = &root.children[0];
        assert_eq!(
            CascadeStats::of(part),
            CascadeStats {
                descendants: 5,
                with_content: 1
            }
        );
    }

    #[test]
    fn tree_stats() {
        let stats = TreeStats::of(&sample());
        assert_eq!(stats.total_nodes, 7);
        assert_eq!(stats.max_depth, 5);
        assert_eq!(stats.unsaved_nodes, 5);
        assert_eq!(stats.nodes_with_content, 1);
    }

    #[test]
    fn node_stats() {
        let root = sample();
        let stats = NodeStats::of(&root.children[0]);
        assert_eq!(stats.direct_children, 1);
        assert!(stats.is_saved);
    }
}
