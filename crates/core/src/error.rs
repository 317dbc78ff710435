use thiserror::Error;

use crate::ids::NodeId;
use crate::taxonomy::NodeType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("cannot add children to {0}: it is a leaf node")]
    LeafNode(NodeType),

    #[error("cannot add {child} to {parent}: invalid hierarchy")]
    InvalidChildType { parent: NodeType, child: NodeType },

    #[error("cannot {0} the statute root")]
    RootImmutable(&'static str),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("invalid drop target: {0}")]
    InvalidDrop(&'static str),

    #[error("name must not be empty")]
    EmptyName,

    #[error("field {field} does not apply to {node_type}")]
    FieldNotApplicable { field: &'static str, node_type: NodeType },

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
