//! Meta-Model
//!
//! The fixed graph of legal nesting kinds. A STRUCT may contain STRUCT,
//! ARRAY and FIELD; an ARRAY contains STRUCT or FIELD elements; FIELD is
//! always a leaf.

use super::{NodeAttrs, NodeKind, TypedGraph};

/// Nodes of the meta-model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaNode {
    Root,
    Struct,
    Array,
    Field,
}

impl MetaNode {
    pub const ALL: [MetaNode; 4] = [MetaNode::Root, MetaNode::Struct, MetaNode::Array, MetaNode::Field];

    /// Node identifier inside M
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaNode::Root => "ROOT",
            MetaNode::Struct => "STRUCT",
            MetaNode::Array => "ARRAY",
            MetaNode::Field => "FIELD",
        }
    }

    pub fn from_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Root => MetaNode::Root,
            NodeKind::Struct => MetaNode::Struct,
            NodeKind::Array => MetaNode::Array,
            NodeKind::Field => MetaNode::Field,
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == id)
    }
}

impl std::fmt::Display for MetaNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edges permitted by the meta-model
pub const META_EDGES: [(MetaNode, MetaNode); 8] = [
    (MetaNode::Struct, MetaNode::Struct),
    (MetaNode::Root, MetaNode::Struct),
    (MetaNode::Struct, MetaNode::Array),
    (MetaNode::Root, MetaNode::Array),
    (MetaNode::Array, MetaNode::Struct),
    (MetaNode::Struct, MetaNode::Field),
    (MetaNode::Root, MetaNode::Field),
    (MetaNode::Array, MetaNode::Field),
];

/// Build the meta-model graph M
pub fn meta_model() -> TypedGraph {
    let mut m = TypedGraph::new();
    for node in MetaNode::ALL {
        m.ensure_node(node.as_str(), NodeAttrs::default());
    }
    for (from, to) in META_EDGES {
        // Endpoints were inserted above, so this cannot fail.
        let _ = m.ensure_edge(from.as_str(), to.as_str());
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_model_shape() {
        let m = meta_model();
        assert_eq!(m.nodes(), vec!["ROOT", "STRUCT", "ARRAY", "FIELD"]);
        assert_eq!(m.edge_count(), 8);
        assert!(m.has_edge("STRUCT", "STRUCT"));
        assert!(m.has_edge("ARRAY", "STRUCT"));
        assert!(!m.has_edge("ARRAY", "ARRAY"));
        assert!(m.successors("FIELD").is_empty());
    }

    #[test]
    fn test_parse_round_trip() {
        for node in MetaNode::ALL {
            assert_eq!(MetaNode::parse(node.as_str()), Some(node));
        }
        assert_eq!(MetaNode::parse("root"), None);
    }
}
