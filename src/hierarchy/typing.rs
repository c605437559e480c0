//! Typing derivation
//!
//! Builds the initial typings of the hierarchy from the attributed schema
//! and annotation graphs.

use crate::config::GraphConfig;
use crate::graph::{MetaNode, NodeKind, TypedGraph};

use super::Typing;

/// Type every schema node by its structural kind (`G -> M`)
pub fn schema_meta_typing(g: &TypedGraph) -> Typing {
    g.nodes()
        .into_iter()
        .map(|node| {
            let meta = MetaNode::from_kind(g.kind(node).unwrap_or(NodeKind::Field));
            (node.to_string(), meta.as_str().to_string())
        })
        .collect()
}

/// Join schema nodes to annotation leaves (`G -> S`).
///
/// A schema node is typed by the annotation leaf whose value equals its
/// path. The root maps to the root; everything else maps to the sink.
pub fn schema_annotation_typing(g: &TypedGraph, s: &TypedGraph, config: &GraphConfig) -> Typing {
    g.nodes()
        .into_iter()
        .map(|node| {
            let ty = if node == config.root {
                config.root.as_str()
            } else if s.kind(node) == Some(NodeKind::Field) {
                node
            } else {
                config.sink.as_str()
            };
            (node.to_string(), ty.to_string())
        })
        .collect()
}

/// Type annotation nodes by the kind the builder gave them (`S -> M`).
///
/// Takes the attributed S. The sink has no kind and no meta type; this
/// typing is only total once the sink has been removed from S.
pub fn annotation_meta_typing(s: &TypedGraph, config: &GraphConfig) -> Typing {
    s.nodes()
        .into_iter()
        .filter(|node| *node != config.sink)
        .filter_map(|node| {
            let meta = MetaNode::from_kind(s.kind(node)?);
            Some((node.to_string(), meta.as_str().to_string()))
        })
        .collect()
}
