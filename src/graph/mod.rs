//! Typed Graphs
//!
//! Directed graphs whose nodes are identified by path strings and carry
//! type attributes. Used for the schema graph (G), the annotation graph (S)
//! and the meta-model (M). Backed by petgraph with a HashMap index from node
//! identifier to `NodeIndex` for O(1) lookup.

pub mod loader;
pub mod meta;

pub use loader::{annotation_graph, schema_graph};
pub use meta::{meta_model, MetaNode};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{MappingError, Result};

/// Node identifier (dotted path, annotation value or meta-model name)
pub type NodeId = String;

/// Type tag attached to schema and annotation nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Struct,
    Array,
    Field,
}

/// Node payload. Every attribute is optional; meta-model nodes carry none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    /// Unqualified field or annotation key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    /// Declared type string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Key path of the annotation entry that produced this node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_id: Option<String>,
}

impl NodeAttrs {
    pub fn of_kind(kind: NodeKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key_name = Some(key.into());
        self
    }
}

/// A directed graph with per-node attributes
#[derive(Debug, Clone, Default)]
pub struct TypedGraph {
    graph: StableDiGraph<NodeId, ()>,

    /// Node index lookup: id -> NodeIndex
    node_indices: HashMap<NodeId, NodeIndex>,

    /// Per-node attributes
    attrs: HashMap<NodeId, NodeAttrs>,

    /// Insertion sequence, so iteration order survives removals
    seq: HashMap<NodeId, u64>,
    next_seq: u64,
}

impl TypedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; fails if the identifier is already taken
    pub fn add_node(&mut self, id: impl Into<NodeId>, attrs: NodeAttrs) -> Result<()> {
        let id = id.into();
        if self.node_indices.contains_key(&id) {
            return Err(MappingError::Graph(format!("node '{}' already exists", id)));
        }
        self.insert_node(id, attrs);
        Ok(())
    }

    /// Add a node unless it already exists. Returns true when inserted.
    pub fn ensure_node(&mut self, id: impl Into<NodeId>, attrs: NodeAttrs) -> bool {
        let id = id.into();
        if self.node_indices.contains_key(&id) {
            return false;
        }
        self.insert_node(id, attrs);
        true
    }

    fn insert_node(&mut self, id: NodeId, attrs: NodeAttrs) {
        let idx = self.graph.add_node(id.clone());
        self.node_indices.insert(id.clone(), idx);
        self.attrs.insert(id.clone(), attrs);
        self.seq.insert(id, self.next_seq);
        self.next_seq += 1;
    }

    /// Add an edge; fails if an endpoint is missing or the edge exists
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let (a, b) = (self.index(from)?, self.index(to)?);
        if self.graph.find_edge(a, b).is_some() {
            return Err(MappingError::Graph(format!("edge '{}' -> '{}' already exists", from, to)));
        }
        self.graph.add_edge(a, b, ());
        Ok(())
    }

    /// Add an edge unless it already exists. Returns true when inserted.
    pub fn ensure_edge(&mut self, from: &str, to: &str) -> Result<bool> {
        let (a, b) = (self.index(from)?, self.index(to)?);
        if self.graph.find_edge(a, b).is_some() {
            return Ok(false);
        }
        self.graph.add_edge(a, b, ());
        Ok(true)
    }

    /// Remove a node together with all incident edges
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        let idx = self.index(id)?;
        self.graph.remove_node(idx);
        self.node_indices.remove(id);
        self.attrs.remove(id);
        self.seq.remove(id);
        Ok(())
    }

    pub fn remove_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let (a, b) = (self.index(from)?, self.index(to)?);
        let edge = self
            .graph
            .find_edge(a, b)
            .ok_or_else(|| MappingError::Graph(format!("edge '{}' -> '{}' does not exist", from, to)))?;
        self.graph.remove_edge(edge);
        Ok(())
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_indices.contains_key(id)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.node_indices.get(from), self.node_indices.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Node identifiers in insertion order
    pub fn nodes(&self) -> Vec<&str> {
        let mut ids: Vec<&NodeId> = self.node_indices.keys().collect();
        ids.sort_by_key(|id| self.seq.get(*id).copied().unwrap_or(u64::MAX));
        ids.into_iter().map(|id| id.as_str()).collect()
    }

    /// Edges ordered by (source, target) insertion order
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                let from = self.graph.node_weight(e.source())?;
                let to = self.graph.node_weight(e.target())?;
                Some((from.as_str(), to.as_str()))
            })
            .collect();
        edges.sort_by_key(|(a, b)| (self.order_of(a), self.order_of(b)));
        edges
    }

    /// Immediate children, in insertion order
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Immediate parents, in insertion order
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n))
            .map(|s| s.as_str())
            .collect();
        out.sort_by_key(|n| self.order_of(n));
        out.dedup();
        out
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn attrs(&self, id: &str) -> Option<&NodeAttrs> {
        self.attrs.get(id)
    }

    pub fn kind(&self, id: &str) -> Option<NodeKind> {
        self.attrs.get(id).and_then(|a| a.kind)
    }

    /// Copy of the graph with every node payload cleared
    pub fn copy_stripping_attributes(&self) -> Self {
        let mut copy = self.clone();
        for attrs in copy.attrs.values_mut() {
            *attrs = NodeAttrs::default();
        }
        copy
    }

    fn index(&self, id: &str) -> Result<NodeIndex> {
        self.node_indices
            .get(id)
            .copied()
            .ok_or_else(|| MappingError::Graph(format!("node '{}' does not exist", id)))
    }

    fn order_of(&self, id: &str) -> u64 {
        self.seq.get(id).copied().unwrap_or(u64::MAX)
    }
}
