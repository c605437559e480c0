//! Rewrite Rules
//!
//! A rule is a left-hand pattern plus an ordered list of atomic edits. The
//! right-hand graph is what the pattern becomes once the edits are applied.
//! Edits may only reference pattern nodes or nodes added by the same rule.

use std::collections::HashMap;
use std::fmt;

use crate::error::{MappingError, Result};
use crate::graph::{NodeAttrs, NodeId, TypedGraph};

/// Types of right-hand nodes: typing graph -> rhs node -> type
pub type RhsTyping = HashMap<String, HashMap<NodeId, NodeId>>;

/// Atomic graph edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    AddNode(NodeId),
    RemoveNode(NodeId),
    AddEdge(NodeId, NodeId),
    RemoveEdge(NodeId, NodeId),
}

impl Edit {
    pub fn is_removal(&self) -> bool {
        matches!(self, Edit::RemoveNode(_) | Edit::RemoveEdge(..))
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::AddNode(n) => write!(f, "+{}", n),
            Edit::RemoveNode(n) => write!(f, "-{}", n),
            Edit::AddEdge(a, b) => write!(f, "+({} -> {})", a, b),
            Edit::RemoveEdge(a, b) => write!(f, "-({} -> {})", a, b),
        }
    }
}

/// A rewrite rule over a single graph
#[derive(Debug, Clone)]
pub struct Rule {
    lhs: TypedGraph,
    edits: Vec<Edit>,
}

impl Rule {
    /// Identity rule on `lhs`
    pub fn from_pattern(lhs: TypedGraph) -> Self {
        Self { lhs, edits: Vec::new() }
    }

    pub fn add_node(mut self, id: impl Into<NodeId>) -> Self {
        self.edits.push(Edit::AddNode(id.into()));
        self
    }

    pub fn remove_node(mut self, id: impl Into<NodeId>) -> Self {
        self.edits.push(Edit::RemoveNode(id.into()));
        self
    }

    pub fn add_edge(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.edits.push(Edit::AddEdge(from.into(), to.into()));
        self
    }

    pub fn remove_edge(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.edits.push(Edit::RemoveEdge(from.into(), to.into()));
        self
    }

    pub fn lhs(&self) -> &TypedGraph {
        &self.lhs
    }

    /// Edits in application order: removals first, then node additions,
    /// then edge additions
    pub fn ordered_edits(&self) -> impl Iterator<Item = &Edit> {
        let removals = self.edits.iter().filter(|e| e.is_removal());
        let nodes = self.edits.iter().filter(|e| matches!(e, Edit::AddNode(_)));
        let edges = self.edits.iter().filter(|e| matches!(e, Edit::AddEdge(..)));
        removals.chain(nodes).chain(edges)
    }

    /// Nodes introduced by the rule
    pub fn added_nodes(&self) -> impl Iterator<Item = &str> {
        self.edits.iter().filter_map(|e| match e {
            Edit::AddNode(n) => Some(n.as_str()),
            _ => None,
        })
    }

    /// Right-hand graph. Fails if an edit references a node that is
    /// neither in the pattern nor added by the rule, or if an edit is
    /// inapplicable to the pattern.
    pub fn rhs(&self) -> Result<TypedGraph> {
        let mut rhs = self.lhs.clone();
        for edit in self.ordered_edits() {
            match edit {
                Edit::RemoveNode(n) => self.require_lhs(n).and_then(|_| rhs.remove_node(n))?,
                Edit::RemoveEdge(a, b) => {
                    self.require_lhs(a)?;
                    self.require_lhs(b)?;
                    rhs.remove_edge(a, b)?;
                }
                Edit::AddNode(n) => rhs.add_node(n.as_str(), NodeAttrs::default())?,
                Edit::AddEdge(a, b) => rhs.add_edge(a, b)?,
            }
        }
        Ok(rhs)
    }

    fn require_lhs(&self, node: &str) -> Result<()> {
        if self.lhs.contains_node(node) {
            Ok(())
        } else {
            Err(MappingError::Graph(format!(
                "rule removes '{}', which is not part of its pattern",
                node
            )))
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.lhs.nodes().join(", "))?;
        for edit in &self.edits {
            write!(f, " {}", edit)?;
        }
        Ok(())
    }
}
