//! Graph Hierarchy
//!
//! A named collection of typed graphs plus typing morphisms between them.
//! A typing is a total function from the nodes of a source graph to the
//! nodes of a target graph that preserves edges: for every edge `(u, v)` of
//! the source, `(t(u), t(v))` is an edge of the target.
//!
//! The mapping pipeline always carries three graphs:
//! - `G`: the schema (working) graph
//! - `S`: the annotation graph
//! - `M`: the meta-model
//!
//! with typings `G -> S` and `G -> M`, and `S -> M` once S is finalized.
//!
//! Edits are propagated through the typings: removing a node or edge removes
//! everything typed by it in lower graphs, and (in non-strict mode) adding a
//! node or edge extends the graphs above so the typings stay homomorphisms.

pub mod matching;
pub mod rewrite;
pub mod typing;

pub use matching::{Instance, PatternTyping};
pub use typing::{annotation_meta_typing, schema_annotation_typing, schema_meta_typing};

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{MappingError, Result};
use crate::graph::{NodeId, TypedGraph};

/// Name of the schema graph
pub const SCHEMA: &str = "G";
/// Name of the annotation graph
pub const ANNOTATION: &str = "S";
/// Name of the meta-model graph
pub const META: &str = "M";

/// Node-to-node mapping from one graph into another
pub type Typing = HashMap<NodeId, NodeId>;

/// Named typed graphs and the typings between them
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    graphs: BTreeMap<String, TypedGraph>,
    /// (source, target) -> typing
    typings: BTreeMap<(String, String), Typing>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a graph under a new name
    pub fn add_graph(&mut self, name: impl Into<String>, graph: TypedGraph) -> Result<()> {
        let name = name.into();
        if self.graphs.contains_key(&name) {
            return Err(MappingError::Graph(format!("graph '{}' already exists", name)));
        }
        self.graphs.insert(name, graph);
        Ok(())
    }

    pub fn graph(&self, name: &str) -> Result<&TypedGraph> {
        self.graphs
            .get(name)
            .ok_or_else(|| MappingError::UnknownGraph(name.to_string()))
    }

    pub(crate) fn graph_mut(&mut self, name: &str) -> Result<&mut TypedGraph> {
        self.graphs
            .get_mut(name)
            .ok_or_else(|| MappingError::UnknownGraph(name.to_string()))
    }

    /// Add a typing from `source` into `target`.
    ///
    /// The mapping must be total on the source graph and point at existing
    /// target nodes. Image edges missing from the target are an error in
    /// strict mode and are added to the target otherwise.
    pub fn add_typing(&mut self, source: &str, target: &str, mapping: Typing, strict: bool) -> Result<()> {
        let key = (source.to_string(), target.to_string());
        if self.typings.contains_key(&key) {
            return Err(MappingError::typing(source, format!("typing into {} already exists", target)));
        }

        let src = self.graph(source)?;
        let tgt = self.graph(target)?;

        for node in src.nodes() {
            match mapping.get(node) {
                None => {
                    return Err(MappingError::typing(
                        source,
                        format!("node '{}' has no type in {}", node, target),
                    ))
                }
                Some(t) if !tgt.contains_node(t) => return Err(MappingError::unknown_node(target, t.as_str())),
                Some(_) => {}
            }
        }
        if let Some(extra) = mapping.keys().find(|k| !src.contains_node(k)) {
            return Err(MappingError::unknown_node(source, extra.as_str()));
        }

        let missing: Vec<(NodeId, NodeId)> = src
            .edges()
            .into_iter()
            .filter_map(|(u, v)| {
                let (tu, tv) = (&mapping[u], &mapping[v]);
                (!tgt.has_edge(tu, tv)).then(|| (tu.clone(), tv.clone()))
            })
            .collect();

        if strict {
            if let Some((a, b)) = missing.first() {
                return Err(MappingError::typing(
                    source,
                    format!("edge '{}' -> '{}' is not present in {}", a, b, target),
                ));
            }
        }

        self.typings.insert(key, mapping);
        for (a, b) in missing {
            // several source edges can share one image
            if !self.graph_mut(target)?.ensure_edge(&a, &b)? {
                continue;
            }
            debug!(graph = target, from = %a, to = %b, "completing typing with image edge");
            self.propagate_edge_up(target, &a, &b, strict)?;
        }
        Ok(())
    }

    pub fn typing(&self, source: &str, target: &str) -> Option<&Typing> {
        self.typings.get(&(source.to_string(), target.to_string()))
    }

    /// Type of `node` in `target`, following the direct typing
    pub fn type_of(&self, graph: &str, node: &str, target: &str) -> Option<&str> {
        self.typing(graph, target)
            .and_then(|t| t.get(node))
            .map(|s| s.as_str())
    }

    /// Types of a node in every graph its graph is typed by
    pub fn node_type(&self, graph: &str, node: &str) -> BTreeMap<&str, &str> {
        self.typings
            .iter()
            .filter(|((source, _), _)| source == graph)
            .filter_map(|((_, target), typing)| typing.get(node).map(|t| (target.as_str(), t.as_str())))
            .collect()
    }

    /// Names of graphs that `graph` is typed by
    pub(crate) fn targets_of(&self, graph: &str) -> Vec<String> {
        self.typings
            .keys()
            .filter(|(source, _)| source == graph)
            .map(|(_, target)| target.clone())
            .collect()
    }

    /// Names of graphs typed by `graph`
    pub(crate) fn sources_of(&self, graph: &str) -> Vec<String> {
        self.typings
            .keys()
            .filter(|(_, target)| target == graph)
            .map(|(source, _)| source.clone())
            .collect()
    }

    pub(crate) fn set_type(&mut self, source: &str, target: &str, node: &str, ty: &str) {
        if let Some(typing) = self.typings.get_mut(&(source.to_string(), target.to_string())) {
            typing.insert(node.to_string(), ty.to_string());
        }
    }

    // =========================================================================
    // Propagation
    // =========================================================================

    /// Remove a node and, recursively, every node typed by it
    pub(crate) fn remove_node_propagating(&mut self, graph: &str, node: &str) -> Result<()> {
        for source in self.sources_of(graph) {
            let typed: Vec<NodeId> = self
                .typing(&source, graph)
                .map(|t| t.iter().filter(|(_, v)| v.as_str() == node).map(|(k, _)| k.clone()).collect())
                .unwrap_or_default();
            for n in typed {
                if self.graph(&source)?.contains_node(&n) {
                    self.remove_node_propagating(&source, &n)?;
                }
            }
        }

        self.graph_mut(graph)?.remove_node(node)?;
        for ((source, target), typing) in self.typings.iter_mut() {
            if source == graph {
                typing.remove(node);
            }
            if target == graph {
                typing.retain(|_, v| v.as_str() != node);
            }
        }
        debug!(graph, node, "removed node");
        Ok(())
    }

    /// Remove an edge and, recursively, every edge typed by it
    pub(crate) fn remove_edge_propagating(&mut self, graph: &str, from: &str, to: &str) -> Result<()> {
        for source in self.sources_of(graph) {
            let typed: Vec<(NodeId, NodeId)> = match self.typing(&source, graph) {
                Some(typing) => self
                    .graph(&source)?
                    .edges()
                    .into_iter()
                    .filter(|(u, v)| {
                        typing.get(*u).map(|s| s.as_str()) == Some(from)
                            && typing.get(*v).map(|s| s.as_str()) == Some(to)
                    })
                    .map(|(u, v)| (u.to_string(), v.to_string()))
                    .collect(),
                None => Vec::new(),
            };
            for (u, v) in typed {
                self.remove_edge_propagating(&source, &u, &v)?;
            }
        }
        self.graph_mut(graph)?.remove_edge(from, to)
    }

    /// Make sure the image of a new edge exists in every graph above
    pub(crate) fn propagate_edge_up(&mut self, graph: &str, from: &str, to: &str, strict: bool) -> Result<()> {
        for target in self.targets_of(graph) {
            let (Some(tf), Some(tt)) = (
                self.type_of(graph, from, &target).map(str::to_string),
                self.type_of(graph, to, &target).map(str::to_string),
            ) else {
                return Err(MappingError::typing(
                    graph,
                    format!("edge '{}' -> '{}' has an untyped endpoint in {}", from, to, target),
                ));
            };
            if self.graph(&target)?.has_edge(&tf, &tt) {
                continue;
            }
            if strict {
                return Err(MappingError::typing(
                    graph,
                    format!("image edge '{}' -> '{}' is missing in {}", tf, tt, target),
                ));
            }
            self.graph_mut(&target)?.add_edge(&tf, &tt)?;
            debug!(graph = %target, from = %tf, to = %tt, "propagated edge");
            self.propagate_edge_up(&target, &tf, &tt, strict)?;
        }
        Ok(())
    }

    /// Check that every typing is total and preserves edges
    pub fn check(&self) -> Result<()> {
        for ((source, target), typing) in &self.typings {
            let src = self.graph(source)?;
            let tgt = self.graph(target)?;
            for node in src.nodes() {
                match typing.get(node) {
                    Some(t) if tgt.contains_node(t) => {}
                    _ => {
                        return Err(MappingError::typing(
                            source.as_str(),
                            format!("node '{}' is not typed by {}", node, target),
                        ))
                    }
                }
            }
            for (u, v) in src.edges() {
                if !tgt.has_edge(&typing[u], &typing[v]) {
                    return Err(MappingError::typing(
                        source.as_str(),
                        format!("edge '{}' -> '{}' is not preserved in {}", u, v, target),
                    ));
                }
            }
        }
        Ok(())
    }
}
