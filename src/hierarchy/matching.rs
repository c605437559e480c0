//! Pattern Matching
//!
//! Finds every injective mapping of a pattern graph into a graph of the
//! hierarchy such that pattern edges land on graph edges. The search is
//! non-induced: the matched subgraph may carry extra edges. Pattern nodes can
//! be constrained by the type their image must have in the graphs above.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::graph::{NodeId, TypedGraph};

use super::Hierarchy;

/// Mapping from pattern nodes to graph nodes
pub type Instance = HashMap<NodeId, NodeId>;

/// Required types of pattern nodes: typing graph -> pattern node -> type
pub type PatternTyping = HashMap<String, HashMap<NodeId, NodeId>>;

impl Hierarchy {
    /// Find all instances of `pattern` in `graph`.
    ///
    /// Instances are returned in a deterministic order driven by the node
    /// insertion order of both graphs. An empty result is not an error.
    pub fn find_matching(
        &self,
        graph: &str,
        pattern: &TypedGraph,
        pattern_typing: Option<&PatternTyping>,
    ) -> Result<Vec<Instance>> {
        let target = self.graph(graph)?;
        let order: Vec<&str> = pattern.nodes();
        let mut search = Search {
            hierarchy: self,
            graph,
            target,
            pattern,
            pattern_typing,
            order: &order,
            assignment: HashMap::new(),
            used: HashSet::new(),
            found: Vec::new(),
        };
        search.extend(0);
        Ok(search.found)
    }

    /// Re-check an instance against the current state of `graph`: its
    /// nodes still exist, pattern edges are still present, and the required
    /// types still hold. Used between rewrites of one phase, since an
    /// earlier rewrite may have consumed part of a later instance.
    pub fn validate_instance(
        &self,
        graph: &str,
        pattern: &TypedGraph,
        instance: &Instance,
        pattern_typing: Option<&PatternTyping>,
    ) -> bool {
        let Ok(target) = self.graph(graph) else {
            return false;
        };
        let image = |p: &str| instance.get(p).map(|s| s.as_str());

        for p in pattern.nodes() {
            match image(p) {
                Some(n) if target.contains_node(n) => {
                    if !self.has_required_types(graph, p, n, pattern_typing) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        pattern.edges().into_iter().all(|(a, b)| match (image(a), image(b)) {
            (Some(u), Some(v)) => target.has_edge(u, v),
            _ => false,
        })
    }

    fn has_required_types(
        &self,
        graph: &str,
        pattern_node: &str,
        node: &str,
        pattern_typing: Option<&PatternTyping>,
    ) -> bool {
        let Some(pattern_typing) = pattern_typing else {
            return true;
        };
        pattern_typing.iter().all(|(typing_graph, required)| match required.get(pattern_node) {
            Some(ty) => self.type_of(graph, node, typing_graph) == Some(ty.as_str()),
            None => true,
        })
    }
}

/// Backtracking state for one search
struct Search<'a> {
    hierarchy: &'a Hierarchy,
    graph: &'a str,
    target: &'a TypedGraph,
    pattern: &'a TypedGraph,
    pattern_typing: Option<&'a PatternTyping>,
    order: &'a [&'a str],
    assignment: HashMap<&'a str, &'a str>,
    used: HashSet<&'a str>,
    found: Vec<Instance>,
}

impl<'a> Search<'a> {
    fn extend(&mut self, depth: usize) {
        let Some(&p) = self.order.get(depth) else {
            self.found.push(
                self.assignment
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
            return;
        };

        for candidate in self.candidates(p) {
            if self.used.contains(candidate) || !self.fits(p, candidate) {
                continue;
            }
            self.assignment.insert(p, candidate);
            self.used.insert(candidate);
            self.extend(depth + 1);
            self.assignment.remove(p);
            self.used.remove(candidate);
        }
    }

    /// Candidate images for `p`, narrowed through an already assigned
    /// neighbour when there is one
    fn candidates(&self, p: &str) -> Vec<&'a str> {
        for q in self.pattern.predecessors(p) {
            if let Some(&image) = self.assignment.get(q) {
                return self.target.successors(image);
            }
        }
        for q in self.pattern.successors(p) {
            if let Some(&image) = self.assignment.get(q) {
                return self.target.predecessors(image);
            }
        }
        self.target.nodes()
    }

    fn fits(&self, p: &str, candidate: &str) -> bool {
        if !self
            .hierarchy
            .has_required_types(self.graph, p, candidate, self.pattern_typing)
        {
            return false;
        }
        if self.pattern.has_edge(p, p) && !self.target.has_edge(candidate, candidate) {
            return false;
        }
        self.assignment.iter().all(|(&q, &image)| {
            (!self.pattern.has_edge(p, q) || self.target.has_edge(candidate, image))
                && (!self.pattern.has_edge(q, p) || self.target.has_edge(image, candidate))
        })
    }
}
