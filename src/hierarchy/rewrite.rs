//! Rule Application
//!
//! Applies a rule at one instance of its pattern. The rewrite runs on a
//! working copy of the hierarchy and replaces it only on success, so a
//! failed edit leaves every graph and typing untouched.

use tracing::debug;

use crate::error::{MappingError, Result};
use crate::graph::{NodeAttrs, NodeId};
use crate::rule::{Edit, Rule, RhsTyping};

use super::{Hierarchy, Instance};

impl Hierarchy {
    /// Rewrite `graph` with `rule` at `instance`.
    ///
    /// Removals propagate down to every graph typed by `graph`. Each node
    /// the rule adds needs a type in every graph `graph` is typed by, taken
    /// from `rhs_typing`. In non-strict mode missing type nodes and image
    /// edges are created in the graphs above; in strict mode they are a
    /// typing inconsistency.
    ///
    /// Returns the right-hand instance: rule node -> graph node.
    pub fn rewrite(
        &mut self,
        graph: &str,
        rule: &Rule,
        instance: &Instance,
        rhs_typing: &RhsTyping,
        strict: bool,
    ) -> Result<Instance> {
        let mut work = self.clone();
        let rhs_instance = work.apply(graph, rule, instance, rhs_typing, strict)?;
        *self = work;
        Ok(rhs_instance)
    }

    fn apply(
        &mut self,
        graph: &str,
        rule: &Rule,
        instance: &Instance,
        rhs_typing: &RhsTyping,
        strict: bool,
    ) -> Result<Instance> {
        for p in rule.lhs().nodes() {
            match instance.get(p) {
                Some(n) if self.graph(graph)?.contains_node(n) => {}
                Some(n) => return Err(MappingError::unknown_node(graph, n.as_str())),
                None => {
                    return Err(MappingError::Graph(format!(
                        "instance does not map pattern node '{}'",
                        p
                    )))
                }
            }
        }
        self.check_preserved_types(graph, instance, rhs_typing)?;

        let mut rhs_instance: Instance = instance.clone();
        for edit in rule.ordered_edits() {
            match edit {
                Edit::RemoveEdge(a, b) => {
                    let (u, v) = (resolve(&rhs_instance, a)?, resolve(&rhs_instance, b)?);
                    self.remove_edge_propagating(graph, &u, &v)?;
                }
                Edit::RemoveNode(a) => {
                    let n = resolve(&rhs_instance, a)?;
                    self.remove_node_propagating(graph, &n)?;
                    rhs_instance.remove(a);
                }
                Edit::AddNode(a) => {
                    let id = self.add_typed_node(graph, a, rhs_typing, strict)?;
                    rhs_instance.insert(a.clone(), id);
                }
                Edit::AddEdge(a, b) => {
                    let (u, v) = (resolve(&rhs_instance, a)?, resolve(&rhs_instance, b)?);
                    self.graph_mut(graph)?.add_edge(&u, &v)?;
                    self.propagate_edge_up(graph, &u, &v, strict)?;
                }
            }
        }
        Ok(rhs_instance)
    }

    /// A type given for a preserved node must agree with its current type
    fn check_preserved_types(&self, graph: &str, instance: &Instance, rhs_typing: &RhsTyping) -> Result<()> {
        for (typing_graph, types) in rhs_typing {
            for (p, n) in instance {
                let Some(expected) = types.get(p) else {
                    continue;
                };
                let actual = self.type_of(graph, n, typing_graph);
                if actual != Some(expected.as_str()) {
                    return Err(MappingError::typing(
                        graph,
                        format!(
                            "'{}' is typed {:?} in {}, rule expects '{}'",
                            n, actual, typing_graph, expected
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Insert a rule node into `graph` and type it in every graph above.
    /// Returns the identifier actually used.
    fn add_typed_node(&mut self, graph: &str, node: &str, rhs_typing: &RhsTyping, strict: bool) -> Result<NodeId> {
        let id = fresh_id(self, graph, node)?;
        self.graph_mut(graph)?.add_node(id.as_str(), NodeAttrs::default())?;
        self.type_new_node(graph, &id, node, rhs_typing, strict)?;
        debug!(graph, node = %id, "added node");
        Ok(id)
    }

    /// Assign types to a node created on behalf of rule node `rule_node`,
    /// creating the type nodes themselves when allowed
    fn type_new_node(
        &mut self,
        graph: &str,
        id: &str,
        rule_node: &str,
        rhs_typing: &RhsTyping,
        strict: bool,
    ) -> Result<()> {
        for target in self.targets_of(graph) {
            let ty = rhs_typing
                .get(&target)
                .and_then(|types| types.get(rule_node))
                .ok_or_else(|| {
                    MappingError::typing(graph, format!("new node '{}' has no type in {}", rule_node, target))
                })?
                .clone();

            if !self.graph(&target)?.contains_node(&ty) {
                if strict {
                    return Err(MappingError::typing(
                        graph,
                        format!("type '{}' does not exist in {}", ty, target),
                    ));
                }
                self.graph_mut(&target)?.add_node(ty.as_str(), NodeAttrs::default())?;
                self.type_new_node(&target, &ty, rule_node, rhs_typing, strict)?;
                debug!(graph = %target, node = %ty, "propagated node");
            }
            self.set_type(graph, &target, id, &ty);
        }
        Ok(())
    }
}

fn resolve(rhs_instance: &Instance, node: &str) -> Result<NodeId> {
    rhs_instance
        .get(node)
        .cloned()
        .ok_or_else(|| MappingError::Graph(format!("rule node '{}' is not bound", node)))
}

/// `name`, or `name_1`, `name_2`... when taken
fn fresh_id(h: &Hierarchy, graph: &str, name: &str) -> Result<NodeId> {
    let g = h.graph(graph)?;
    if !g.contains_node(name) {
        return Ok(name.to_string());
    }
    let mut i = 1;
    loop {
        let candidate = format!("{}_{}", name, i);
        if !g.contains_node(&candidate) {
            return Ok(candidate);
        }
        i += 1;
    }
}
