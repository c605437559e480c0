//! Transformation Planner
//!
//! Turns the target annotation into an ordered list of regrouping steps.
//! Each step names a structure from the target tree and the fields it
//! gathers; its rewrite rule moves those fields from the root into a new
//! structural node.

use std::collections::HashMap;

use crate::annotation::{Annotation, StructureKind};
use crate::config::GraphConfig;
use crate::graph::loader::{DICT_SUFFIX, LIST_SUFFIX};
use crate::graph::{MetaNode, NodeAttrs, NodeId, TypedGraph};
use crate::hierarchy::{Instance, PatternTyping, ANNOTATION, META};
use crate::rule::{RhsTyping, Rule};

use super::operation::TransformOperation;

/// A structure to build: its name, the members it gathers, and whether it
/// is a record or a list of records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub name: String,
    /// Annotation node typing the structure once built. Derived from the
    /// key path, so equal keys under different parents stay apart.
    pub annotation_type: String,
    pub members: Vec<Member>,
    pub kind: StructureKind,
}

/// One key gathered by a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub key: String,
    /// Annotation node the member must already be typed by
    pub annotation_type: String,
    /// Built by an earlier step rather than selected from the source
    pub nested: bool,
}

/// Planned steps in application order (innermost structures first)
pub fn transformation_steps(target: &Annotation, config: &GraphConfig) -> Vec<PlannedStep> {
    let mut steps = Vec::new();
    collect_steps(target, &config.root, config, &mut steps);
    steps.reverse();
    steps
}

/// Pre-order walk: every structural child of a level is recorded before
/// descending into any of them
fn collect_steps(annotation: &Annotation, parent: &str, config: &GraphConfig, steps: &mut Vec<PlannedStep>) {
    for (key, value) in annotation.entries() {
        if let Some(kind) = value.structure() {
            let path = config.join(parent, key);
            steps.push(PlannedStep {
                name: key.clone(),
                annotation_type: structure_type(&path, kind, config),
                members: step_members(value, &path, config),
                kind,
            });
        }
    }
    for (key, value) in annotation.entries() {
        if value.structure().is_some() {
            collect_steps(value, &config.join(parent, key), config, steps);
        }
    }
}

fn structure_type(path: &str, kind: StructureKind, config: &GraphConfig) -> String {
    let suffix = match kind {
        StructureKind::Dict => DICT_SUFFIX,
        StructureKind::List => LIST_SUFFIX,
    };
    config.join(path, suffix)
}

/// Members of the structure at `path`. A leaf is typed by its annotation
/// value, a nested structure by the type its own step gives it.
pub fn step_members(value: &Annotation, path: &str, config: &GraphConfig) -> Vec<Member> {
    value
        .entries()
        .iter()
        .map(|(key, child)| match child.structure() {
            Some(kind) => Member {
                key: key.clone(),
                annotation_type: structure_type(&config.join(path, key), kind, config),
                nested: true,
            },
            None => Member {
                key: key.clone(),
                annotation_type: child.as_scalar().unwrap_or_default().to_string(),
                nested: false,
            },
        })
        .collect()
}

impl PlannedStep {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.key.as_str())
    }

    /// Name clash that would make the rule ambiguous, if any
    pub fn conflict(&self, root: &str) -> Option<String> {
        if self.name == root {
            return Some(root.to_string());
        }
        self.keys().find(|k| *k == root || *k == self.name).map(str::to_string)
    }

    /// The root plus one node per key, with root -> key edges
    pub fn pattern(&self, root: &str) -> TypedGraph {
        let mut pattern = TypedGraph::new();
        pattern.ensure_node(root, NodeAttrs::default());
        for key in self.keys() {
            pattern.ensure_node(key, NodeAttrs::default());
            // Both endpoints were inserted above.
            let _ = pattern.ensure_edge(root, key);
        }
        pattern
    }

    /// Every key must already carry the annotation type the step expects
    pub fn pattern_typing(&self, root: &str) -> PatternTyping {
        let mut expected: HashMap<NodeId, NodeId> = self
            .members
            .iter()
            .map(|m| (m.key.clone(), m.annotation_type.clone()))
            .collect();
        expected.insert(root.to_string(), root.to_string());
        PatternTyping::from([(ANNOTATION.to_string(), expected)])
    }

    pub fn rule(&self, root: &str) -> Rule {
        let mut rule = Rule::from_pattern(self.pattern(root))
            .add_node(self.name.as_str())
            .add_edge(root, self.name.as_str());
        for key in self.keys() {
            rule = rule.remove_edge(root, key).add_edge(self.name.as_str(), key);
        }
        rule
    }

    /// Types of the rule nodes in S and M. The new node is a STRUCT in M,
    /// for records and lists alike.
    pub fn rhs_typing(&self, root: &str) -> RhsTyping {
        let mut s: HashMap<NodeId, NodeId> = HashMap::new();
        let mut m: HashMap<NodeId, NodeId> = HashMap::new();
        s.insert(root.to_string(), root.to_string());
        for member in &self.members {
            s.insert(member.key.clone(), member.annotation_type.clone());
            let meta = if member.nested { MetaNode::Struct } else { MetaNode::Field };
            m.insert(member.key.clone(), meta.as_str().to_string());
        }
        s.insert(self.name.clone(), self.annotation_type.clone());
        m.insert(self.name.clone(), MetaNode::Struct.as_str().to_string());
        RhsTyping::from([(ANNOTATION.to_string(), s), (META.to_string(), m)])
    }

    /// Operations for one applied instance: a rename per moved field whose
    /// name differs from its key, then the grouping itself
    pub fn operations(&self, rhs_instance: &Instance) -> Vec<TransformOperation> {
        let mut ops = Vec::new();
        let mut connect = Vec::new();
        for key in self.keys() {
            if let Some(field) = rhs_instance.get(key) {
                if field != key {
                    ops.push(TransformOperation::rename(field.as_str(), key));
                }
            }
            connect.push(key.to_string());
        }
        let field = rhs_instance
            .get(&self.name)
            .cloned()
            .unwrap_or_else(|| self.name.clone());
        ops.push(match self.kind {
            StructureKind::Dict => TransformOperation::AddHierarchy { field, connect },
            StructureKind::List => TransformOperation::NestList { field, connect },
        });
        ops
    }
}
