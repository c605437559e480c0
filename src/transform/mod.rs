//! Transformation Phases
//!
//! Drives the rewrite phases over a hierarchy and collects the resulting
//! operations:
//!
//! 1. `remove_irrelevant_nodes`: drop the sink, and with it every schema
//!    node the annotation does not keep.
//! 2. `remove_hierarchies`: strip STRUCT and ARRAY from the meta-model and
//!    attach every remaining field directly to the root.
//! 3. `construct_target_hierarchies`: restore STRUCT and rebuild the target
//!    nesting step by step.
//! 4. `add_flattening_operations`: record the normal form, one
//!    `selectField` per FIELD-typed schema node.
//!
//! A rewrite that fails at one instance is logged and skipped; the phase
//! carries on with the next instance.

pub mod operation;
pub mod planner;

pub use operation::TransformOperation;
pub use planner::{transformation_steps, Member, PlannedStep};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::annotation::Annotation;
use crate::config::MappingConfig;
use crate::error::{MappingError, Result};
use crate::graph::{MetaNode, NodeAttrs, TypedGraph};
use crate::hierarchy::{Hierarchy, Instance, PatternTyping, META, SCHEMA, ANNOTATION};
use crate::rule::{RhsTyping, Rule};

/// Entry of the executed-rule log
#[derive(Debug, Clone, Serialize)]
pub struct RuleRecord {
    pub graph: String,
    pub rule: String,
    /// Instances the rule was applied to
    pub applied: usize,
}

/// Operations produced by a complete run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationPlan {
    pub normal_form_operations: Vec<TransformOperation>,
    pub transform_operations: Vec<TransformOperation>,
}

/// State threaded through the phases of one run
#[derive(Debug, Clone)]
pub struct Transformation {
    config: MappingConfig,
    transform_operations: Vec<TransformOperation>,
    normal_form_operations: Vec<TransformOperation>,
    executed_rules: Vec<RuleRecord>,
}

impl Transformation {
    pub fn new(config: MappingConfig) -> Self {
        Self {
            config,
            transform_operations: Vec::new(),
            normal_form_operations: Vec::new(),
            executed_rules: Vec::new(),
        }
    }

    pub fn transform_operations(&self) -> &[TransformOperation] {
        &self.transform_operations
    }

    pub fn normal_form_operations(&self) -> &[TransformOperation] {
        &self.normal_form_operations
    }

    pub fn executed_rules(&self) -> &[RuleRecord] {
        &self.executed_rules
    }

    pub fn plan(&self) -> TransformationPlan {
        TransformationPlan {
            normal_form_operations: self.normal_form_operations.clone(),
            transform_operations: self.transform_operations.clone(),
        }
    }

    // =========================================================================
    // Phases
    // =========================================================================

    /// Remove the sink from S. Everything typed by it goes too.
    pub fn remove_irrelevant_nodes(&mut self, h: &mut Hierarchy) -> Result<usize> {
        let sink = self.config.graph.sink.clone();
        let mut pattern = TypedGraph::new();
        pattern.add_node(sink.as_str(), NodeAttrs::default())?;
        pattern.add_edge(&sink, &sink)?;
        let rule = Rule::from_pattern(pattern).remove_node(sink.as_str());

        let applied = self.apply_rule(h, ANNOTATION, &rule, None, &RhsTyping::new(), false, is_identity)?;
        info!(applied, "removed irrelevant nodes");
        Ok(applied)
    }

    /// Collapse M to ROOT and FIELD, then hang every FIELD-typed schema
    /// node directly off the root. Running it on a flat hierarchy applies
    /// nothing.
    pub fn remove_hierarchies(&mut self, h: &mut Hierarchy) -> Result<usize> {
        let (root, structure, array, field) = (
            MetaNode::Root.as_str(),
            MetaNode::Struct.as_str(),
            MetaNode::Array.as_str(),
            MetaNode::Field.as_str(),
        );

        let mut nesting = TypedGraph::new();
        nesting.add_node(structure, NodeAttrs::default())?;
        nesting.add_node(array, NodeAttrs::default())?;
        nesting.add_edge(structure, structure)?;
        nesting.add_edge(structure, array)?;
        nesting.add_edge(array, structure)?;
        let strip = Rule::from_pattern(nesting).remove_node(structure).remove_node(array);
        let stripped = self.apply_rule(h, META, &strip, None, &RhsTyping::new(), false, is_identity)?;

        let mut pair = TypedGraph::new();
        pair.add_node(root, NodeAttrs::default())?;
        pair.add_node(field, NodeAttrs::default())?;
        let typing = PatternTyping::from([(
            META.to_string(),
            HashMap::from([(root.to_string(), root.to_string()), (field.to_string(), field.to_string())]),
        )]);
        let attach = Rule::from_pattern(pair).add_edge(root, field);
        let attached = self.apply_rule(h, SCHEMA, &attach, Some(&typing), &RhsTyping::new(), false, accept_all)?;

        info!(stripped, attached, "removed hierarchies");
        Ok(stripped + attached)
    }

    /// Restore STRUCT in M, then apply the planned steps of the target
    /// annotation innermost first, emitting operations for each step that
    /// found an instance
    pub fn construct_target_hierarchies(&mut self, h: &mut Hierarchy, target: &Annotation) -> Result<()> {
        let (root, structure) = (MetaNode::Root.as_str(), MetaNode::Struct.as_str());
        if !h.graph(META)?.contains_node(structure) {
            let mut pattern = TypedGraph::new();
            pattern.add_node(root, NodeAttrs::default())?;
            let restore = Rule::from_pattern(pattern)
                .add_node(structure)
                .add_edge(structure, structure)
                .add_edge(root, structure);
            self.apply_rule(h, META, &restore, None, &RhsTyping::new(), false, is_identity)?;
        }

        let steps = transformation_steps(target, &self.config.graph);
        info!(steps = steps.len(), "constructing target hierarchies");
        for step in &steps {
            match self.add_hierarchy(h, step) {
                Ok(instances) => {
                    for rhs_instance in instances {
                        self.transform_operations.extend(step.operations(&rhs_instance));
                    }
                }
                Err(MappingError::NoValidInstance { step: name }) => {
                    warn!(step = %name, "no valid instance, skipping step");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Apply one planned step. Returns the right-hand instance of every
    /// successful rewrite, or `NoValidInstance` when there is none.
    pub fn add_hierarchy(&mut self, h: &mut Hierarchy, step: &PlannedStep) -> Result<Vec<Instance>> {
        let root = self.config.graph.root.clone();
        if let Some(name) = step.conflict(&root) {
            warn!(step = %step.name, name = %name, "step reuses a reserved or sibling name");
            return Err(MappingError::NoValidInstance { step: step.name.clone() });
        }

        let rule = step.rule(&root);
        let pattern_typing = step.pattern_typing(&root);
        let rhs_typing = step.rhs_typing(&root);
        let strict = self.config.rewrite.strict;

        let instances = h.find_matching(SCHEMA, rule.lhs(), Some(&pattern_typing))?;
        let mut applied = Vec::new();
        for instance in instances {
            if !h.validate_instance(SCHEMA, rule.lhs(), &instance, Some(&pattern_typing)) {
                debug!(step = %step.name, "instance no longer valid");
                continue;
            }
            match h.rewrite(SCHEMA, &rule, &instance, &rhs_typing, strict) {
                Ok(rhs_instance) => applied.push(rhs_instance),
                Err(e) => debug!(step = %step.name, error = %e, "rewrite rejected"),
            }
        }
        self.record(SCHEMA, &rule, applied.len());

        if applied.is_empty() {
            return Err(MappingError::NoValidInstance { step: step.name.clone() });
        }
        debug!(step = %step.name, kind = step.kind.as_str(), instances = applied.len(), "added hierarchy");
        Ok(applied)
    }

    /// Record one `selectField` per schema node typed FIELD
    pub fn add_flattening_operations(&mut self, h: &Hierarchy) -> Result<()> {
        let field = MetaNode::Field.as_str();
        let mut pattern = TypedGraph::new();
        pattern.add_node(field, NodeAttrs::default())?;
        let typing = PatternTyping::from([(
            META.to_string(),
            HashMap::from([(field.to_string(), field.to_string())]),
        )]);

        let before = self.normal_form_operations.len();
        for instance in h.find_matching(SCHEMA, &pattern, Some(&typing))? {
            if let Some(node) = instance.get(field) {
                self.normal_form_operations.push(TransformOperation::select(node.as_str()));
            }
        }
        info!(fields = self.normal_form_operations.len() - before, "normal form");
        Ok(())
    }

    // =========================================================================
    // Rule driver
    // =========================================================================

    /// Apply `rule` at every instance that passes `accept`, skipping the
    /// ones whose rewrite fails
    #[allow(clippy::too_many_arguments)]
    fn apply_rule(
        &mut self,
        h: &mut Hierarchy,
        graph: &str,
        rule: &Rule,
        pattern_typing: Option<&PatternTyping>,
        rhs_typing: &RhsTyping,
        strict: bool,
        accept: fn(&Instance) -> bool,
    ) -> Result<usize> {
        let instances = h.find_matching(graph, rule.lhs(), pattern_typing)?;
        let mut applied = 0;
        for instance in instances.iter().filter(|i| accept(i)) {
            if !h.validate_instance(graph, rule.lhs(), instance, pattern_typing) {
                continue;
            }
            match h.rewrite(graph, rule, instance, rhs_typing, strict) {
                Ok(_) => applied += 1,
                Err(e) => debug!(graph, rule = %rule, error = %e, "skipping instance"),
            }
        }
        self.record(graph, rule, applied);
        Ok(applied)
    }

    fn record(&mut self, graph: &str, rule: &Rule, applied: usize) {
        self.executed_rules.push(RuleRecord {
            graph: graph.to_string(),
            rule: rule.to_string(),
            applied,
        });
    }
}

/// Pattern nodes name the exact nodes they must match
fn is_identity(instance: &Instance) -> bool {
    instance.iter().all(|(p, n)| p == n)
}

fn accept_all(_: &Instance) -> bool {
    true
}
