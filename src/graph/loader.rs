//! Graph Builders
//!
//! Builds the schema graph G from a nested field schema and the annotation
//! graph S from an annotation document.

use crate::annotation::{Annotation, StructureKind};
use crate::config::GraphConfig;
use crate::error::{MappingError, Result};
use crate::schema::{Field, FieldKind, FieldSchema};

use super::{NodeAttrs, NodeKind, TypedGraph};

/// Suffix of annotation nodes created for nested mappings
pub const DICT_SUFFIX: &str = "DICT";
/// Suffix of annotation nodes created for sequences
pub const LIST_SUFFIX: &str = "LIST";

// =============================================================================
// Schema Graph
// =============================================================================

/// Build the schema graph: one node per field, identified by its dotted
/// path, with an edge from the parent path to the child path.
pub fn schema_graph(schema: &FieldSchema, config: &GraphConfig) -> Result<TypedGraph> {
    let mut g = TypedGraph::new();
    g.add_node(
        config.root.as_str(),
        NodeAttrs::of_kind(NodeKind::Root).with_key(config.root.as_str()),
    )?;
    add_fields(&mut g, &schema.fields, &config.root, config)?;
    Ok(g)
}

fn add_fields(g: &mut TypedGraph, fields: &[Field], parent: &str, config: &GraphConfig) -> Result<()> {
    for field in fields {
        let path = config.join(parent, &field.name);
        let kind = match field.kind() {
            FieldKind::Struct => NodeKind::Struct,
            FieldKind::Array => NodeKind::Array,
            FieldKind::Field => NodeKind::Field,
        };
        let attrs = NodeAttrs {
            kind: Some(kind),
            key_name: Some(field.name.clone()),
            data_type: Some(field.type_name.clone()),
            nullable: Some(field.nullable),
            metadata: field.metadata.clone(),
            annotation_id: None,
        };
        if !g.ensure_node(path.as_str(), attrs) {
            return Err(MappingError::Structural(format!("schema path '{}' defined twice", path)));
        }
        g.add_edge(parent, &path)?;
        add_fields(g, field.children(), &path, config)?;
    }
    Ok(())
}

// =============================================================================
// Annotation Graph
// =============================================================================

/// Build the annotation graph.
///
/// Nested mappings and sequences become `DICT`/`LIST` nodes with an extra
/// edge into the sink; scalars become leaf nodes identified by their value.
/// The sink has an inbound edge from the root and a self-loop.
pub fn annotation_graph(annotation: &Annotation, config: &GraphConfig) -> Result<TypedGraph> {
    let root = config.root.as_str();
    let sink = config.sink.as_str();

    let mut s = TypedGraph::new();
    s.add_node(root, NodeAttrs::of_kind(NodeKind::Root).with_key(root))?;
    s.add_node(sink, NodeAttrs::default())?;
    s.add_edge(root, sink)?;
    s.add_edge(sink, sink)?;

    add_entries(&mut s, annotation.entries(), root, root, config)?;
    Ok(s)
}

fn add_entries(
    s: &mut TypedGraph,
    entries: &[(String, Annotation)],
    parent_id: &str,
    parent: &str,
    config: &GraphConfig,
) -> Result<()> {
    for (key, value) in entries {
        let id = config.join(parent_id, key);
        match value.structure() {
            Some(structure) => {
                let (suffix, kind) = match structure {
                    StructureKind::Dict => (DICT_SUFFIX, NodeKind::Struct),
                    StructureKind::List => (LIST_SUFFIX, NodeKind::Array),
                };
                let name = config.join(&id, suffix);
                let attrs = NodeAttrs {
                    annotation_id: Some(id.clone()),
                    ..NodeAttrs::of_kind(kind).with_key(key.as_str())
                };
                s.ensure_node(name.as_str(), attrs);
                s.ensure_edge(parent, &name)?;
                s.ensure_edge(&name, &config.sink)?;
                add_entries(s, value.entries(), &id, &name, config)?;
            }
            None => {
                let leaf = value.as_scalar().unwrap_or_default();
                if leaf == config.root || leaf == config.sink {
                    return Err(MappingError::Structural(format!(
                        "annotation '{}' uses reserved identifier '{}'",
                        id, leaf
                    )));
                }
                let attrs = NodeAttrs {
                    annotation_id: Some(id.clone()),
                    ..NodeAttrs::of_kind(NodeKind::Field).with_key(key.as_str())
                };
                s.ensure_node(leaf, attrs);
                s.ensure_edge(parent, leaf)?;
            }
        }
    }
    Ok(())
}
