//! Integration
//!
//! Loads a source schema with its annotation and a target annotation, builds
//! the hierarchy and runs the transformation phases.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::annotation::Annotation;
use crate::config::MappingConfig;
use crate::error::{MappingError, Result};
use crate::graph::{annotation_graph, meta_model, schema_graph};
use crate::hierarchy::{
    annotation_meta_typing, schema_annotation_typing, schema_meta_typing, Hierarchy, Typing, ANNOTATION, META,
    SCHEMA,
};
use crate::schema::FieldSchema;
use crate::transform::{Transformation, TransformationPlan};

/// Where the source schema comes from
#[derive(Debug, Clone)]
pub enum SourceFile {
    /// A field-schema JSON document
    Schema(PathBuf),
    /// Sample records; the schema is inferred
    Data(PathBuf),
}

/// Mapping run over one source and one target annotation
pub struct Integration {
    config: MappingConfig,
    hierarchy: Option<Hierarchy>,
    /// `S -> M`, added once the sink is gone
    annotation_meta: Typing,
    target: Option<Annotation>,
    transformation: Option<Transformation>,
    plan: Option<TransformationPlan>,
}

impl Integration {
    pub fn new(config: MappingConfig) -> Self {
        Self {
            config,
            hierarchy: None,
            annotation_meta: Typing::new(),
            target: None,
            transformation: None,
            plan: None,
        }
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// The hierarchy, once a source is loaded
    pub fn hierarchy(&self) -> Option<&Hierarchy> {
        self.hierarchy.as_ref()
    }

    /// Phase state of the last run
    pub fn transformation(&self) -> Option<&Transformation> {
        self.transformation.as_ref()
    }

    /// Build G, S and M with the typings `G -> S` and `G -> M`
    pub fn load_source(&mut self, schema: &FieldSchema, annotation: &Annotation) -> Result<()> {
        schema.validate()?;
        let (hierarchy, annotation_meta) = create_hierarchy(schema, annotation, &self.config)?;
        info!(
            fields = hierarchy.graph(SCHEMA)?.node_count(),
            annotations = hierarchy.graph(ANNOTATION)?.node_count(),
            "loaded source"
        );
        self.hierarchy = Some(hierarchy);
        self.annotation_meta = annotation_meta;
        self.reset();
        Ok(())
    }

    pub fn load_target_annotation(&mut self, annotation: Annotation) {
        self.target = Some(annotation);
        self.reset();
    }

    /// Load the source from files
    pub fn load_source_files(&mut self, source: &SourceFile, annotation: &Path) -> Result<()> {
        let schema = match source {
            SourceFile::Schema(path) => FieldSchema::from_json(&read_json(path)?)?,
            SourceFile::Data(path) => FieldSchema::infer(&read_json(path)?)?,
        };
        let annotation = Annotation::from_json(&read_json(annotation)?)?;
        self.load_source(&schema, &annotation)
    }

    pub fn load_target_file(&mut self, path: &Path) -> Result<()> {
        let annotation = Annotation::from_json(&read_json(path)?)?;
        self.load_target_annotation(annotation);
        Ok(())
    }

    /// Run all phases and return the plan. The plan is computed once; later
    /// calls return it again until new inputs are loaded.
    pub fn do_transformation(&mut self) -> Result<TransformationPlan> {
        if let Some(plan) = &self.plan {
            return Ok(plan.clone());
        }
        let hierarchy = self.hierarchy.as_mut().ok_or(MappingError::NotLoaded("source schema"))?;
        let target = self.target.as_ref().ok_or(MappingError::NotLoaded("target annotation"))?;

        let mut transformation = Transformation::new(self.config.clone());
        transformation.remove_irrelevant_nodes(hierarchy)?;

        add_annotation_meta_typing(hierarchy, &self.annotation_meta)?;

        transformation.remove_hierarchies(hierarchy)?;
        transformation.construct_target_hierarchies(hierarchy, target)?;
        transformation.add_flattening_operations(hierarchy)?;

        let plan = transformation.plan();
        info!(
            select = plan.normal_form_operations.len(),
            transform = plan.transform_operations.len(),
            "transformation complete"
        );
        self.transformation = Some(transformation);
        self.plan = Some(plan.clone());
        Ok(plan)
    }

    fn reset(&mut self) {
        self.transformation = None;
        self.plan = None;
    }
}

/// Build the hierarchy for one source. G and S are stored without their
/// attributes; the typings are derived from the attributed graphs first.
///
/// Returns the hierarchy with `G -> S` and `G -> M`, and the `S -> M`
/// typing to add with [`add_annotation_meta_typing`] after the sink has
/// been removed.
pub fn create_hierarchy(
    schema: &FieldSchema,
    annotation: &Annotation,
    config: &MappingConfig,
) -> Result<(Hierarchy, Typing)> {
    let g = schema_graph(schema, &config.graph)?;
    let s = annotation_graph(annotation, &config.graph)?;

    let g_s = schema_annotation_typing(&g, &s, &config.graph);
    let g_m = schema_meta_typing(&g);
    let s_m = annotation_meta_typing(&s, &config.graph);

    let mut hierarchy = Hierarchy::new();
    hierarchy.add_graph(SCHEMA, g.copy_stripping_attributes())?;
    hierarchy.add_graph(ANNOTATION, s.copy_stripping_attributes())?;
    hierarchy.add_graph(META, meta_model())?;
    hierarchy.add_typing(SCHEMA, ANNOTATION, g_s, false)?;
    hierarchy.add_typing(SCHEMA, META, g_m, false)?;
    Ok((hierarchy, s_m))
}

/// Add `S -> M`, restricted to the annotation nodes still present
pub fn add_annotation_meta_typing(hierarchy: &mut Hierarchy, typing: &Typing) -> Result<()> {
    let s = hierarchy.graph(ANNOTATION)?;
    let surviving: Typing = typing
        .iter()
        .filter(|(node, _)| s.contains_node(node))
        .map(|(node, ty)| (node.clone(), ty.clone()))
        .collect();
    hierarchy.add_typing(ANNOTATION, META, surviving, false)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    fn schema() -> FieldSchema {
        FieldSchema::new(vec![Field::structure(
            "a",
            vec![Field::leaf("b", "bigint"), Field::leaf("c", "bigint")],
        )])
    }

    #[test]
    fn test_create_hierarchy_typings() {
        let annotation = Annotation::from_json(&json!({"x": {"y": "root.a.b"}})).unwrap();
        let (h, s_m) = create_hierarchy(&schema(), &annotation, &MappingConfig::default()).unwrap();
        h.check().unwrap();
        assert_eq!(s_m["root.x.DICT"], "STRUCT");
        assert!(!s_m.contains_key("DELETE"));
        assert_eq!(h.type_of(SCHEMA, "root.a", META), Some("STRUCT"));
        assert_eq!(h.type_of(SCHEMA, "root.a.b", ANNOTATION), Some("root.a.b"));
        // the schema nesting is mirrored through the sink
        assert!(h.graph(ANNOTATION).unwrap().has_edge("DELETE", "root.a.b"));
        assert!(h.graph(SCHEMA).unwrap().attrs("root.a").unwrap().kind.is_none());
    }

    #[test]
    fn test_not_loaded() {
        let mut integration = Integration::new(MappingConfig::default());
        assert!(matches!(
            integration.do_transformation(),
            Err(MappingError::NotLoaded("source schema"))
        ));

        let annotation = Annotation::from_json(&json!({"x": {"y": "root.a.b"}})).unwrap();
        integration.load_source(&schema(), &annotation).unwrap();
        assert!(matches!(
            integration.do_transformation(),
            Err(MappingError::NotLoaded("target annotation"))
        ));
    }

    #[test]
    fn test_plan_is_cached() {
        let mut integration = Integration::new(MappingConfig::default());
        let annotation = Annotation::from_json(&json!({"x": {"y": "root.a.b"}})).unwrap();
        integration.load_source(&schema(), &annotation).unwrap();
        integration.load_target_annotation(annotation);

        let first = integration.do_transformation().unwrap();
        let second = integration.do_transformation().unwrap();
        assert_eq!(first, second);
        assert!(integration.transformation().is_some());
    }
}
