//! End-to-end Mapping Tests
//!
//! Runs the full pipeline on fixture schemas and annotations, checks the
//! emitted plans, and replays them on sample rows to confirm the output has
//! the target nesting.

use serde_json::{json, Map, Value};

use sda_mapping::config::MappingConfig;
use sda_mapping::hierarchy::{ANNOTATION, META, SCHEMA};
use sda_mapping::integration::{add_annotation_meta_typing, create_hierarchy};
use sda_mapping::{
    Annotation, FieldSchema, Integration, SourceFile, TransformOperation, Transformation, TransformationPlan,
};

fn fixture(content: &str) -> Value {
    serde_json::from_str(content).unwrap()
}

fn annotation(content: &str) -> Annotation {
    Annotation::from_json(&fixture(content)).unwrap()
}

fn nested_schema() -> FieldSchema {
    FieldSchema::from_json(&fixture(include_str!("fixtures/nested_schema.json"))).unwrap()
}

fn plan_for(schema: &FieldSchema, source: Annotation, target: Annotation) -> TransformationPlan {
    let mut integration = Integration::new(MappingConfig::default());
    integration.load_source(schema, &source).unwrap();
    integration.load_target_annotation(target);
    integration.do_transformation().unwrap()
}

fn selected(plan: &TransformationPlan) -> Vec<&str> {
    plan.normal_form_operations.iter().map(|op| op.field()).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Row executor
// =============================================================================

/// Apply a plan to nested source records: project the selected paths into
/// flat rows, then run the transform operations in order
fn execute(plan: &TransformationPlan, records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            let mut row = Map::new();
            for op in &plan.normal_form_operations {
                row.insert(op.field().to_string(), lookup(record, op.field()));
            }
            for op in &plan.transform_operations {
                apply(&mut row, op);
            }
            Value::Object(row)
        })
        .collect()
}

fn lookup(record: &Value, path: &str) -> Value {
    let mut current = record;
    for key in path.split('.').skip(1) {
        match current.get(key) {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

fn apply(row: &mut Map<String, Value>, op: &TransformOperation) {
    match op {
        TransformOperation::SelectField { .. } => {}
        TransformOperation::RenameNode { field, rename } => {
            if let Some(value) = row.remove(field) {
                row.insert(rename.clone(), value);
            }
        }
        TransformOperation::AddHierarchy { field, connect } => {
            let mut nested = Map::new();
            for member in connect {
                if let Some(value) = row.remove(member) {
                    nested.insert(member.clone(), value);
                }
            }
            row.insert(field.clone(), Value::Object(nested));
        }
        TransformOperation::NestList { field, connect } => {
            let mut element = Map::new();
            for (member, name) in connect.iter().zip(op.flatten_connect(".")) {
                if let Some(value) = row.remove(member) {
                    element.insert(name, value);
                }
            }
            row.insert(field.clone(), Value::Array(vec![Value::Object(element)]));
        }
    }
}

/// Every structural key of the target, and every key nested inside one,
/// must appear at the same depth of the output
fn assert_shape(target: &Annotation, value: &Value, top_level: bool, path: &str) {
    match target {
        Annotation::Mapping(entries) => {
            let object = value
                .as_object()
                .unwrap_or_else(|| panic!("Expected object at {}, got {}", path, value));
            for (key, child) in entries {
                if top_level && child.as_scalar().is_some() {
                    continue;
                }
                let nested = object
                    .get(key)
                    .unwrap_or_else(|| panic!("Missing '{}' at {}: {}", key, path, value));
                assert_shape(child, nested, false, &format!("{}.{}", path, key));
            }
        }
        Annotation::Sequence(first) => match value {
            Value::Array(items) if !items.is_empty() => assert_shape(first, &items[0], false, path),
            other => panic!("Expected non-empty list at {}, got {}", path, other),
        },
        Annotation::Scalar(_) => {}
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_dict_target_same_shape() {
    let plan = plan_for(
        &nested_schema(),
        annotation(include_str!("fixtures/source_annotation.json")),
        annotation(include_str!("fixtures/target_dict.json")),
    );

    assert_eq!(selected(&plan), vec!["root.a.b", "root.a.c"]);
    assert_eq!(
        plan.transform_operations,
        vec![
            TransformOperation::rename("root.a.b", "y"),
            TransformOperation::rename("root.a.c", "z"),
            TransformOperation::AddHierarchy {
                field: "x".to_string(),
                connect: strings(&["y", "z"]),
            },
        ]
    );
}

#[test]
fn test_list_target_nests_records() {
    let plan = plan_for(
        &nested_schema(),
        annotation(include_str!("fixtures/source_annotation.json")),
        annotation(include_str!("fixtures/target_list.json")),
    );

    match plan.transform_operations.last() {
        Some(TransformOperation::NestList { field, connect }) => {
            assert_eq!(field, "items");
            assert_eq!(connect, &strings(&["y", "z"]));
        }
        other => panic!("Expected NestList, got {:?}", other),
    }

    let rows = execute(&plan, &[json!({"a": {"b": 1, "c": 2}})]);
    assert_eq!(rows, vec![json!({"items": [{"y": 1, "z": 2}]})]);
}

#[test]
fn test_unknown_schema_path_is_skipped() {
    let source = Annotation::from_json(&json!({
        "x": {"y": "root.a.b", "q": "root.missing"},
        "z": "root.a.c"
    }))
    .unwrap();
    let target = Annotation::from_json(&json!({
        "x": {"y": "root.a.b", "q": "root.missing"},
        "w": {"z": "root.a.c"}
    }))
    .unwrap();

    let plan = plan_for(&nested_schema(), source, target);
    assert_eq!(selected(&plan), vec!["root.a.b", "root.a.c"]);
    assert_eq!(
        plan.transform_operations,
        vec![
            TransformOperation::rename("root.a.c", "z"),
            TransformOperation::AddHierarchy {
                field: "w".to_string(),
                connect: strings(&["z"]),
            },
        ]
    );
}

#[test]
fn test_nested_target_builds_inner_first() {
    let schema = FieldSchema::infer(&json!({"a": {"b": 1, "c": 2}, "d": "x"})).unwrap();
    let source = Annotation::from_json(&json!({
        "x": {"y": "root.a.b"},
        "z": "root.a.c",
        "d": "root.d"
    }))
    .unwrap();
    let target_json = json!({
        "outer": {"y": "root.a.b", "inner": {"z": "root.a.c"}},
        "d": "root.d"
    });
    let target = Annotation::from_json(&target_json).unwrap();

    let plan = plan_for(&schema, source, target.clone());
    assert_eq!(selected(&plan), vec!["root.a.b", "root.a.c", "root.d"]);
    assert_eq!(
        plan.transform_operations,
        vec![
            TransformOperation::rename("root.a.c", "z"),
            TransformOperation::AddHierarchy {
                field: "inner".to_string(),
                connect: strings(&["z"]),
            },
            TransformOperation::rename("root.a.b", "y"),
            TransformOperation::AddHierarchy {
                field: "outer".to_string(),
                connect: strings(&["y", "inner"]),
            },
        ]
    );

    let rows = execute(&plan, &[json!({"a": {"b": 1, "c": 2}, "d": "x"})]);
    assert_shape(&target, &rows[0], true, "root");
    assert_eq!(rows[0]["outer"]["inner"]["z"], json!(2));
}

#[test]
fn test_order_plan_replays_to_target_shape() {
    let schema = FieldSchema::from_json(&fixture(include_str!("fixtures/order_schema.json"))).unwrap();
    let plan = plan_for(
        &schema,
        annotation(include_str!("fixtures/order_source_annotation.json")),
        annotation(include_str!("fixtures/order_target_annotation.json")),
    );

    // internal_id is not annotated in the source
    assert_eq!(
        selected(&plan),
        vec![
            "root.customer.name",
            "root.customer.email",
            "root.customer.address.city",
            "root.customer.address.zip",
            "root.total",
        ]
    );
    let actions: Vec<&str> = plan.transform_operations.iter().map(|op| op.action()).collect();
    assert_eq!(
        actions,
        vec![
            "renameNode",
            "renameNode",
            "addHierarchy",
            "renameNode",
            "nestList",
            "renameNode",
            "addHierarchy",
        ]
    );
    assert!(plan.transform_operations.iter().all(|op| op.field() != "audit"));

    let records: Vec<Value> = match fixture(include_str!("fixtures/order_data.json")) {
        Value::Array(records) => records,
        other => panic!("Expected records, got {}", other),
    };
    let rows = execute(&plan, &records);
    assert_eq!(rows.len(), 2);

    // the audit block cannot be built, so compare against the rest
    let mut reachable = fixture(include_str!("fixtures/order_target_annotation.json"));
    if let Some(object) = reachable.as_object_mut() {
        object.remove("audit");
    }
    let reachable = Annotation::from_json(&reachable).unwrap();
    for row in &rows {
        assert_shape(&reachable, row, true, "root");
        assert!(row.get("audit").is_none());
    }
    assert_eq!(rows[1]["contact"]["channels"], json!([{"mail": "grace@example.org"}]));
    assert_eq!(rows[0]["contact"]["shipping"]["postcode"], json!("04109"));
}

#[test]
fn test_equal_keys_under_different_parents() {
    let schema = FieldSchema::infer(&json!({"p": 1, "q": 2})).unwrap();
    let source = Annotation::from_json(&json!({"p": "root.p", "q": "root.q"})).unwrap();
    let target = Annotation::from_json(&json!({
        "billing": {"address": {"p": "root.p"}},
        "shipping": {"address": {"q": "root.q"}}
    }))
    .unwrap();

    let plan = plan_for(&schema, source, target.clone());
    assert_eq!(selected(&plan), vec!["root.p", "root.q"]);
    assert_eq!(
        plan.transform_operations,
        vec![
            TransformOperation::rename("root.q", "q"),
            TransformOperation::AddHierarchy {
                field: "address".to_string(),
                connect: strings(&["q"]),
            },
            TransformOperation::rename("root.p", "p"),
            TransformOperation::AddHierarchy {
                field: "address_1".to_string(),
                connect: strings(&["p"]),
            },
            TransformOperation::AddHierarchy {
                field: "shipping".to_string(),
                connect: strings(&["address"]),
            },
            TransformOperation::rename("address_1", "address"),
            TransformOperation::AddHierarchy {
                field: "billing".to_string(),
                connect: strings(&["address"]),
            },
        ]
    );

    let rows = execute(&plan, &[json!({"p": 1, "q": 2})]);
    assert_shape(&target, &rows[0], true, "root");
    assert_eq!(
        rows[0],
        json!({"shipping": {"address": {"q": 2}}, "billing": {"address": {"p": 1}}})
    );
}

// =============================================================================
// Phase properties
// =============================================================================

#[test]
fn test_typings_hold_after_construction() {
    let config = MappingConfig::default();
    let sources = [
        (nested_schema(), annotation(include_str!("fixtures/source_annotation.json"))),
        (
            FieldSchema::from_json(&fixture(include_str!("fixtures/order_schema.json"))).unwrap(),
            annotation(include_str!("fixtures/order_source_annotation.json")),
        ),
    ];
    for (schema, source) in &sources {
        let (h, _) = create_hierarchy(schema, source, &config).unwrap();
        assert!(h.typing(SCHEMA, ANNOTATION).is_some());
        assert!(h.typing(SCHEMA, META).is_some());
        h.check().unwrap();
    }
}

fn prepared(config: &MappingConfig) -> (sda_mapping::Hierarchy, Transformation) {
    let source = annotation(include_str!("fixtures/source_annotation.json"));
    let (mut h, s_m) = create_hierarchy(&nested_schema(), &source, config).unwrap();
    let mut t = Transformation::new(config.clone());
    t.remove_irrelevant_nodes(&mut h).unwrap();
    add_annotation_meta_typing(&mut h, &s_m).unwrap();
    (h, t)
}

#[test]
fn test_irrelevant_nodes_removed() {
    let (h, _) = prepared(&MappingConfig::default());
    let g = h.graph(SCHEMA).unwrap();
    assert!(!g.contains_node("root.a"));
    assert!(!h.graph(ANNOTATION).unwrap().contains_node("DELETE"));
    h.check().unwrap();
}

#[test]
fn test_flatten_is_idempotent() {
    let (mut h, mut t) = prepared(&MappingConfig::default());
    assert!(t.remove_hierarchies(&mut h).unwrap() > 0);
    let edges: Vec<(String, String)> = h
        .graph(SCHEMA)
        .unwrap()
        .edges()
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

    assert_eq!(t.remove_hierarchies(&mut h).unwrap(), 0);
    let again: Vec<(String, String)> = h
        .graph(SCHEMA)
        .unwrap()
        .edges()
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
    assert_eq!(edges, again);
}

#[test]
fn test_meta_model_invariants() {
    let (mut h, mut t) = prepared(&MappingConfig::default());
    t.remove_hierarchies(&mut h).unwrap();

    let m = h.graph(META).unwrap();
    assert_eq!(m.nodes(), vec!["ROOT", "FIELD"]);
    assert!(m.has_edge("ROOT", "FIELD"));
    let g = h.graph(SCHEMA).unwrap();
    for node in g.nodes().into_iter().filter(|n| *n != "root") {
        assert!(g.has_edge("root", node), "{} is not attached to the root", node);
    }
    h.check().unwrap();

    let target = annotation(include_str!("fixtures/target_dict.json"));
    t.construct_target_hierarchies(&mut h, &target).unwrap();
    let m = h.graph(META).unwrap();
    assert!(m.has_edge("STRUCT", "STRUCT"));
    assert!(m.has_edge("ROOT", "STRUCT"));
    assert_eq!(h.type_of(SCHEMA, "x", META), Some("STRUCT"));
    h.check().unwrap();
}

#[test]
fn test_strict_mode_rejects_regrouping() {
    let mut config = MappingConfig::default();
    config.rewrite.strict = true;
    let mut integration = Integration::new(config);
    integration
        .load_source(&nested_schema(), &annotation(include_str!("fixtures/source_annotation.json")))
        .unwrap();
    integration.load_target_annotation(annotation(include_str!("fixtures/target_dict.json")));

    let plan = integration.do_transformation().unwrap();
    assert_eq!(selected(&plan), vec!["root.a.b", "root.a.c"]);
    assert!(plan.transform_operations.is_empty());
}

// =============================================================================
// File loading
// =============================================================================

#[test]
fn test_load_from_files_with_inferred_schema() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.json");
    let source = dir.path().join("source.json");
    let target = dir.path().join("target.json");
    std::fs::write(&data, r#"[{"a": {"b": 1, "c": 2}}, {"a": {"b": 3}}]"#).unwrap();
    std::fs::write(&source, include_str!("fixtures/source_annotation.json")).unwrap();
    std::fs::write(&target, include_str!("fixtures/target_list.json")).unwrap();

    let mut integration = Integration::new(MappingConfig::default());
    integration.load_source_files(&SourceFile::Data(data), &source).unwrap();
    integration.load_target_file(&target).unwrap();
    let plan = integration.do_transformation().unwrap();

    assert_eq!(selected(&plan), vec!["root.a.b", "root.a.c"]);
    let rendered = integration.config().render(&plan).unwrap();
    let value: Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["normalFormOperations"][0], json!({"action": "selectField", "field": "root.a.b"}));
    assert_eq!(value["transformOperations"][2]["action"], json!("nestList"));
}

#[test]
fn test_malformed_annotation_file() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.json");
    let source = dir.path().join("source.json");
    std::fs::write(&schema, include_str!("fixtures/nested_schema.json")).unwrap();
    std::fs::write(&source, r#"{"x": []}"#).unwrap();

    let mut integration = Integration::new(MappingConfig::default());
    let err = integration
        .load_source_files(&SourceFile::Schema(schema), &source)
        .unwrap_err();
    match err {
        sda_mapping::MappingError::Structural(message) => assert!(message.contains("empty sequence")),
        other => panic!("Expected Structural, got {:?}", other),
    }
    assert!(integration.hierarchy().is_none());
}
