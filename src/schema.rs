//! Field schema descriptors
//!
//! The nested field schema consumed by the schema graph builder. A schema is
//! a list of fields; struct-typed and array-of-struct-typed fields carry their
//! own nested field list. Type names use the simple-string convention
//! (`bigint`, `string`, `struct<a:bigint>`, `array<struct<a:bigint>>`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MappingError, Result};

/// Structural kind of a field, mirroring the meta-model node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Struct,
    Array,
    Field,
}

/// A single field of a nested schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Simple type string, e.g. `bigint` or `array<struct<a:bigint>>`
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Nested fields for struct and array-of-struct types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    /// Create a leaf field
    pub fn leaf(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            metadata: Map::new(),
            fields: None,
        }
    }

    /// Create a struct field
    pub fn structure(name: impl Into<String>, fields: Vec<Field>) -> Self {
        let type_name = format!("struct<{}>", type_list(&fields));
        Self {
            name: name.into(),
            type_name,
            nullable: true,
            metadata: Map::new(),
            fields: Some(fields),
        }
    }

    /// Create an array-of-struct field
    pub fn array(name: impl Into<String>, fields: Vec<Field>) -> Self {
        let type_name = format!("array<struct<{}>>", type_list(&fields));
        Self {
            name: name.into(),
            type_name,
            nullable: true,
            metadata: Map::new(),
            fields: Some(fields),
        }
    }

    /// Structural kind derived from the type string and nested fields
    pub fn kind(&self) -> FieldKind {
        match &self.fields {
            Some(_) if self.type_name.starts_with("array") => FieldKind::Array,
            Some(_) => FieldKind::Struct,
            None => FieldKind::Field,
        }
    }

    /// Nested fields (empty for leaf fields)
    pub fn children(&self) -> &[Field] {
        self.fields.as_deref().unwrap_or(&[])
    }
}

fn type_list(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| format!("{}:{}", f.name, f.type_name))
        .collect::<Vec<_>>()
        .join(",")
}

/// A nested field schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub fields: Vec<Field>,
}

impl FieldSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Parse a field schema document (`{"fields": [...]}`)
    pub fn from_json(json: &Value) -> Result<Self> {
        let schema: FieldSchema = serde_json::from_value(json.clone())?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reject empty names and duplicate sibling names
    pub fn validate(&self) -> Result<()> {
        fn check(fields: &[Field], parent: &str) -> Result<()> {
            let mut seen = std::collections::HashSet::new();
            for field in fields {
                if field.name.is_empty() {
                    return Err(MappingError::Structural(format!(
                        "empty field name under '{}'",
                        parent
                    )));
                }
                if !seen.insert(field.name.as_str()) {
                    return Err(MappingError::Structural(format!(
                        "duplicate field '{}' under '{}'",
                        field.name, parent
                    )));
                }
                check(field.children(), &field.name)?;
            }
            Ok(())
        }
        check(&self.fields, "<root>")
    }

    /// Infer a schema from sample records.
    ///
    /// Accepts a single record or an array of records. Keys are merged across
    /// records (and across elements of nested arrays) in first-seen order.
    pub fn infer(data: &Value) -> Result<Self> {
        let mut fields = Vec::new();
        match data {
            Value::Object(record) => merge_record(&mut fields, record),
            Value::Array(records) => {
                for record in records {
                    match record {
                        Value::Object(record) => merge_record(&mut fields, record),
                        other => {
                            return Err(MappingError::Structural(format!(
                                "expected a record, found {}",
                                json_kind(other)
                            )))
                        }
                    }
                }
            }
            other => {
                return Err(MappingError::Structural(format!(
                    "expected a record or a list of records, found {}",
                    json_kind(other)
                )))
            }
        }
        Ok(Self { fields })
    }
}

// =============================================================================
// Inference
// =============================================================================

/// Inferred shape of a JSON value before it is turned into a `Field`
enum Inferred {
    Leaf(&'static str),
    Struct(Vec<Field>),
    Array(Vec<Field>),
    LeafArray(&'static str),
}

fn merge_record(fields: &mut Vec<Field>, record: &Map<String, Value>) {
    for (name, value) in record {
        merge_into(fields, build_field(name, infer_value(value)));
    }
}

fn merge_into(fields: &mut Vec<Field>, incoming: Field) {
    match fields.iter_mut().find(|f| f.name == incoming.name) {
        Some(existing) => merge_field(existing, incoming),
        None => fields.push(incoming),
    }
}

fn infer_value(value: &Value) -> Inferred {
    match value {
        Value::Null => Inferred::Leaf("string"),
        Value::Bool(_) => Inferred::Leaf("boolean"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Inferred::Leaf("bigint"),
        Value::Number(_) => Inferred::Leaf("double"),
        Value::String(_) => Inferred::Leaf("string"),
        Value::Object(record) => {
            let mut nested = Vec::new();
            merge_record(&mut nested, record);
            Inferred::Struct(nested)
        }
        Value::Array(items) => {
            let mut nested = Vec::new();
            let mut element = None;
            for item in items {
                match item {
                    Value::Object(record) => merge_record(&mut nested, record),
                    Value::Null => {}
                    other => {
                        if let Inferred::Leaf(t) = infer_value(other) {
                            element = Some(widen(element, t));
                        }
                    }
                }
            }
            if !nested.is_empty() {
                Inferred::Array(nested)
            } else {
                Inferred::LeafArray(element.unwrap_or("string"))
            }
        }
    }
}

fn widen(current: Option<&'static str>, next: &'static str) -> &'static str {
    match (current, next) {
        (None, t) => t,
        (Some(a), b) if a == b => a,
        (Some("bigint"), "double") | (Some("double"), "bigint") => "double",
        _ => "string",
    }
}

fn build_field(name: &str, inferred: Inferred) -> Field {
    match inferred {
        Inferred::Leaf(t) => Field::leaf(name, t),
        Inferred::LeafArray(t) => Field::leaf(name, format!("array<{}>", t)),
        Inferred::Struct(fields) => Field::structure(name, fields),
        Inferred::Array(fields) => Field::array(name, fields),
    }
}

fn merge_field(existing: &mut Field, incoming: Field) {
    match (existing.kind(), incoming.kind()) {
        (FieldKind::Struct, FieldKind::Struct) | (FieldKind::Array, FieldKind::Array) => {
            let kind = existing.kind();
            let nested = existing.fields.get_or_insert_with(Vec::new);
            for field in incoming.fields.unwrap_or_default() {
                merge_into(nested, field);
            }
            let list = type_list(nested);
            existing.type_name = match kind {
                FieldKind::Array => format!("array<struct<{}>>", list),
                _ => format!("struct<{}>", list),
            };
        }
        (FieldKind::Field, FieldKind::Field) => {
            if let (Some(current), Some(next)) =
                (leaf_type(&existing.type_name), leaf_type(&incoming.type_name))
            {
                existing.type_name = widen(Some(current), next).to_string();
            }
        }
        // Conflicting shapes: keep the first one seen.
        _ => {}
    }
}

fn leaf_type(name: &str) -> Option<&'static str> {
    match name {
        "string" => Some("string"),
        "bigint" => Some("bigint"),
        "double" => Some("double"),
        "boolean" => Some("boolean"),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_kind_from_type_string() {
        let s = Field::structure("a", vec![Field::leaf("b", "bigint")]);
        assert_eq!(s.kind(), FieldKind::Struct);
        assert_eq!(s.type_name, "struct<b:bigint>");

        let a = Field::array("items", vec![Field::leaf("id", "bigint")]);
        assert_eq!(a.kind(), FieldKind::Array);

        assert_eq!(Field::leaf("tags", "array<string>").kind(), FieldKind::Field);
    }

    #[test]
    fn test_parse_schema_document() {
        let doc = json!({
            "fields": [
                {"name": "a", "type": "struct<b:bigint>", "nullable": false,
                 "fields": [{"name": "b", "type": "bigint"}]}
            ]
        });
        let schema = FieldSchema::from_json(&doc).unwrap();
        assert_eq!(schema.fields.len(), 1);
        assert!(!schema.fields[0].nullable);
        assert!(schema.fields[0].children()[0].nullable);
    }

    #[test]
    fn test_duplicate_sibling_rejected() {
        let schema = FieldSchema::new(vec![Field::leaf("a", "bigint"), Field::leaf("a", "string")]);
        assert!(matches!(schema.validate(), Err(MappingError::Structural(_))));
    }

    #[test]
    fn test_infer_merges_records() {
        let data = json!([
            {"id": 1, "person": {"name": "Ada"}, "orders": [{"sku": "x"}]},
            {"id": 2.5, "person": {"age": 36}, "orders": [{"qty": 2}], "tags": ["a"]}
        ]);
        let schema = FieldSchema::infer(&data).unwrap();
        let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "person", "orders", "tags"]);

        assert_eq!(schema.fields[0].type_name, "double");
        assert_eq!(schema.fields[1].kind(), FieldKind::Struct);
        assert_eq!(schema.fields[1].children().len(), 2);
        assert_eq!(schema.fields[2].kind(), FieldKind::Array);
        assert_eq!(schema.fields[2].type_name, "array<struct<sku:string,qty:bigint>>");
        assert_eq!(schema.fields[3].type_name, "array<string>");
    }

    #[test]
    fn test_infer_rejects_scalar() {
        assert!(FieldSchema::infer(&json!(3)).is_err());
    }
}
