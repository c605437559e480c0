//! Annotation documents
//!
//! An annotation is a tree of mappings, sequences and scalars. Mappings keep
//! their document order. A sequence is represented by its first element
//! only; later elements are assumed to share its shape. Scalars are opaque
//! identifiers and name a schema field by its dotted path.

use serde_json::Value;

use crate::error::{MappingError, Result};

/// A validated annotation tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Mapping(Vec<(String, Annotation)>),
    /// First element of the annotated sequence
    Sequence(Box<Annotation>),
    Scalar(String),
}

/// Structural kind of an annotation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Dict,
    List,
}

impl StructureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureKind::Dict => "dict",
            StructureKind::List => "list",
        }
    }
}

impl Annotation {
    /// Parse and validate an annotation document.
    ///
    /// The top level must be a mapping, sequences must be non-empty and start
    /// with a mapping, and scalars must not be null.
    pub fn from_json(json: &Value) -> Result<Self> {
        match json {
            Value::Object(_) => parse(json, "<root>"),
            _ => Err(MappingError::Structural(
                "annotation document must be a mapping at the top level".to_string(),
            )),
        }
    }

    /// Child entries of a mapping, or of the first element of a sequence
    pub fn entries(&self) -> &[(String, Annotation)] {
        match self {
            Annotation::Mapping(entries) => entries,
            Annotation::Sequence(first) => first.entries(),
            Annotation::Scalar(_) => &[],
        }
    }

    /// Structural kind, `None` for scalars
    pub fn structure(&self) -> Option<StructureKind> {
        match self {
            Annotation::Mapping(_) => Some(StructureKind::Dict),
            Annotation::Sequence(_) => Some(StructureKind::List),
            Annotation::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Annotation::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

fn parse(json: &Value, path: &str) -> Result<Annotation> {
    match json {
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                let child_path = format!("{}.{}", path, key);
                entries.push((key.clone(), parse(value, &child_path)?));
            }
            Ok(Annotation::Mapping(entries))
        }
        Value::Array(items) => match items.first() {
            Some(first @ Value::Object(_)) => Ok(Annotation::Sequence(Box::new(parse(first, path)?))),
            Some(_) => Err(MappingError::Structural(format!(
                "sequence at '{}' must start with a mapping",
                path
            ))),
            None => Err(MappingError::Structural(format!("empty sequence at '{}'", path))),
        },
        Value::String(s) => Ok(Annotation::Scalar(s.clone())),
        Value::Number(n) => Ok(Annotation::Scalar(n.to_string())),
        Value::Bool(b) => Ok(Annotation::Scalar(b.to_string())),
        Value::Null => Err(MappingError::Structural(format!("null annotation at '{}'", path))),
    }
}
