//! Transformation Operations
//!
//! The operations handed to the data-execution layer. `SelectField` makes up
//! the normal form (the column projection); the remaining variants restructure
//! the projected rows and must be applied in emitted order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One structural operation on flat rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TransformOperation {
    /// Read `field` from the source
    SelectField { field: String },

    /// Rename column `field` to `rename`
    RenameNode { field: String, rename: String },

    /// Group the `connect` columns into a nested record named `field`
    AddHierarchy { field: String, connect: Vec<String> },

    /// Group the `connect` columns into a list of records named `field`
    NestList { field: String, connect: Vec<String> },
}

impl TransformOperation {
    pub fn select(field: impl Into<String>) -> Self {
        TransformOperation::SelectField { field: field.into() }
    }

    pub fn rename(field: impl Into<String>, rename: impl Into<String>) -> Self {
        TransformOperation::RenameNode {
            field: field.into(),
            rename: rename.into(),
        }
    }

    /// Action tag as it appears in serialized output
    pub fn action(&self) -> &'static str {
        match self {
            TransformOperation::SelectField { .. } => "selectField",
            TransformOperation::RenameNode { .. } => "renameNode",
            TransformOperation::AddHierarchy { .. } => "addHierarchy",
            TransformOperation::NestList { .. } => "nestList",
        }
    }

    /// Field the operation applies to (or creates)
    pub fn field(&self) -> &str {
        match self {
            TransformOperation::SelectField { field }
            | TransformOperation::RenameNode { field, .. }
            | TransformOperation::AddHierarchy { field, .. }
            | TransformOperation::NestList { field, .. } => field,
        }
    }

    /// Member columns of a grouping operation; empty for the others
    pub fn connect(&self) -> &[String] {
        match self {
            TransformOperation::AddHierarchy { connect, .. } | TransformOperation::NestList { connect, .. } => connect,
            _ => &[],
        }
    }

    /// Member columns reduced to their last path segment
    pub fn flatten_connect(&self, separator: &str) -> Vec<String> {
        self.connect()
            .iter()
            .map(|c| c.rsplit(separator).next().unwrap_or(c).to_string())
            .collect()
    }
}

impl fmt::Display for TransformOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformOperation::SelectField { field } => write!(f, "selectField({})", field),
            TransformOperation::RenameNode { field, rename } => write!(f, "renameNode({} -> {})", field, rename),
            TransformOperation::AddHierarchy { field, connect } => {
                write!(f, "addHierarchy({}, [{}])", field, connect.join(", "))
            }
            TransformOperation::NestList { field, connect } => {
                write!(f, "nestList({}, [{}])", field, connect.join(", "))
            }
        }
    }
}
