//! SDA Schema Mapping
//!
//! Derives the structural operations that turn flat source rows into a
//! nested target document, given a source schema, an annotation linking the
//! schema's fields to semantic names, and a target annotation describing the
//! desired nesting.
//!
//! ## Features
//!
//! - **Typed graphs**: schema (G), annotation (S) and meta-model (M) graphs
//! - **Hierarchy**: typing morphisms between the graphs, kept consistent on every edit
//! - **Rewriting**: pattern matching and transactional rule application
//! - **Planning**: target nesting replayed innermost first as regrouping rules
//!
//! ## Pipeline
//!
//! ```text
//! schema ──► G ──┐
//!                ├─► Hierarchy{G,S,M} ─► remove sink ─► flatten ─► regroup ─► plan
//! annotation ► S ┘                                                  ▲
//!                                              target annotation ───┘
//! ```
//!
//! The plan holds `selectField` operations (the normal form) and the ordered
//! `renameNode` / `addHierarchy` / `nestList` operations.

pub mod annotation;
pub mod config;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod integration;
pub mod rule;
pub mod schema;
pub mod transform;

pub use annotation::{Annotation, StructureKind};
pub use config::MappingConfig;
pub use error::{MappingError, Result};
pub use graph::{MetaNode, NodeKind, TypedGraph};
pub use hierarchy::Hierarchy;
pub use integration::{Integration, SourceFile};
pub use rule::{Edit, Rule};
pub use schema::{Field, FieldSchema};
pub use transform::{TransformOperation, Transformation, TransformationPlan};
