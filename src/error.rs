//! Error types for schema mapping

use thiserror::Error;

/// Result type for mapping operations
pub type Result<T> = std::result::Result<T, MappingError>;

/// Schema mapping errors
#[derive(Error, Debug)]
pub enum MappingError {
    /// Malformed input document (schema or annotation) or a cycle in it
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Typing inconsistency in {graph}: {message}")]
    TypingInconsistency { graph: String, message: String },

    #[error("No valid instance for step '{step}'")]
    NoValidInstance { step: String },

    #[error("Unknown graph: {0}")]
    UnknownGraph(String),

    #[error("Unknown node '{node}' in graph {graph}")]
    UnknownNode { graph: String, node: String },

    /// An edit that cannot be applied to the current graph
    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Not loaded: {0}")]
    NotLoaded(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl MappingError {
    pub(crate) fn typing(graph: impl Into<String>, message: impl Into<String>) -> Self {
        MappingError::TypingInconsistency {
            graph: graph.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown_node(graph: impl Into<String>, node: impl Into<String>) -> Self {
        MappingError::UnknownNode {
            graph: graph.into(),
            node: node.into(),
        }
    }
}
