//! Error types for graph construction, context creation and loading

use thiserror::Error;

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Graph construction errors. A failed build never exposes a partial graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unresolved type reference: {field} refers to {type_name}")]
    Unresolved { field: String, type_name: String },

    #[error("Type kind mismatch: {field} declares {declared} but {type_name} is {found}")]
    KindMismatch {
        field: String,
        type_name: String,
        declared: String,
        found: String,
    },

    #[error("Malformed descriptor {entity}: {reason}")]
    Malformed { entity: String, reason: String },

    #[error("Duplicate qualified name: {0}")]
    DuplicateName(String),
}

/// Visit context construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Root entity not found: {0}")]
    UnknownRoot(String),

    #[error("Root entity {name} is a {kind}, not a message")]
    NotAMessage { name: String, kind: String },

    #[error("Field {field} is not declared on {root}")]
    UnknownField { root: String, field: String },
}

/// Lookup of a name that is not in the graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Schema entity not found: {0}")]
pub struct NotFound(pub String);

/// Crate-level errors
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Invalid descriptor set {path}: {source}")]
    InvalidDescriptorSet {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
