//! Error types.
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single `TypeGraph::add_root` call.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unsupported root type `{ty}`: only record types can be registered as roots")]
    UnsupportedRoot { ty: String },
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {origin}: {message}")]
    Decode { origin: String, message: String },

    #[error("{origin}: {record}.{field}: `{expr}` is not a type: {message}")]
    TypeSyntax {
        origin: String,
        record: String,
        field: String,
        expr: String,
        message: String,
    },

    #[error("record `{0}` is declared more than once")]
    DuplicateRecord(String),

    #[error("no record named `{0}` in the loaded manifests")]
    UnknownRecord(String),

    #[error("record name `{name}` is ambiguous, candidates: {}", candidates.join(", "))]
    AmbiguousRecord { name: String, candidates: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read options {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid options {origin}: {message}")]
    Decode { origin: String, message: String },
}
