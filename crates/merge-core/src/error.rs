//! Error types for merge-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in merge-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Structural precondition violated for a table (e.g., no columns)
    #[error("malformed table '{table}': {message}")]
    MalformedTable { table: String, message: String },

    /// A plan step references a join column absent from one side
    #[error("join column '{column}' not present in '{table}'")]
    JoinColumnMissing { column: String, table: String },

    /// A table identifier is not present in the registry
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Two tables were registered under the same identifier
    #[error("duplicate table identifier '{0}'")]
    DuplicateTable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
