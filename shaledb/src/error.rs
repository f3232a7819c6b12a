use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShaleDbError {
    /// One or more entry identifiers were not found. Bulk operations
    /// aggregate every missing identifier into a single error.
    #[error("Entry not found: {}", identifiers.join(", "))]
    NotFound { identifiers: Vec<String> },

    #[error("Type mismatch for '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to commit '{name}': {reason}")]
    Commit { name: String, reason: String },

    #[error("File does not exist: {0}")]
    FileMissing(PathBuf),

    #[error("Builder error: {0}")]
    Builder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl ShaleDbError {
    /// Shorthand for a single missing identifier.
    pub fn not_found(identifier: impl Into<String>) -> Self {
        ShaleDbError::NotFound {
            identifiers: vec![identifier.into()],
        }
    }
}

pub type Result<T> = std::result::Result<T, ShaleDbError>;
