//! Error types for Atlas.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Atlas operations.
pub type Result<T> = std::result::Result<T, AtlasError>;

/// All errors that can occur in Atlas.
#[derive(Error, Debug)]
pub enum AtlasError {
    /// Whole-run input is unusable (missing root, no sources).
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// A single source file could not be parsed.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unknown dependency kind code: {0}")]
    UnknownDependencyKind(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Invalid package pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl AtlasError {
    /// True for errors that only affect one file and should not abort a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AtlasError::Parse { .. })
    }
}
