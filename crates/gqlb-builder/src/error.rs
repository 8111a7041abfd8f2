//! Builder error taxonomy
//!
//! Every variant is terminal for a build. `code()` is the stable identifier
//! printed by the CLI.

use gqlb_core::{format_chain, CanonicalId, CanonicalIdError, GraphError};
use std::path::PathBuf;
use thiserror::Error;

/// Subcode of `MODULE_EVALUATION_FAILED` raised before evaluation starts.
pub const MISSING_EXPRESSION: &str = "MISSING_EXPRESSION";

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("No files match entry pattern '{0}'")]
    EntryNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to read {path}: {source}")]
    DiscoveryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Circular dependency detected: {}", format_chain(.chain))]
    CircularDependency { chain: Vec<CanonicalId> },

    #[error("Definition {id} has no extractable expression ({file}:{line})")]
    MissingExpression {
        id: CanonicalId,
        file: String,
        line: u32,
    },

    #[error("Evaluation failed in {file}: {message}")]
    EvaluationFailed { file: String, message: String },

    #[error("{0}")]
    ExportNameCollision(String),

    #[error("Failed to load intermediate module {file}: {message}")]
    RuntimeModuleLoad { file: String, message: String },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuilderError {
    pub fn code(&self) -> &'static str {
        match self {
            BuilderError::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            BuilderError::InvalidPath(_) => "INVALID_PATH",
            BuilderError::DiscoveryIo { .. } => "DISCOVERY_IO_FAILED",
            BuilderError::CircularDependency { .. } => "CIRCULAR_DEPENDENCY",
            BuilderError::MissingExpression { .. } | BuilderError::EvaluationFailed { .. } => {
                "MODULE_EVALUATION_FAILED"
            }
            BuilderError::ExportNameCollision(_) => "RUNTIME_EXPORT_NAME_COLLISION",
            BuilderError::RuntimeModuleLoad { .. } => "RUNTIME_MODULE_LOAD_FAILED",
            BuilderError::WriteFailed { .. } => "WRITE_FAILED",
        }
    }

    pub fn subcode(&self) -> Option<&'static str> {
        match self {
            BuilderError::MissingExpression { .. } => Some(MISSING_EXPRESSION),
            _ => None,
        }
    }

    /// `CODE` or `CODE/SUBCODE`.
    pub fn full_code(&self) -> String {
        match self.subcode() {
            Some(sub) => format!("{}/{}", self.code(), sub),
            None => self.code().to_string(),
        }
    }
}

impl From<GraphError> for BuilderError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::CircularDependency(chain) => BuilderError::CircularDependency { chain },
            GraphError::DuplicateCanonicalId(id) => {
                BuilderError::ExportNameCollision(format!("Duplicate canonical id: {}", id))
            }
            GraphError::CanonicalId(e) => e.into(),
        }
    }
}

impl From<CanonicalIdError> for BuilderError {
    fn from(err: CanonicalIdError) -> Self {
        BuilderError::InvalidPath(err.to_string())
    }
}

/// Failure to load a persisted artifact.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("Artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Artifact {} is not valid JSON: {message}", .path.display())]
    ParseFailed { path: PathBuf, message: String },

    #[error("Artifact {} failed validation: {message}", .path.display())]
    ValidationFailed { path: PathBuf, message: String },
}

impl ArtifactLoadError {
    pub fn code(&self) -> &'static str {
        match self {
            ArtifactLoadError::NotFound(_) => "NOT_FOUND",
            ArtifactLoadError::ParseFailed { .. } => "PARSE_FAILED",
            ArtifactLoadError::ValidationFailed { .. } => "VALIDATION_FAILED",
        }
    }
}
