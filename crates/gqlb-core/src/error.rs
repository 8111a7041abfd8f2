//! Error types for graph construction and the module cache

use crate::canonical::{CanonicalId, CanonicalIdError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Closed walk: the first id is repeated at the end.
    #[error("Circular dependency detected: {}", format_chain(.0))]
    CircularDependency(Vec<CanonicalId>),

    #[error("Duplicate canonical id: {0}")]
    DuplicateCanonicalId(CanonicalId),

    #[error(transparent)]
    CanonicalId(#[from] CanonicalIdError),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render a cycle chain as `a -> b -> a`.
pub fn format_chain(chain: &[CanonicalId]) -> String {
    chain
        .iter()
        .map(CanonicalId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
