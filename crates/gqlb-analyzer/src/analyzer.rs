//! Module analyzer interface

use gqlb_core::ModuleAnalysis;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(PathBuf),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Per-file analysis backend. The discovery pipeline is generic over this
/// trait and never inspects which backend produced a result.
pub trait ModuleAnalyzer: Send + Sync {
    /// Analyze one source file. Syntax errors inside the file are reported as
    /// diagnostics on the result; `Err` means the file could not be analyzed
    /// at all.
    fn analyze(&self, path: &Path, source: &str) -> Result<ModuleAnalysis, AnalyzerError>;

    /// Identifies the analysis format; persisted cache entries from another
    /// version are discarded.
    fn version(&self) -> &str;
}
