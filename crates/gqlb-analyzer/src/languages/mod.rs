//! Language backends for module analysis

pub mod javascript;
pub mod typescript;
pub mod walker;

use crate::analyzer::{AnalyzerError, ModuleAnalyzer};
use crate::parser_pool::{FileType, ParserPool};
use gqlb_core::ModuleAnalysis;
use javascript::JavaScriptAnalyzer;
use std::path::Path;
use typescript::TypeScriptAnalyzer;

/// Version tag of the analysis format produced by these backends.
pub const ANALYZER_VERSION: &str = concat!("tree-sitter-", env!("CARGO_PKG_VERSION"));

/// Dispatches to the TypeScript or JavaScript backend by file extension.
pub struct TreeSitterAnalyzer {
    typescript: TypeScriptAnalyzer,
    javascript: JavaScriptAnalyzer,
}

impl TreeSitterAnalyzer {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self {
            typescript: TypeScriptAnalyzer::new(parser_pool.clone()),
            javascript: JavaScriptAnalyzer::new(parser_pool),
        }
    }

    fn backend(&self, path: &Path) -> Option<&dyn ModuleAnalyzer> {
        match FileType::from_path(path)? {
            FileType::TypeScript | FileType::Tsx => Some(&self.typescript),
            FileType::JavaScript => Some(&self.javascript),
        }
    }
}

impl ModuleAnalyzer for TreeSitterAnalyzer {
    fn analyze(&self, path: &Path, source: &str) -> Result<ModuleAnalysis, AnalyzerError> {
        let backend = self
            .backend(path)
            .ok_or_else(|| AnalyzerError::UnsupportedFile(path.to_path_buf()))?;
        backend.analyze(path, source)
    }

    fn version(&self) -> &str {
        ANALYZER_VERSION
    }
}

/// Analyzer over a fresh parser pool sized to the machine.
pub fn default_analyzer() -> TreeSitterAnalyzer {
    TreeSitterAnalyzer::new(crate::parser_pool::create_parser_pool())
}
