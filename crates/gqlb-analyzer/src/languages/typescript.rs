//! TypeScript / TSX module analyzer using tree-sitter

use super::walker::{ModuleWalker, WalkOptions};
use crate::analyzer::{AnalyzerError, ModuleAnalyzer};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};
use gqlb_core::ModuleAnalysis;
use std::path::Path;

pub struct TypeScriptAnalyzer {
    parser_pool: ParserPool,
}

impl TypeScriptAnalyzer {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }
}

impl ModuleAnalyzer for TypeScriptAnalyzer {
    fn analyze(&self, path: &Path, source: &str) -> Result<ModuleAnalysis, AnalyzerError> {
        let file_type = match FileType::from_path(path) {
            Some(FileType::Tsx) => FileType::Tsx,
            Some(FileType::TypeScript) => FileType::TypeScript,
            _ => return Err(AnalyzerError::UnsupportedFile(path.to_path_buf())),
        };

        let parsed = self
            .parser_pool
            .parse_blocking(ParseRequest {
                file_type,
                content: source.to_string(),
                path: path.to_path_buf(),
            })
            .map_err(|e| AnalyzerError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let options = WalkOptions {
            skip_type_only: true,
        };
        let walker = ModuleWalker::new(path.to_path_buf(), source, options);
        Ok(walker.walk(parsed.tree.root_node()))
    }

    fn version(&self) -> &str {
        super::ANALYZER_VERSION
    }
}
