//! JavaScript module analyzer using tree-sitter

use super::walker::{ModuleWalker, WalkOptions};
use crate::analyzer::{AnalyzerError, ModuleAnalyzer};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};
use gqlb_core::ModuleAnalysis;
use std::path::Path;

pub struct JavaScriptAnalyzer {
    parser_pool: ParserPool,
}

impl JavaScriptAnalyzer {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }
}

impl ModuleAnalyzer for JavaScriptAnalyzer {
    fn analyze(&self, path: &Path, source: &str) -> Result<ModuleAnalysis, AnalyzerError> {
        let parsed = self
            .parser_pool
            .parse_blocking(ParseRequest {
                file_type: FileType::JavaScript,
                content: source.to_string(),
                path: path.to_path_buf(),
            })
            .map_err(|e| AnalyzerError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let walker = ModuleWalker::new(path.to_path_buf(), source, WalkOptions::default());
        Ok(walker.walk(parsed.tree.root_node()))
    }

    fn version(&self) -> &str {
        super::ANALYZER_VERSION
    }
}
