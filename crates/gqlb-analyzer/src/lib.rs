//! Source analysis: tree-sitter parsing, module analyzers and the expression syntax layer

pub mod analyzer;
pub mod languages;
pub mod parser_pool;
pub mod syntax;

#[cfg(test)]
mod tests;

pub use analyzer::{AnalyzerError, ModuleAnalyzer};
pub use languages::{default_analyzer, TreeSitterAnalyzer, ANALYZER_VERSION};
pub use parser_pool::{create_parser_pool, FileType, ParseRequest, ParseResult, ParserPool};
pub use syntax::{SourceParser, SyntaxError};
