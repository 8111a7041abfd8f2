//! gqlb core: canonical identity, analysis model, export tables, dependency graph and module cache

pub mod cache;
pub mod canonical;
pub mod error;
pub mod exports;
pub mod graph;
pub mod model;
pub mod resolver;


#[cfg(test)]
pub mod test_utils;

pub use cache::{content_hash, mtime_ms, CacheStats, ModuleCache, ModuleCacheEntry, BUILD_CACHE_FILE};
pub use canonical::{create_canonical_id, normalize_path, normalize_path_buf, CanonicalId, CanonicalIdError};
pub use error::{format_chain, CacheError, GraphError};
pub use exports::{ExportTable, ExportTables, ModuleSet};
pub use graph::{build_dependency_graph, DependencyGraph, DependencyGraphNode};
pub use model::{
    Definition, Diagnostic, ElementKind, ExportKind, ExportRecord, ImportKind, ImportRecord,
    ModuleAnalysis, Severity, SourceLocation,
};
pub use resolver::{resolve_specifier, Resolution};
