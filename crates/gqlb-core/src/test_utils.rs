//! Test utilities for gqlb-core

use crate::canonical::{create_canonical_id, CanonicalId};
use crate::exports::ModuleSet;
use crate::model::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Fluent builder for hand-written module analyses.
pub struct ModuleBuilder {
    analysis: ModuleAnalysis,
}

/// Start a module at an absolute path.
pub fn module(path: &str) -> ModuleBuilder {
    ModuleBuilder {
        analysis: ModuleAnalysis::new(PathBuf::from(path)),
    }
}

impl ModuleBuilder {
    /// Exported definition whose export name equals its local path.
    pub fn def(self, name: &str, kind: ElementKind, references: &[&str]) -> Self {
        self.push_def(name, name, kind, references, true)
    }

    /// `export default gql...`
    pub fn default_def(self, kind: ElementKind) -> Self {
        self.push_def("default", "default", kind, &[], true)
    }

    /// Module-private definition.
    pub fn local_def(self, name: &str, kind: ElementKind, references: &[&str]) -> Self {
        self.push_def(name, name, kind, references, false)
    }

    fn push_def(
        mut self,
        export_name: &str,
        ast_path: &str,
        kind: ElementKind,
        references: &[&str],
        exported: bool,
    ) -> Self {
        self.analysis.definitions.push(Definition {
            export_name: export_name.to_string(),
            ast_path: ast_path.to_string(),
            kind,
            expression: format!("gql.default(() => {})", ast_path),
            references: references.iter().map(|r| r.to_string()).collect(),
            exported,
            loc: SourceLocation::default(),
        });
        self
    }

    pub fn import_named(mut self, source: &str, imported: &str, local: &str) -> Self {
        self.analysis.imports.push(ImportRecord {
            source: source.to_string(),
            local: local.to_string(),
            imported: imported.to_string(),
            kind: ImportKind::Named,
        });
        self
    }

    pub fn import_default(mut self, source: &str, local: &str) -> Self {
        self.analysis.imports.push(ImportRecord {
            source: source.to_string(),
            local: local.to_string(),
            imported: "default".to_string(),
            kind: ImportKind::Default,
        });
        self
    }

    pub fn import_namespace(mut self, source: &str, local: &str) -> Self {
        self.analysis.imports.push(ImportRecord {
            source: source.to_string(),
            local: local.to_string(),
            imported: "*".to_string(),
            kind: ImportKind::Namespace,
        });
        self
    }

    pub fn export_named(mut self, local: &str, exported: &str) -> Self {
        self.analysis.exports.push(ExportRecord {
            kind: ExportKind::Named,
            local: local.to_string(),
            exported: exported.to_string(),
            source: None,
        });
        self
    }

    pub fn reexport_named(mut self, source: &str, local: &str, exported: &str) -> Self {
        self.analysis.exports.push(ExportRecord {
            kind: ExportKind::ReexportNamed,
            local: local.to_string(),
            exported: exported.to_string(),
            source: Some(source.to_string()),
        });
        self
    }

    pub fn reexport_star(mut self, source: &str) -> Self {
        self.analysis.exports.push(ExportRecord {
            kind: ExportKind::ReexportStar,
            local: "*".to_string(),
            exported: "*".to_string(),
            source: Some(source.to_string()),
        });
        self
    }

    pub fn build(self) -> ModuleAnalysis {
        self.analysis
    }
}

/// Ordered module set keyed by each analysis' own path.
pub fn module_set(modules: Vec<ModuleBuilder>) -> ModuleSet {
    modules
        .into_iter()
        .map(|m| {
            let analysis = m.build();
            (analysis.file_path.clone(), analysis)
        })
        .collect()
}

/// Shorthand for a canonical id in tests.
pub fn id(path: &str, export_path: &str) -> CanonicalId {
    create_canonical_id(path, export_path).unwrap()
}

/// Create a temporary directory with the given files
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_set_preserves_order() {
        let set = module_set(vec![module("/b.ts"), module("/a.ts")]);
        let keys: Vec<_> = set.keys().cloned().collect();
        assert_eq!(keys, vec![PathBuf::from("/b.ts"), PathBuf::from("/a.ts")]);
    }

    #[test]
    fn test_create_repo_with_structure() {
        let dir = create_repo_with_structure(&[("src/a.ts", "export {}")]);
        assert!(dir.path().join("src/a.ts").exists());
    }
}
