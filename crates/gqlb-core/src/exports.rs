//! Per-module export tables for cross-file resolution
//!
//! A table maps every externally visible name of a module, including dotted
//! children of nested object exports, to the canonical id that defines it.

use crate::canonical::{create_canonical_id, CanonicalId};
use crate::model::{ExportKind, ExportRecord, ImportKind, ModuleAnalysis};
use crate::resolver::{resolve_specifier, Resolution};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Exported name → defining canonical id, in insertion order.
pub type ExportTable = IndexMap<String, CanonicalId>;

/// Ordered analyzed module set, keyed by normalized absolute path.
pub type ModuleSet = IndexMap<PathBuf, ModuleAnalysis>;

/// Export tables for every module of a set.
#[derive(Debug, Default)]
pub struct ExportTables {
    tables: IndexMap<PathBuf, ExportTable>,
}

impl ExportTables {
    /// Seed each table from its module's own definitions, then copy
    /// re-exported entries until no table changes.
    pub fn build(modules: &ModuleSet) -> Self {
        let mut tables: IndexMap<PathBuf, ExportTable> = IndexMap::with_capacity(modules.len());
        for (path, analysis) in modules {
            tables.insert(path.clone(), seed_table(path, analysis));
        }

        let mut this = ExportTables { tables };
        // Every re-export hop settles in one pass; only namespace re-export
        // cycles (`ns.ns.ns...`) keep growing, so they are cut off here.
        let max_passes = modules.len() + 1;
        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut changed = false;
            for (path, analysis) in modules {
                for record in &analysis.exports {
                    changed |= this.apply_export(path, analysis, record, modules);
                }
            }
            if !changed {
                break;
            }
            if passes >= max_passes {
                tracing::warn!("Export tables did not settle; namespace re-export cycle?");
                break;
            }
        }
        tracing::debug!(
            "Export tables settled after {} pass(es) over {} modules",
            passes,
            modules.len()
        );
        this
    }

    pub fn get(&self, path: &Path) -> Option<&ExportTable> {
        self.tables.get(path)
    }

    /// Look up one exported name of a module.
    pub fn lookup(&self, path: &Path, name: &str) -> Option<&CanonicalId> {
        self.tables.get(path).and_then(|t| t.get(name))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn apply_export(
        &mut self,
        path: &Path,
        analysis: &ModuleAnalysis,
        record: &ExportRecord,
        modules: &ModuleSet,
    ) -> bool {
        match (&record.kind, &record.source) {
            (ExportKind::ReexportStar, Some(source)) => {
                let Some(target) = resolve_in_set(path, source, modules) else {
                    return false;
                };
                let entries = self.snapshot(&target);
                let table = self.table_mut(path);
                let mut changed = false;
                for (name, id) in entries {
                    if name == "default" || name.starts_with("default.") {
                        continue;
                    }
                    changed |= insert_absent(table, name, id);
                }
                changed
            }
            (ExportKind::ReexportNamed, Some(source)) => {
                let Some(target) = resolve_in_set(path, source, modules) else {
                    return false;
                };
                let entries = self.snapshot(&target);
                copy_binding(self.table_mut(path), &entries, &record.local, &record.exported)
            }
            (ExportKind::Named, None) => {
                // `import { X } from "./a"; export { X as Y }`
                let Some(import) = analysis
                    .imports
                    .iter()
                    .find(|i| i.kind != ImportKind::SideEffect && i.local == record.local)
                else {
                    return false;
                };
                let Some(target) = resolve_in_set(path, &import.source, modules) else {
                    return false;
                };
                let entries = self.snapshot(&target);
                let imported = match import.kind {
                    ImportKind::Namespace => "*",
                    ImportKind::Default => "default",
                    ImportKind::Named => import.imported.as_str(),
                    ImportKind::SideEffect => return false,
                };
                copy_binding(self.table_mut(path), &entries, imported, &record.exported)
            }
            _ => false,
        }
    }

    fn snapshot(&self, path: &Path) -> Vec<(String, CanonicalId)> {
        self.tables
            .get(path)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    fn table_mut(&mut self, path: &Path) -> &mut ExportTable {
        self.tables.entry(path.to_path_buf()).or_default()
    }
}

/// Resolve a specifier against the analyzed module set. Anything outside the
/// set is a soft miss.
pub fn resolve_in_set(from: &Path, specifier: &str, modules: &ModuleSet) -> Option<PathBuf> {
    match resolve_specifier(from, specifier, |candidate| modules.contains_key(candidate)) {
        Resolution::Resolved(path) => Some(path),
        _ => None,
    }
}

fn seed_table(path: &Path, analysis: &ModuleAnalysis) -> ExportTable {
    let mut table = ExportTable::new();
    let mut local_ids: Vec<(&str, CanonicalId)> = Vec::new();

    for def in &analysis.definitions {
        let Ok(id) = create_canonical_id(path, &def.ast_path) else {
            continue;
        };
        if def.exported {
            table.entry(def.export_name.clone()).or_insert_with(|| id.clone());
        }
        local_ids.push((def.ast_path.as_str(), id));
    }

    // Direct named exports of local bindings, e.g. `export { a as b }`.
    for record in &analysis.exports {
        if record.kind != ExportKind::Named || record.source.is_some() {
            continue;
        }
        let prefix = format!("{}.", record.local);
        for (ast_path, id) in &local_ids {
            if *ast_path == record.local {
                table.entry(record.exported.clone()).or_insert_with(|| id.clone());
            } else if let Some(rest) = ast_path.strip_prefix(&prefix) {
                table
                    .entry(format!("{}.{}", record.exported, rest))
                    .or_insert_with(|| id.clone());
            }
        }
    }

    table
}

/// Copy the binding `local` (with its dotted children) from `entries` under
/// the name `exported`. `local == "*"` copies the whole table as a namespace.
fn copy_binding(
    table: &mut ExportTable,
    entries: &[(String, CanonicalId)],
    local: &str,
    exported: &str,
) -> bool {
    let mut changed = false;
    if local == "*" {
        for (name, id) in entries {
            changed |= insert_absent(table, format!("{}.{}", exported, name), id.clone());
        }
        return changed;
    }

    let prefix = format!("{}.", local);
    for (name, id) in entries {
        if name == local {
            changed |= insert_absent(table, exported.to_string(), id.clone());
        } else if let Some(rest) = name.strip_prefix(&prefix) {
            changed |= insert_absent(table, format!("{}.{}", exported, rest), id.clone());
        }
    }
    changed
}

fn insert_absent(table: &mut ExportTable, name: String, id: CanonicalId) -> bool {
    if table.contains_key(&name) {
        return false;
    }
    table.insert(name, id);
    true
}
