//! Top-level module walker shared by the TypeScript and JavaScript backends
//!
//! Collects imports, exports and element definitions from a parsed program.
//! Only top-level declarations are considered; element expressions nested in
//! object literals get dotted paths (`catalog.byId`).

use crate::syntax::{classify, collect_references, first_error, kind_for_method, Lowerer, GQL_ENTRY};
use gqlb_core::{
    Definition, Diagnostic, ElementKind, ExportKind, ExportRecord, ImportKind, ImportRecord,
    ModuleAnalysis, SourceLocation,
};
use std::path::PathBuf;
use tree_sitter::Node;

/// Grammar-specific switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Ignore `import type` / `export type` and type-only specifiers.
    pub skip_type_only: bool,
}

pub struct ModuleWalker<'s> {
    src: &'s str,
    lowerer: Lowerer<'s>,
    options: WalkOptions,
    analysis: ModuleAnalysis,
}

impl<'s> ModuleWalker<'s> {
    pub fn new(path: PathBuf, src: &'s str, options: WalkOptions) -> Self {
        ModuleWalker {
            src,
            lowerer: Lowerer::new(src),
            options,
            analysis: ModuleAnalysis::new(path),
        }
    }

    pub fn walk(mut self, root: Node) -> ModuleAnalysis {
        let mut cursor = root.walk();
        let children: Vec<Node> = root.named_children(&mut cursor).collect();

        for child in children {
            let reported = self.analysis.diagnostics.len();
            match child.kind() {
                "comment" => continue,
                "import_statement" => self.import(child),
                "export_statement" => self.export(child),
                "lexical_declaration" | "variable_declaration" => self.declaration(child, false),
                "ERROR" => self.recover(child),
                _ => {}
            }
            if child.has_error() && self.analysis.diagnostics.len() == reported {
                let at = first_error(child).unwrap_or(child);
                self.analysis
                    .diagnostics
                    .push(Diagnostic::error("Syntax error", loc(at)));
            }
        }

        self.apply_local_exports();
        self.analysis
    }

    fn text(&self, node: Node) -> &'s str {
        &self.src[node.byte_range()]
    }

    fn has_token(node: Node, token: &str) -> bool {
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
        found
    }

    fn module_name(&self, node: Node) -> String {
        match node.kind() {
            "string" => self.lowerer.string_value(node),
            _ => self.text(node).to_string(),
        }
    }

    // ── Imports ─────────────────────────────────────────

    fn import(&mut self, node: Node) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        if self.options.skip_type_only && Self::has_token(node, "type") {
            return;
        }
        let source = self.lowerer.string_value(source);

        let mut cursor = node.walk();
        let Some(clause) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "import_clause")
        else {
            self.analysis.imports.push(ImportRecord {
                source,
                local: String::new(),
                imported: String::new(),
                kind: ImportKind::SideEffect,
            });
            return;
        };

        let mut cursor = clause.walk();
        let parts: Vec<Node> = clause.named_children(&mut cursor).collect();
        for part in parts {
            match part.kind() {
                "identifier" => self.analysis.imports.push(ImportRecord {
                    source: source.clone(),
                    local: self.text(part).to_string(),
                    imported: "default".to_string(),
                    kind: ImportKind::Default,
                }),
                "namespace_import" => {
                    let mut c = part.walk();
                    let local = part
                        .named_children(&mut c)
                        .find(|n| n.kind() == "identifier")
                        .map(|n| self.text(n).to_string());
                    if let Some(local) = local {
                        self.analysis.imports.push(ImportRecord {
                            source: source.clone(),
                            local,
                            imported: "*".to_string(),
                            kind: ImportKind::Namespace,
                        });
                    }
                }
                "named_imports" => {
                    let mut c = part.walk();
                    let specs: Vec<Node> = part
                        .named_children(&mut c)
                        .filter(|n| n.kind() == "import_specifier")
                        .collect();
                    for spec in specs {
                        if self.options.skip_type_only && Self::has_token(spec, "type") {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = self.module_name(name);
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| self.text(a).to_string())
                            .unwrap_or_else(|| imported.clone());
                        self.analysis.imports.push(ImportRecord {
                            source: source.clone(),
                            local,
                            imported,
                            kind: ImportKind::Named,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    // ── Exports ─────────────────────────────────────────

    fn export(&mut self, node: Node) {
        if self.options.skip_type_only && Self::has_token(node, "type") {
            return;
        }
        if let Some(decl) = node.child_by_field_name("declaration") {
            if matches!(decl.kind(), "lexical_declaration" | "variable_declaration") {
                self.declaration(decl, true);
            }
            return;
        }

        if Self::has_token(node, "default") {
            if let Some(value) = node.child_by_field_name("value") {
                if value.kind() == "identifier" {
                    self.analysis.exports.push(ExportRecord {
                        kind: ExportKind::Named,
                        local: self.text(value).to_string(),
                        exported: "default".to_string(),
                        source: None,
                    });
                } else {
                    self.value(value, "default".to_string(), true);
                }
            }
            return;
        }

        let source = node
            .child_by_field_name("source")
            .map(|s| self.lowerer.string_value(s));

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        let clause = children.iter().find(|c| c.kind() == "export_clause");
        let namespace = children.iter().find(|c| c.kind() == "namespace_export");

        if let Some(clause) = clause {
            let mut c = clause.walk();
            let specs: Vec<Node> = clause
                .named_children(&mut c)
                .filter(|n| n.kind() == "export_specifier")
                .collect();
            for spec in specs {
                if self.options.skip_type_only && Self::has_token(spec, "type") {
                    continue;
                }
                let Some(name) = spec.child_by_field_name("name") else {
                    continue;
                };
                let local = self.module_name(name);
                let exported = spec
                    .child_by_field_name("alias")
                    .map(|a| self.module_name(a))
                    .unwrap_or_else(|| local.clone());
                let kind = if source.is_some() {
                    ExportKind::ReexportNamed
                } else {
                    ExportKind::Named
                };
                self.analysis.exports.push(ExportRecord {
                    kind,
                    local,
                    exported,
                    source: source.clone(),
                });
            }
        } else if let (Some(ns), Some(source)) = (namespace, &source) {
            let mut c = ns.walk();
            let exported = ns
                .named_children(&mut c)
                .next()
                .map(|n| self.module_name(n));
            if let Some(exported) = exported {
                self.analysis.exports.push(ExportRecord {
                    kind: ExportKind::ReexportNamed,
                    local: "*".to_string(),
                    exported,
                    source: Some(source.clone()),
                });
            }
        } else if let Some(source) = source {
            self.analysis.exports.push(ExportRecord {
                kind: ExportKind::ReexportStar,
                local: "*".to_string(),
                exported: "*".to_string(),
                source: Some(source),
            });
        }
    }

    // ── Definitions ─────────────────────────────────────

    fn declaration(&mut self, node: Node, exported: bool) {
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        for declarator in declarators {
            let (Some(name), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            if name.kind() != "identifier" {
                continue;
            }
            self.value(value, self.text(name).to_string(), exported);
        }
    }

    fn value(&mut self, node: Node, path: String, exported: bool) {
        let inner = unwrap_wrappers(node);
        if inner.kind() == "object" {
            let mut cursor = inner.walk();
            let pairs: Vec<Node> = inner
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "pair")
                .collect();
            for pair in pairs {
                let (Some(key), Some(value)) =
                    (pair.child_by_field_name("key"), pair.child_by_field_name("value"))
                else {
                    continue;
                };
                let key = match key.kind() {
                    "property_identifier" | "number" => self.text(key).to_string(),
                    "string" => self.lowerer.string_value(key),
                    _ => continue,
                };
                self.value(value, format!("{}.{}", path, key), exported);
            }
            return;
        }
        if self.is_gql_call(inner) || (inner.has_error() && self.text(inner).starts_with(GQL_ENTRY)) {
            self.definition(node, path, exported);
        }
    }

    fn is_gql_call(&self, node: Node) -> bool {
        if node.kind() != "call_expression" {
            return false;
        }
        let Some(callee) = node.child_by_field_name("function") else {
            return false;
        };
        callee.kind() == "member_expression"
            && callee
                .child_by_field_name("object")
                .is_some_and(|o| o.kind() == "identifier" && self.text(o) == GQL_ENTRY)
    }

    fn definition(&mut self, node: Node, path: String, exported: bool) {
        let at = loc(node);
        let text = self.text(node);

        if node.has_error() {
            self.push_unextractable(path, text, exported, at);
            return;
        }

        let expr = self.lowerer.expr(node);
        tracing::debug!("Definition {} in {}", path, self.analysis.file_path.display());
        self.analysis.definitions.push(Definition {
            export_name: path.clone(),
            ast_path: path,
            kind: classify(&expr),
            expression: text.to_string(),
            references: collect_references(&expr),
            exported,
            loc: at,
        });
    }

    fn push_unextractable(&mut self, path: String, text: &str, exported: bool, at: SourceLocation) {
        self.analysis.diagnostics.push(Diagnostic::error(
            format!("Could not extract the expression of `{}`: syntax error", path),
            at,
        ));
        self.analysis.definitions.push(Definition {
            export_name: path.clone(),
            ast_path: path,
            kind: guess_kind(text),
            expression: String::new(),
            references: Vec::new(),
            exported,
            loc: at,
        });
    }

    /// Top-level `ERROR` node: salvage `[export] const name = gql...` so the
    /// definition fails later with a missing expression instead of vanishing.
    fn recover(&mut self, node: Node) {
        let text = self.text(node).trim_start();
        let (rest, exported) = match text.strip_prefix("export") {
            Some(rest) => (rest.trim_start(), true),
            None => (text, false),
        };
        let Some(rest) = rest
            .strip_prefix("const")
            .or_else(|| rest.strip_prefix("let"))
            .map(str::trim_start)
        else {
            return;
        };
        let name: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
            .collect();
        if name.is_empty() {
            return;
        }
        let Some(init) = rest[name.len()..].trim_start().strip_prefix('=') else {
            return;
        };
        let init = init.trim_start();
        if init.starts_with(GQL_ENTRY) {
            self.push_unextractable(name, init, exported, loc(node));
        }
    }

    /// `export { a as b }` marks local definitions under `a` as exported.
    fn apply_local_exports(&mut self) {
        let renames: Vec<(String, String)> = self
            .analysis
            .exports
            .iter()
            .filter(|e| e.kind == ExportKind::Named && e.source.is_none())
            .map(|e| (e.local.clone(), e.exported.clone()))
            .collect();

        for def in &mut self.analysis.definitions {
            if def.exported {
                continue;
            }
            for (local, exported) in &renames {
                if def.ast_path == *local {
                    def.export_name = exported.clone();
                    def.exported = true;
                    break;
                }
                if let Some(rest) = def.ast_path.strip_prefix(&format!("{}.", local)) {
                    def.export_name = format!("{}.{}", exported, rest);
                    def.exported = true;
                    break;
                }
            }
        }
    }
}

fn unwrap_wrappers(mut node: Node) -> Node {
    while matches!(
        node.kind(),
        "parenthesized_expression" | "as_expression" | "satisfies_expression" | "non_null_expression"
    ) {
        let mut cursor = node.walk();
        let Some(inner) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment")
        else {
            break;
        };
        node = inner;
    }
    node
}

fn loc(node: Node) -> SourceLocation {
    let pos = node.start_position();
    SourceLocation {
        line: pos.row as u32 + 1,
        column: pos.column as u32 + 1,
    }
}

/// Best-effort kind for text that did not parse.
fn guess_kind(text: &str) -> ElementKind {
    for method in ["slice", "composed", "inline"] {
        if text.contains(&format!(".{}(", method)) {
            return kind_for_method(method);
        }
    }
    ElementKind::Model
}
