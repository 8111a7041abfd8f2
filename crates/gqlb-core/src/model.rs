//! Core data structures for analyzed modules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Discriminates what kind of GraphQL element a definition declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Reusable field selection on a named type.
    Model,
    /// Operation fragment with its own variables, composed into operations.
    Slice,
    /// Complete operation producing a GraphQL document.
    Operation,
}

impl ElementKind {
    /// Name of the kind-scoped registry object in synthesized code.
    pub fn registry_name(&self) -> &'static str {
        match self {
            ElementKind::Model => "models",
            ElementKind::Slice => "slices",
            ElementKind::Operation => "operations",
        }
    }

    /// Name of the registration hook in synthesized code.
    pub fn hook_name(&self) -> &'static str {
        match self {
            ElementKind::Model => "model",
            ElementKind::Slice => "slice",
            ElementKind::Operation => "operation",
        }
    }

    /// Role of the callback argument elided from this kind's builder call.
    pub fn elided_role(&self) -> &'static str {
        match self {
            ElementKind::Model => "normalize",
            ElementKind::Slice => "projection",
            ElementKind::Operation => "resolver",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hook_name())
    }
}

/// 1-based position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// One element expression found in a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    /// Dot-path under which the element is visible to other modules.
    pub export_name: String,
    /// Dot-path of the local binding; the export part of the canonical id.
    pub ast_path: String,
    pub kind: ElementKind,
    /// Raw expression text. Empty when the expression could not be extracted.
    pub expression: String,
    /// Free identifier paths used by the expression, in first-seen order.
    pub references: Vec<String>,
    /// Whether the binding is visible outside its module.
    pub exported: bool,
    pub loc: SourceLocation,
}

impl Definition {
    pub fn has_expression(&self) -> bool {
        !self.expression.trim().is_empty()
    }
}

// ── Linkage records ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    /// `import { imported as local } from "source"`
    Named,
    /// `import local from "source"`
    Default,
    /// `import * as local from "source"`
    Namespace,
    /// `import "source"`: links the module without binding a name
    SideEffect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub source: String,
    pub local: String,
    /// Exported name in the source module; `default` or `*` for the
    /// default and namespace kinds.
    pub imported: String,
    pub kind: ImportKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportKind {
    /// `export { local as exported }` without a source.
    Named,
    /// `export { local as exported } from "source"`; `local` is `*` for
    /// `export * as exported from "source"`.
    ReexportNamed,
    /// `export * from "source"`
    ReexportStar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub kind: ExportKind,
    pub local: String,
    pub exported: String,
    pub source: Option<String>,
}

// ── Diagnostics ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: SourceLocation,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, loc: SourceLocation) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            loc,
        }
    }

    pub fn warning(message: impl Into<String>, loc: SourceLocation) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            loc,
        }
    }
}

/// Immutable per-file analysis result produced by a module analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAnalysis {
    pub file_path: PathBuf,
    pub definitions: Vec<Definition>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleAnalysis {
    pub fn new(file_path: PathBuf) -> Self {
        ModuleAnalysis {
            file_path,
            definitions: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Every module specifier this module links to, imports first, in
    /// source order and without duplicates.
    pub fn specifiers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        let sources = self
            .imports
            .iter()
            .map(|i| i.source.as_str())
            .chain(self.exports.iter().filter_map(|e| e.source.as_deref()));
        for source in sources {
            if !seen.contains(&source) {
                seen.push(source);
            }
        }
        seen
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}
