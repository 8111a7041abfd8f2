//! Builder artifact: snapshot of the registry, persisted as JSON
//!
//! ```json
//! {
//!   "documents": { "PageQuery": { "text": "...", "variables": {}, "sourcePath": "/src/page.ts" } },
//!   "refs": { "/src/user.ts": { "userModel": "/src/user.ts::userModel" } },
//!   "refMap": { "/src/user.ts::userModel": { "kind": "model", "metadata": { "typename": "User" } } },
//!   "report": { "documents": 1, "models": 1, "slices": 0, "operations": 1, "durationMs": 3, "warnings": [] }
//! }
//! ```
//!
//! Every map is an `IndexMap`, so the file follows registration order and two
//! builds of the same tree produce the same bytes (apart from `durationMs`).

use crate::config::BuildMode;
use crate::error::{ArtifactLoadError, BuilderError};
use crate::evaluator::document::print_selections;
use crate::evaluator::{ElementData, OperationType, VariableDefs};
use crate::registry::Registry;
use gqlb_core::{CanonicalId, ElementKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuilderArtifact {
    pub documents: IndexMap<String, DocumentEntry>,
    pub refs: IndexMap<String, RefTree>,
    pub ref_map: IndexMap<String, RefMapEntry>,
    pub report: BuildReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentEntry {
    pub text: String,
    pub variables: VariableDefs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

/// Nested export tree; leaves hold canonical ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefTree {
    Leaf(String),
    Branch(IndexMap<String, RefTree>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefMapEntry {
    pub kind: ElementKind,
    pub metadata: RefMetadata,
}

/// Identity fields in every mode; the prebuild fields only in zero-runtime
/// mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<OperationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<VariableDefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildReport {
    pub documents: usize,
    pub models: usize,
    pub slices: usize,
    #[serde(default)]
    pub operations: usize,
    pub duration_ms: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

// ── Build ───────────────────────────────────────────────

/// Snapshot `registry` into an artifact.
pub fn build_artifact(
    registry: &Registry,
    mode: BuildMode,
    warnings: Vec<String>,
    duration_ms: u64,
) -> Result<BuilderArtifact, BuilderError> {
    let mut documents: IndexMap<String, DocumentEntry> = IndexMap::new();
    let mut refs: IndexMap<String, RefTree> = IndexMap::new();
    let mut ref_map: IndexMap<String, RefMapEntry> = IndexMap::new();

    for (id, data) in registry.iter() {
        insert_ref(&mut refs, id)?;

        let mut metadata = RefMetadata::default();
        match data {
            ElementData::Model(model) => {
                metadata.schema = Some(model.schema.clone());
                metadata.typename = Some(model.typename.clone());
                if mode == BuildMode::ZeroRuntime {
                    metadata.selection = Some(print_selections(&model.selections));
                    metadata.variables = Some(model.variables.clone());
                }
            }
            ElementData::Slice(slice) => {
                metadata.schema = Some(slice.schema.clone());
                metadata.operation_type = Some(slice.operation_type);
                if mode == BuildMode::ZeroRuntime {
                    metadata.selection = Some(print_selections(&slice.selections));
                    metadata.variables = Some(slice.variables.clone());
                }
            }
            ElementData::Operation(op) => {
                if documents.contains_key(&op.operation_name) {
                    return Err(BuilderError::ExportNameCollision(format!(
                        "Document name '{}' is used by more than one operation ({})",
                        op.operation_name, id
                    )));
                }
                documents.insert(
                    op.operation_name.clone(),
                    DocumentEntry {
                        text: op.document.clone(),
                        variables: op.variables.clone(),
                        source_path: Some(id.file_path().to_string()),
                    },
                );
                metadata.schema = Some(op.schema.clone());
                metadata.operation_type = Some(op.operation_type);
                metadata.operation_name = Some(op.operation_name.clone());
                if mode == BuildMode::ZeroRuntime {
                    metadata.selection = Some(print_selections(&op.selections));
                    metadata.variables = Some(op.variables.clone());
                    metadata.document_name = Some(op.operation_name.clone());
                }
            }
        }

        ref_map.insert(
            id.as_str().to_string(),
            RefMapEntry {
                kind: data.kind(),
                metadata,
            },
        );
    }

    let report = BuildReport {
        documents: documents.len(),
        models: registry.count(ElementKind::Model),
        slices: registry.count(ElementKind::Slice),
        operations: registry.count(ElementKind::Operation),
        duration_ms,
        warnings,
    };
    Ok(BuilderArtifact {
        documents,
        refs,
        ref_map,
        report,
    })
}

/// Insert `id` at `refs[file][seg1]...[segN]`.
fn insert_ref(refs: &mut IndexMap<String, RefTree>, id: &CanonicalId) -> Result<(), BuilderError> {
    let collision = || {
        BuilderError::ExportNameCollision(format!(
            "Export path of {} collides with another element",
            id
        ))
    };

    let root = refs
        .entry(id.file_path().to_string())
        .or_insert_with(|| RefTree::Branch(IndexMap::new()));
    let segments: Vec<&str> = id.export_path().split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(collision());
    };

    let mut node = root;
    for segment in parents {
        let RefTree::Branch(children) = node else {
            return Err(collision());
        };
        node = children
            .entry(segment.to_string())
            .or_insert_with(|| RefTree::Branch(IndexMap::new()));
    }
    let RefTree::Branch(children) = node else {
        return Err(collision());
    };
    if children.contains_key(*last) {
        return Err(collision());
    }
    children.insert(last.to_string(), RefTree::Leaf(id.as_str().to_string()));
    Ok(())
}

// ── Persist ─────────────────────────────────────────────

pub fn to_json(artifact: &BuilderArtifact) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(artifact)?;
    json.push('\n');
    Ok(json)
}

/// Write through a temp file and rename, so readers never see a partial
/// artifact and a failed write leaves the previous one in place.
pub fn write_artifact(path: &Path, artifact: &BuilderArtifact) -> Result<(), BuilderError> {
    let write_failed = |source| BuilderError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let json = to_json(artifact).map_err(|e| write_failed(std::io::Error::other(e)))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json).map_err(write_failed)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(write_failed(e));
    }
    tracing::info!("Artifact written to {}", path.display());
    Ok(())
}

// ── Load ────────────────────────────────────────────────

/// Parse and validate artifact text read from `path`.
pub fn parse_artifact(path: &Path, text: &str) -> Result<BuilderArtifact, ArtifactLoadError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ArtifactLoadError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let invalid = |message: String| ArtifactLoadError::ValidationFailed {
        path: path.to_path_buf(),
        message,
    };
    let artifact: BuilderArtifact =
        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
    artifact.validate().map_err(invalid)?;
    Ok(artifact)
}

impl BuilderArtifact {
    /// Cross-field checks beyond the structural schema.
    pub fn validate(&self) -> Result<(), String> {
        for (key, entry) in &self.ref_map {
            let id = CanonicalId::parse(key).ok_or_else(|| format!("invalid canonical id '{}'", key))?;
            let meta = &entry.metadata;
            match entry.kind {
                ElementKind::Model if meta.typename.is_none() => {
                    return Err(format!("model {} has no typename", id));
                }
                ElementKind::Slice if meta.operation_type.is_none() => {
                    return Err(format!("slice {} has no operationType", id));
                }
                ElementKind::Operation => {
                    let name = meta
                        .operation_name
                        .as_ref()
                        .ok_or_else(|| format!("operation {} has no operationName", id))?;
                    if !self.documents.contains_key(name) {
                        return Err(format!("operation {} has no document '{}'", id, name));
                    }
                }
                _ => {}
            }
        }

        let mut leaves = Vec::new();
        for tree in self.refs.values() {
            collect_leaves(tree, &mut leaves);
        }
        if let Some(missing) = leaves.iter().find(|id| !self.ref_map.contains_key(**id)) {
            return Err(format!("refs leaf {} is missing from refMap", missing));
        }
        if leaves.len() != self.ref_map.len() {
            return Err(format!(
                "refs has {} leaves but refMap has {} entries",
                leaves.len(),
                self.ref_map.len()
            ));
        }

        let count = |kind| self.ref_map.values().filter(|e| e.kind == kind).count();
        let report = &self.report;
        if report.documents != self.documents.len()
            || report.models != count(ElementKind::Model)
            || report.slices != count(ElementKind::Slice)
        {
            return Err("report counts do not match the artifact".to_string());
        }
        Ok(())
    }
}

fn collect_leaves<'a>(tree: &'a RefTree, out: &mut Vec<&'a str>) {
    match tree {
        RefTree::Leaf(id) => out.push(id),
        RefTree::Branch(children) => {
            for child in children.values() {
                collect_leaves(child, out);
            }
        }
    }
}
