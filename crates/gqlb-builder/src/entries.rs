//! Entry pattern expansion
//!
//! An entry is a plain path or a glob relative to the project root. Globs are
//! matched against root-relative paths with `/` separators while walking the
//! root with `ignore`, so `.gitignore`d and hidden files never become entries.

use crate::error::BuilderError;
use globset::{Glob, GlobSetBuilder};
use gqlb_core::normalize_path_buf;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Directories never walked for entries.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", ".git"];

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Absolute, normalized root of the project.
pub fn absolute_root(root: &Path) -> Result<PathBuf, BuilderError> {
    let abs = std::path::absolute(root)
        .map_err(|e| BuilderError::InvalidPath(format!("{}: {}", root.display(), e)))?;
    Ok(normalize_path_buf(&abs))
}

/// Expand `patterns` into entry files, in pattern order then path order,
/// without duplicates.
pub fn resolve_entries(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, BuilderError> {
    let root = absolute_root(root)?;
    let mut entries: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let matched = if is_glob(pattern) {
            expand_glob(&root, pattern)?
        } else {
            let path = normalize_path_buf(&root.join(pattern));
            if path.is_file() { vec![path] } else { Vec::new() }
        };
        if matched.is_empty() {
            return Err(BuilderError::EntryNotFound(pattern.clone()));
        }
        tracing::debug!("Entry pattern '{}' matched {} file(s)", pattern, matched.len());
        for path in matched {
            if !entries.contains(&path) {
                entries.push(path);
            }
        }
    }

    Ok(entries)
}

fn expand_glob(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, BuilderError> {
    let pattern = pattern.trim_start_matches("./");
    let glob = Glob::new(pattern)
        .map_err(|e| BuilderError::InvalidPath(format!("invalid glob '{}': {}", pattern, e)))?;
    let mut builder = GlobSetBuilder::new();
    builder.add(glob);
    let set = builder
        .build()
        .map_err(|e| BuilderError::InvalidPath(format!("invalid glob '{}': {}", pattern, e)))?;

    let walker = WalkBuilder::new(root)
        .require_git(false)
        .filter_entry(|entry| {
            !entry
                .file_name()
                .to_str()
                .is_some_and(|name| SKIPPED_DIRS.contains(&name))
        })
        .build();

    let mut matched = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable path while expanding '{}': {}", pattern, e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if set.is_match(&relative) {
            matched.push(normalize_path_buf(entry.path()));
        }
    }
    matched.sort();
    Ok(matched)
}
