//! Canonical element identity: `<normalized absolute path>::<export path>`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Separator between the file part and the export part of a canonical id.
pub const SEPARATOR: &str = "::";

/// Errors raised while building a canonical id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalIdError {
    /// The file path is relative; ids must not depend on the working directory.
    #[error("Invalid path: '{0}' is not absolute")]
    InvalidPath(String),

    /// The export path is empty or contains the id separator.
    #[error("Invalid export path: '{0}'")]
    InvalidExportPath(String),
}

/// Unique, stable key for an element across the whole build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Parse an already-formed id (e.g. a `refMap` key read back from disk).
    pub fn parse(raw: &str) -> Option<Self> {
        let (file, export) = raw.rsplit_once(SEPARATOR)?;
        if file.is_empty() || export.is_empty() || !is_absolute(file) {
            return None;
        }
        Some(CanonicalId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The normalized absolute file path part.
    pub fn file_path(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(file, _)| file)
            .unwrap_or(&self.0)
    }

    /// The dotted export path part (e.g. `catalog.byId`).
    pub fn export_path(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(_, export)| export)
            .unwrap_or("")
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the canonical id for an export of a file.
///
/// The path must be absolute. Separators are normalized to `/` and `.`/`..`
/// segments are resolved lexically, so equivalent spellings of one path map to
/// the same id.
pub fn create_canonical_id(
    absolute_file_path: impl AsRef<Path>,
    export_path: &str,
) -> Result<CanonicalId, CanonicalIdError> {
    let raw = absolute_file_path.as_ref().to_string_lossy();
    if !is_absolute(&raw) {
        return Err(CanonicalIdError::InvalidPath(raw.into_owned()));
    }
    if export_path.is_empty() || export_path.contains(SEPARATOR) {
        return Err(CanonicalIdError::InvalidExportPath(export_path.to_string()));
    }
    Ok(CanonicalId(format!(
        "{}{}{}",
        normalize_path(&raw),
        SEPARATOR,
        export_path
    )))
}

/// Whether a path string is absolute on any supported platform
/// (`/x`, `C:\x`, `C:/x`, `\\server\share`).
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    if bytes.first().is_some_and(|b| *b == b'/' || *b == b'\\') {
        return true;
    }
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

/// Lexically normalize a path string: forward slashes, no empty or `.`
/// segments, `..` resolved against preceding segments, no trailing slash.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");

    let (prefix, rest) = if let Some(rest) = unified.strip_prefix("//") {
        ("//".to_string(), rest)
    } else if let Some(rest) = unified.strip_prefix('/') {
        ("/".to_string(), rest)
    } else if unified.len() >= 2 && unified.as_bytes()[1] == b':' && unified.as_bytes()[0].is_ascii_alphabetic() {
        let drive = unified[..2].to_ascii_uppercase();
        (format!("{}/", drive), unified[2..].trim_start_matches('/'))
    } else {
        (String::new(), unified.as_str())
    };

    let rooted = !prefix.is_empty();
    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if prefix.is_empty() && joined.is_empty() {
        ".".to_string()
    } else {
        format!("{}{}", prefix, joined)
    }
}

/// Normalize a filesystem path into a `PathBuf` with the same rules as
/// [`normalize_path`].
pub fn normalize_path_buf(path: &Path) -> PathBuf {
    PathBuf::from(normalize_path(&path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_paths_share_id() {
        let a = create_canonical_id("/src/app/user.ts", "userModel").unwrap();
        let b = create_canonical_id("/src//app/./lib/../user.ts", "userModel").unwrap();
        let c = create_canonical_id("/src/app/user.ts/", "userModel").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.as_str(), "/src/app/user.ts::userModel");
    }

    #[test]
    fn test_windows_separators_normalized() {
        let id = create_canonical_id("C:\\work\\app\\user.ts", "userModel").unwrap();
        assert_eq!(id.as_str(), "C:/work/app/user.ts::userModel");
        assert_eq!(id.file_path(), "C:/work/app/user.ts");
    }

    #[test]
    fn test_relative_path_rejected() {
        let result = create_canonical_id("src/user.ts", "userModel");
        assert_eq!(
            result,
            Err(CanonicalIdError::InvalidPath("src/user.ts".to_string()))
        );
        assert!(create_canonical_id("./user.ts", "x").is_err());
    }

    #[test]
    fn test_nested_export_path() {
        let id = create_canonical_id("/src/catalog.ts", "catalog.byId").unwrap();
        assert_eq!(id.export_path(), "catalog.byId");
        assert_eq!(id.file_path(), "/src/catalog.ts");
    }

    #[test]
    fn test_invalid_export_path() {
        assert!(create_canonical_id("/a.ts", "").is_err());
        assert!(create_canonical_id("/a.ts", "x::y").is_err());
    }

    #[test]
    fn test_parse_round_trips_display() {
        let id = create_canonical_id("/a/b.ts", "x.y").unwrap();
        assert_eq!(CanonicalId::parse(&id.to_string()), Some(id));
        assert_eq!(CanonicalId::parse("relative.ts::x"), None);
        assert_eq!(CanonicalId::parse("/no-separator.ts"), None);
    }

    #[test]
    fn test_normalize_relative_keeps_leading_parents() {
        assert_eq!(normalize_path("../a/./b/../c"), "../a/c");
        assert_eq!(normalize_path("./"), ".");
        assert_eq!(normalize_path("/.."), "/");
    }
}
