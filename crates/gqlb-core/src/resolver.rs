//! Module specifier resolution
//!
//! Only relative specifiers (`./x`, `../x`) are followed. Everything else is
//! an external boundary left to the runtime element library.

use crate::canonical::normalize_path;
use std::path::{Path, PathBuf};

/// Suffixes tried, in order, after joining a relative specifier to the
/// importing file's directory.
pub const CANDIDATE_SUFFIXES: &[&str] = &[
    "",
    ".ts",
    ".tsx",
    ".js",
    ".jsx",
    "/index.ts",
    "/index.tsx",
];

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Normalized absolute path of the target module.
    Resolved(PathBuf),
    /// Bare or package specifier; not part of the canonical graph.
    External,
    /// Relative specifier with no matching file.
    Unresolved { tried: Vec<PathBuf> },
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(path) => Some(path),
            _ => None,
        }
    }
}

pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Resolve `specifier` as written in `from_file`.
///
/// `exists` decides whether a candidate path is a module: the filesystem
/// during discovery, the analyzed module set when building the graph.
pub fn resolve_specifier(
    from_file: &Path,
    specifier: &str,
    exists: impl Fn(&Path) -> bool,
) -> Resolution {
    if !is_relative_specifier(specifier) {
        return Resolution::External;
    }

    let from_dir = from_file
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = normalize_path(&format!("{}/{}", from_dir, specifier));

    let mut tried = Vec::with_capacity(CANDIDATE_SUFFIXES.len());
    for suffix in CANDIDATE_SUFFIXES {
        let candidate = PathBuf::from(format!("{}{}", base, suffix));
        if exists(&candidate) {
            return Resolution::Resolved(candidate);
        }
        tried.push(candidate);
    }

    Resolution::Unresolved { tried }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn existing(files: &[&str]) -> impl Fn(&Path) -> bool {
        let set: HashSet<PathBuf> = files.iter().map(PathBuf::from).collect();
        move |p: &Path| set.contains(p)
    }

    #[test]
    fn test_resolve_with_extension_order() {
        let exists = existing(&["/src/user.tsx", "/src/user.js"]);
        let res = resolve_specifier(Path::new("/src/page.ts"), "./user", exists);
        assert_eq!(res, Resolution::Resolved(PathBuf::from("/src/user.tsx")));
    }

    #[test]
    fn test_exact_path_wins() {
        let exists = existing(&["/src/user.ts", "/src/user.ts.ts"]);
        let res = resolve_specifier(Path::new("/src/page.ts"), "./user.ts", exists);
        assert_eq!(res, Resolution::Resolved(PathBuf::from("/src/user.ts")));
    }

    #[test]
    fn test_resolve_index_file() {
        let exists = existing(&["/src/models/index.tsx"]);
        let res = resolve_specifier(Path::new("/src/page.ts"), "./models", exists);
        assert_eq!(res, Resolution::Resolved(PathBuf::from("/src/models/index.tsx")));
    }

    #[test]
    fn test_resolve_parent_directory() {
        let exists = existing(&["/src/shared.ts"]);
        let res = resolve_specifier(Path::new("/src/nested/deep.ts"), "../shared", exists);
        assert_eq!(res, Resolution::Resolved(PathBuf::from("/src/shared.ts")));
    }

    #[test]
    fn test_bare_specifier_is_external() {
        let exists = existing(&[]);
        let res = resolve_specifier(Path::new("/src/page.ts"), "@/graphql-system", exists);
        assert_eq!(res, Resolution::External);
    }

    #[test]
    fn test_unresolved_lists_candidates() {
        let exists = existing(&[]);
        match resolve_specifier(Path::new("/src/page.ts"), "./missing", exists) {
            Resolution::Unresolved { tried } => {
                assert_eq!(tried.len(), CANDIDATE_SUFFIXES.len());
                assert_eq!(tried[0], PathBuf::from("/src/missing"));
                assert_eq!(tried[6], PathBuf::from("/src/missing/index.tsx"));
            }
            other => panic!("expected unresolved, got {:?}", other),
        }
    }
}
