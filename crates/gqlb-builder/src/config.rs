//! Build configuration

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Default cache directory, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".gqlb";

/// Schema hash used when no schema file is configured.
pub const NO_SCHEMA: &str = "none";

/// How much of each element the artifact carries in `refMap`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    /// Identity metadata only; elements are rebuilt by the runtime.
    #[default]
    Runtime,
    /// Full prebuild so a compile-time transformer can inline elements.
    ZeroRuntime,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Runtime => "runtime",
            BuildMode::ZeroRuntime => "zero-runtime",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderConfig {
    /// Entry files or glob patterns, relative to `root`.
    pub entries: Vec<String>,
    pub out_path: PathBuf,
    #[serde(default)]
    pub mode: BuildMode,
    /// Schema names reachable as `gql.<name>`.
    #[serde(default = "default_schemas")]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_schemas() -> Vec<String> {
    vec!["default".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl BuilderConfig {
    pub fn new(root: impl Into<PathBuf>, entries: Vec<String>, out_path: impl Into<PathBuf>) -> Self {
        BuilderConfig {
            entries,
            out_path: out_path.into(),
            mode: BuildMode::default(),
            schemas: default_schemas(),
            schema_path: None,
            cache_dir: None,
            debug_dir: None,
            use_cache: true,
            root: root.into(),
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// `path` resolved against `root` unless already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn resolved_cache_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => self.resolve(dir),
            None => self.root.join(DEFAULT_CACHE_DIR),
        }
    }

    pub fn resolved_out_path(&self) -> PathBuf {
        self.resolve(&self.out_path)
    }
}

/// SHA-256 of the schema file, or [`NO_SCHEMA`] when none is given.
pub fn schema_hash(schema_path: Option<&Path>) -> std::io::Result<String> {
    match schema_path {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            Ok(hex::encode(Sha256::digest(&bytes)))
        }
        None => Ok(NO_SCHEMA.to_string()),
    }
}
