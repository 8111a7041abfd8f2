//! In-memory cache of loaded artifacts
//!
//! Keyed by `(resolved path, schema hash)`. A load is served from the cache
//! when the file's mtime is within [`MTIME_TOLERANCE_MS`] of the cached one;
//! otherwise the file is read and its SHA-256 compared, and only a changed
//! file is parsed and validated again.

use crate::artifact::{parse_artifact, BuilderArtifact};
use crate::error::ArtifactLoadError;
use dashmap::DashMap;
use gqlb_core::{mtime_ms, normalize_path_buf};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MTIME_TOLERANCE_MS: u64 = 2;

#[derive(Debug, Clone)]
pub struct ArtifactCacheEntry {
    pub artifact: Arc<BuilderArtifact>,
    pub content_hash: String,
    pub schema_hash: String,
    pub mtime_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactCacheStats {
    pub hits: usize,
    pub touched: usize,
    pub parses: usize,
}

#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: DashMap<(PathBuf, String), ArtifactCacheEntry>,
    hits: AtomicUsize,
    touched: AtomicUsize,
    parses: AtomicUsize,
}

impl ArtifactCache {
    pub fn new() -> Self {
        ArtifactCache::default()
    }

    pub fn load(
        &self,
        path: &Path,
        schema_hash: &str,
    ) -> Result<Arc<BuilderArtifact>, ArtifactLoadError> {
        let resolved = resolve(path);
        let not_found = |_| ArtifactLoadError::NotFound(resolved.clone());
        let meta = std::fs::metadata(&resolved).map_err(not_found)?;
        let mtime = mtime_ms(&meta);
        let key = (resolved.clone(), schema_hash.to_string());

        if let Some(entry) = self.entries.get(&key) {
            if entry.mtime_ms.abs_diff(mtime) <= MTIME_TOLERANCE_MS {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.artifact.clone());
            }
        }

        let bytes = std::fs::read(&resolved).map_err(not_found)?;
        let hash = hex::encode(Sha256::digest(&bytes));

        if let Some(mut entry) = self.entries.get_mut(&key) {
            if entry.content_hash == hash {
                entry.mtime_ms = mtime;
                self.touched.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Artifact {} touched", resolved.display());
                return Ok(entry.artifact.clone());
            }
        }

        let text = String::from_utf8_lossy(&bytes);
        let artifact = Arc::new(parse_artifact(&resolved, &text)?);
        self.parses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Artifact {} parsed and validated", resolved.display());
        self.entries.insert(
            key,
            ArtifactCacheEntry {
                artifact: artifact.clone(),
                content_hash: hash,
                schema_hash: schema_hash.to_string(),
                mtime_ms: mtime,
            },
        );
        Ok(artifact)
    }

    /// Drop every schema variant cached for `path`.
    pub fn invalidate(&self, path: &Path) {
        let resolved = resolve(path);
        self.entries.retain(|(p, _), _| *p != resolved);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> ArtifactCacheStats {
        ArtifactCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            touched: self.touched.load(Ordering::Relaxed),
            parses: self.parses.load(Ordering::Relaxed),
        }
    }
}

fn resolve(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_path_buf(&abs)
}
