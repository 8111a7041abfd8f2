//! Per-file module cache for discovery
//!
//! An entry is valid when the file's mtime matches (hit, no read), or when
//! the content hash matches after a read (touch). The cache is shared by the
//! concurrent discovery tasks of one session, so entries live in a `DashMap`.

use crate::canonical::CanonicalId;
use crate::error::CacheError;
use crate::model::ModuleAnalysis;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::UNIX_EPOCH;

/// File name of the persisted cache inside the cache directory.
pub const BUILD_CACHE_FILE: &str = "build-cache.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCacheEntry {
    pub mtime_ms: u64,
    pub content_hash: String,
    pub derived_canonical_ids: Vec<CanonicalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ModuleAnalysis>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: String,
    entries: BTreeMap<String, ModuleCacheEntry>,
}

/// Counters for one discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub touched: usize,
    pub misses: usize,
}

#[derive(Debug)]
pub struct ModuleCache {
    version: String,
    entries: DashMap<PathBuf, ModuleCacheEntry>,
    hits: AtomicUsize,
    touched: AtomicUsize,
    misses: AtomicUsize,
}

impl ModuleCache {
    /// Empty cache for analyses produced by analyzer `version`.
    pub fn new(version: impl Into<String>) -> Self {
        ModuleCache {
            version: version.into(),
            entries: DashMap::new(),
            hits: AtomicUsize::new(0),
            touched: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Load `<cache_dir>/build-cache.json`. A missing, unreadable or
    /// version-mismatched file yields a cold cache.
    pub fn load(cache_dir: &Path, version: impl Into<String>) -> Self {
        let cache = ModuleCache::new(version);
        let path = cache_dir.join(BUILD_CACHE_FILE);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(_) => return cache,
        };
        let file: CacheFile = match serde_json::from_str(&json) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Ignoring corrupt build cache {}: {}", path.display(), e);
                return cache;
            }
        };
        if file.version != cache.version {
            tracing::debug!(
                "Build cache version {} != {}; starting cold",
                file.version,
                cache.version
            );
            return cache;
        }
        for (key, entry) in file.entries {
            cache.entries.insert(PathBuf::from(key), entry);
        }
        tracing::debug!("Build cache loaded: {} entries", cache.entries.len());
        cache
    }

    /// Persist all entries to `<cache_dir>/build-cache.json`, sorted by path.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir)?;
        let entries: BTreeMap<String, ModuleCacheEntry> = self
            .entries
            .iter()
            .map(|e| (e.key().to_string_lossy().into_owned(), e.value().clone()))
            .collect();
        let file = CacheFile {
            version: self.version.clone(),
            entries,
        };
        let json = serde_json::to_string(&file)?;
        let path = cache_dir.join(BUILD_CACHE_FILE);
        let tmp = cache_dir.join(format!("{}.tmp", BUILD_CACHE_FILE));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!("Build cache saved: {}", path.display());
        Ok(())
    }

    /// Cheap pre-check: same mtime means the stored analysis is reused
    /// without reading the file.
    pub fn check_mtime(&self, path: &Path, mtime_ms: u64) -> Option<ModuleAnalysis> {
        let entry = self.entries.get(path)?;
        if entry.mtime_ms != mtime_ms {
            return None;
        }
        let analysis = entry.analysis.clone()?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(analysis)
    }

    /// After a read: same content hash refreshes the entry's mtime and
    /// reuses the analysis.
    pub fn check_content(
        &self,
        path: &Path,
        mtime_ms: u64,
        content_hash: &str,
    ) -> Option<ModuleAnalysis> {
        let mut entry = self.entries.get_mut(path)?;
        if entry.content_hash != content_hash {
            return None;
        }
        let analysis = entry.analysis.clone()?;
        entry.mtime_ms = mtime_ms;
        self.touched.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Touched {}", path.display());
        Some(analysis)
    }

    /// Record a fresh analysis.
    pub fn store(
        &self,
        path: &Path,
        mtime_ms: u64,
        content_hash: String,
        derived_canonical_ids: Vec<CanonicalId>,
        analysis: ModuleAnalysis,
    ) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            path.to_path_buf(),
            ModuleCacheEntry {
                mtime_ms,
                content_hash,
                derived_canonical_ids,
                analysis: Some(analysis),
            },
        );
    }

    pub fn entry(&self, path: &Path) -> Option<ModuleCacheEntry> {
        self.entries.get(path).map(|e| e.value().clone())
    }

    pub fn invalidate(&self, path: &Path) {
        self.entries.remove(path);
    }

    /// Drop every entry whose path fails `keep`. Returns how many went.
    pub fn retain(&self, keep: impl Fn(&Path) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| keep(path.as_path()));
        before - self.entries.len()
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

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            touched: self.touched.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.touched.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Fast non-cryptographic content hash (FxHash, 16 hex digits).
pub fn content_hash(source: &str) -> String {
    let mut hasher = FxHasher::default();
    source.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Modification time in whole milliseconds since the epoch, 0 if unknown.
pub fn mtime_ms(meta: &std::fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Remove the persisted cache file, if any.
pub fn clear_cache_dir(cache_dir: &Path) -> std::io::Result<()> {
    let path = cache_dir.join(BUILD_CACHE_FILE);
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}
