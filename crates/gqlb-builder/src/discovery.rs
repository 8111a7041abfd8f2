//! Discovery pipeline
//!
//! Breadth-first traversal from the entry files through relative imports and
//! re-exports. Each frontier is stat'ed, read and analyzed concurrently, then
//! folded into the module set in frontier order, so the result is independent
//! of task completion order. The analyzer runs at most once per distinct
//! normalized path.

use crate::error::BuilderError;
use futures_util::future::join_all;
use gqlb_analyzer::{FileType, ModuleAnalyzer};
use gqlb_core::{
    content_hash, create_canonical_id, mtime_ms, normalize_path_buf, resolve_specifier,
    CacheStats, CanonicalId, Diagnostic, ModuleAnalysis, ModuleCache, ModuleSet, Resolution,
    SourceLocation,
};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub struct DiscoveryResult {
    pub modules: ModuleSet,
    pub stats: CacheStats,
}

/// Where one file's analysis came from.
enum Lookup {
    Cached(ModuleAnalysis),
    Read { mtime: u64, source: String },
    /// Not valid UTF-8; recorded as a module with one error diagnostic.
    Undecodable { mtime: u64, hash: String, message: String },
}

pub struct DiscoveryPipeline<A: ModuleAnalyzer + 'static> {
    analyzer: Arc<A>,
    cache: Arc<ModuleCache>,
}

impl<A: ModuleAnalyzer + 'static> DiscoveryPipeline<A> {
    pub fn new(analyzer: Arc<A>, cache: Arc<ModuleCache>) -> Self {
        DiscoveryPipeline { analyzer, cache }
    }

    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    /// Discover every module reachable from `entries` (absolute paths).
    pub async fn discover(&self, entries: &[PathBuf]) -> Result<DiscoveryResult, BuilderError> {
        self.cache.reset_stats();

        let mut seen: FxHashSet<PathBuf> = FxHashSet::default();
        let mut frontier: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = normalize_path_buf(entry);
            if seen.insert(path.clone()) {
                frontier.push(path);
            }
        }

        let mut modules = ModuleSet::new();
        let mut depth = 0usize;
        while !frontier.is_empty() {
            tracing::debug!("Discovery frontier {}: {} file(s)", depth, frontier.len());
            let analyses = self.analyze_frontier(&frontier).await?;

            let mut next = Vec::new();
            for (path, mut analysis) in frontier.into_iter().zip(analyses) {
                for specifier in analysis.specifiers().into_iter().map(str::to_string).collect::<Vec<_>>() {
                    match resolve_specifier(&path, &specifier, |p| p.is_file()) {
                        Resolution::Resolved(target) => {
                            let target = normalize_path_buf(&target);
                            if FileType::from_path(&target).is_some() && seen.insert(target.clone()) {
                                next.push(target);
                            }
                        }
                        Resolution::Unresolved { .. } => {
                            tracing::warn!("{}: cannot resolve '{}'", path.display(), specifier);
                            analysis.diagnostics.push(Diagnostic::warning(
                                format!("Cannot resolve module '{}'", specifier),
                                SourceLocation { line: 1, column: 1 },
                            ));
                        }
                        Resolution::External => {}
                    }
                }
                if analysis.has_errors() {
                    tracing::warn!(
                        "{}: {} error diagnostic(s)",
                        path.display(),
                        analysis.diagnostics.len()
                    );
                }
                modules.insert(path, analysis);
            }
            frontier = next;
            depth += 1;
        }

        let pruned = self.cache.retain(|path| modules.contains_key(path));
        if pruned > 0 {
            tracing::debug!("Pruned {} stale cache entries", pruned);
        }

        let stats = self.cache.stats();
        tracing::info!(
            "Discovered {} module(s) (cache: {} hit, {} touched, {} analyzed)",
            modules.len(),
            stats.hits,
            stats.touched,
            stats.misses
        );
        Ok(DiscoveryResult { modules, stats })
    }

    /// Analyses for one frontier, in frontier order.
    async fn analyze_frontier(&self, frontier: &[PathBuf]) -> Result<Vec<ModuleAnalysis>, BuilderError> {
        let lookups = join_all(frontier.iter().map(|path| self.lookup(path))).await;

        let mut results: Vec<Option<ModuleAnalysis>> = Vec::with_capacity(frontier.len());
        let mut pending = Vec::new();
        for (index, (path, lookup)) in frontier.iter().zip(lookups).enumerate() {
            match lookup? {
                Lookup::Cached(analysis) => results.push(Some(analysis)),
                Lookup::Undecodable { mtime, hash, message } => {
                    tracing::warn!("{}", message);
                    let analysis = failed_analysis(path, message);
                    self.cache.store(path, mtime, hash, Vec::new(), analysis.clone());
                    results.push(Some(analysis));
                }
                Lookup::Read { mtime, source } => {
                    results.push(None);
                    let analyzer = self.analyzer.clone();
                    let path = path.clone();
                    pending.push(async move {
                        let task_path = path.clone();
                        let hash = content_hash(&source);
                        let joined = tokio::task::spawn_blocking(move || {
                            analyzer.analyze(&task_path, &source)
                        })
                        .await;
                        (index, path, mtime, hash, joined)
                    });
                }
            }
        }

        for (index, path, mtime, hash, joined) in join_all(pending).await {
            let analysis = match joined {
                Ok(Ok(analysis)) => analysis,
                Ok(Err(e)) => {
                    tracing::warn!("Analyzer failed on {}: {}", path.display(), e);
                    failed_analysis(&path, e.to_string())
                }
                Err(e) => {
                    return Err(BuilderError::DiscoveryIo {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    })
                }
            };
            self.cache
                .store(&path, mtime, hash, derived_canonical_ids(&path, &analysis), analysis.clone());
            tracing::debug!("Analyzed {}", path.display());
            results[index] = Some(analysis);
        }

        Ok(results
            .into_iter()
            .zip(frontier)
            .map(|(analysis, path)| analysis.unwrap_or_else(|| ModuleAnalysis::new(path.clone())))
            .collect())
    }

    /// mtime pre-check, then read and content-hash check.
    async fn lookup(&self, path: &Path) -> Result<Lookup, BuilderError> {
        let io_err = |source| BuilderError::DiscoveryIo {
            path: path.to_path_buf(),
            source,
        };
        let meta = tokio::fs::metadata(path).await.map_err(io_err)?;
        let mtime = mtime_ms(&meta);
        if let Some(analysis) = self.cache.check_mtime(path, mtime) {
            return Ok(Lookup::Cached(analysis));
        }

        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        let source = match String::from_utf8(bytes) {
            Ok(source) => source,
            Err(e) => {
                let message = format!("Cannot decode {} as UTF-8: {}", path.display(), e.utf8_error());
                let hash = content_hash(&String::from_utf8_lossy(e.as_bytes()));
                if let Some(analysis) = self.cache.check_content(path, mtime, &hash) {
                    return Ok(Lookup::Cached(analysis));
                }
                return Ok(Lookup::Undecodable { mtime, hash, message });
            }
        };
        if let Some(analysis) = self.cache.check_content(path, mtime, &content_hash(&source)) {
            return Ok(Lookup::Cached(analysis));
        }
        Ok(Lookup::Read { mtime, source })
    }
}

/// Analysis of a module that could not be read or analyzed.
fn failed_analysis(path: &Path, message: String) -> ModuleAnalysis {
    let mut analysis = ModuleAnalysis::new(path.to_path_buf());
    analysis
        .diagnostics
        .push(Diagnostic::error(message, SourceLocation { line: 1, column: 1 }));
    analysis
}

fn derived_canonical_ids(path: &Path, analysis: &ModuleAnalysis) -> Vec<CanonicalId> {
    analysis
        .definitions
        .iter()
        .filter_map(|d| create_canonical_id(path, &d.ast_path).ok())
        .collect()
}
