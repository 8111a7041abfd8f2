//! Build session: the pipeline from entry patterns to a written artifact
//!
//! Stages run one after another: entries → discovery → dependency graph →
//! intermediate modules → evaluation → artifact. Only discovery does
//! concurrent I/O. A failing stage aborts the build before anything is
//! written, so the previous artifact stays in place.

use crate::artifact::{build_artifact, write_artifact, BuilderArtifact};
use crate::artifact_cache::ArtifactCache;
use crate::config::{schema_hash, BuilderConfig};
use crate::discovery::DiscoveryPipeline;
use crate::entries::{absolute_root, resolve_entries};
use crate::error::BuilderError;
use crate::evaluator::{evaluate_modules, SandboxEvaluator};
use crate::intermediate::{build_intermediate_modules, IntermediateCache, IntermediateModule};
use crate::registry::Registry;
use gqlb_analyzer::syntax::SourceParser;
use gqlb_analyzer::{create_parser_pool, ModuleAnalyzer, ParserPool, TreeSitterAnalyzer};
use gqlb_core::{
    build_dependency_graph, CacheError, CacheStats, DependencyGraph, ModuleCache, ModuleSet,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Caches owned by one session. Nothing is process-global, so independent
/// sessions can build side by side.
#[derive(Debug)]
pub struct BuildCaches {
    pub modules: Arc<ModuleCache>,
    pub intermediate: Arc<IntermediateCache>,
    pub artifacts: Arc<ArtifactCache>,
    cache_dir: Option<PathBuf>,
}

impl BuildCaches {
    /// Load the persisted module cache from `cache_dir`, or start cold and
    /// in-memory only when `cache_dir` is `None`.
    pub fn create(cache_dir: Option<PathBuf>, version: &str) -> Self {
        let modules = match &cache_dir {
            Some(dir) => ModuleCache::load(dir, version),
            None => ModuleCache::new(version),
        };
        BuildCaches {
            modules: Arc::new(modules),
            intermediate: Arc::new(IntermediateCache::new()),
            artifacts: Arc::new(ArtifactCache::new()),
            cache_dir,
        }
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Persist the module cache and release everything.
    pub fn dispose(self) -> Result<(), CacheError> {
        if let Some(dir) = &self.cache_dir {
            self.modules.save(dir)?;
        }
        Ok(())
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutcome {
    pub artifact: BuilderArtifact,
    pub out_path: PathBuf,
    pub schema_hash: String,
    pub modules: usize,
    pub units: usize,
    pub discovery: CacheStats,
}

pub struct BuildSession<A: ModuleAnalyzer + 'static> {
    config: BuilderConfig,
    analyzer: Arc<A>,
    parser: SourceParser,
    caches: BuildCaches,
}

impl BuildSession<TreeSitterAnalyzer> {
    pub fn with_default_analyzer(config: BuilderConfig) -> Self {
        let pool = create_parser_pool();
        let analyzer = TreeSitterAnalyzer::new(pool.clone());
        BuildSession::new(config, analyzer, pool)
    }
}

impl<A: ModuleAnalyzer + 'static> BuildSession<A> {
    pub fn new(config: BuilderConfig, analyzer: A, parser_pool: ParserPool) -> Self {
        let cache_dir = config.use_cache.then(|| config.resolved_cache_dir());
        let caches = BuildCaches::create(cache_dir, analyzer.version());
        BuildSession {
            config,
            analyzer: Arc::new(analyzer),
            parser: SourceParser::new(parser_pool),
            caches,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn caches(&self) -> &BuildCaches {
        &self.caches
    }

    pub async fn build(&self) -> Result<BuildOutcome, BuilderError> {
        let started = Instant::now();
        let config = &self.config;
        tracing::info!(
            "Building {} entry pattern(s) in {} mode",
            config.entries.len(),
            config.mode.as_str()
        );

        let schema_path = config.schema_path.as_ref().map(|p| config.resolve(p));
        let schema_hash = schema_hash(schema_path.as_deref()).map_err(|e| {
            BuilderError::InvalidPath(format!(
                "schema {}: {}",
                schema_path.as_deref().unwrap_or(Path::new("")).display(),
                e
            ))
        })?;

        let root = absolute_root(&config.root)?;
        let entries = resolve_entries(&root, &config.entries)?;

        let pipeline = DiscoveryPipeline::new(self.analyzer.clone(), self.caches.modules.clone());
        let discovered = pipeline.discover(&entries).await?;

        let graph = build_dependency_graph(&discovered.modules)?;
        tracing::info!(
            "Dependency graph: {} node(s), {} edge(s)",
            graph.len(),
            graph.edge_count()
        );

        let units = build_intermediate_modules(&graph, &self.parser, &self.caches.intermediate)?;
        if let Some(dir) = &config.debug_dir {
            write_debug_units(&config.resolve(dir), &units)?;
        }

        let registry = self.evaluate(&units)?;
        let warnings = collect_warnings(&discovered.modules);
        let duration_ms = started.elapsed().as_millis() as u64;
        let artifact = build_artifact(&registry, config.mode, warnings, duration_ms)?;

        let out_path = config.resolved_out_path();
        write_artifact(&out_path, &artifact)?;
        self.caches.artifacts.invalidate(&out_path);

        tracing::info!(
            "Built {} element(s), {} document(s) in {} ms",
            registry.len(),
            artifact.documents.len(),
            duration_ms
        );
        Ok(BuildOutcome {
            artifact,
            out_path,
            schema_hash,
            modules: discovered.modules.len(),
            units: units.len(),
            discovery: discovered.stats,
        })
    }

    /// Run every unit in one sandbox, in order.
    fn evaluate(&self, units: &[IntermediateModule]) -> Result<Registry, BuilderError> {
        let mut evaluator = SandboxEvaluator::new(self.config.schemas.clone());
        let mut registry = Registry::new();
        evaluate_modules(&mut evaluator, units, &mut registry)?;
        Ok(registry)
    }

    /// Graph of the current tree without evaluating anything.
    pub async fn graph(&self) -> Result<DependencyGraph, BuilderError> {
        let root = absolute_root(&self.config.root)?;
        let entries = resolve_entries(&root, &self.config.entries)?;
        let pipeline = DiscoveryPipeline::new(self.analyzer.clone(), self.caches.modules.clone());
        let discovered = pipeline.discover(&entries).await?;
        Ok(build_dependency_graph(&discovered.modules)?)
    }

    pub fn dispose(self) -> Result<(), CacheError> {
        self.caches.dispose()
    }
}

/// Module diagnostics as `path:line:column: message`, in discovery order.
fn collect_warnings(modules: &ModuleSet) -> Vec<String> {
    modules
        .iter()
        .flat_map(|(path, analysis)| {
            analysis.diagnostics.iter().map(move |d| {
                format!(
                    "{}:{}:{}: {}",
                    path.display(),
                    d.loc.line,
                    d.loc.column,
                    d.message
                )
            })
        })
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugUnit<'a> {
    file_path: &'a str,
    canonical_ids: Vec<&'a str>,
    content_hash: &'a str,
    source: String,
    transpiled: String,
}

/// Dump every unit's code under `dir` for inspection.
fn write_debug_units(dir: &Path, units: &[IntermediateModule]) -> Result<(), BuilderError> {
    let write_failed = |path: &Path, source| BuilderError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(|e| write_failed(dir, e))?;

    let mut index = Vec::with_capacity(units.len());
    for (i, unit) in units.iter().enumerate() {
        let stem = Path::new(&unit.file_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unit".to_string());
        let source = format!("{:03}-{}.ts", i, stem);
        let transpiled = format!("{:03}-{}.js", i, stem);
        for (name, code) in [(&source, &unit.source_code), (&transpiled, &unit.transpiled_code)] {
            let path = dir.join(name);
            std::fs::write(&path, code).map_err(|e| write_failed(&path, e))?;
        }
        index.push(DebugUnit {
            file_path: &unit.file_path,
            canonical_ids: unit.canonical_ids.iter().map(|id| id.as_str()).collect(),
            content_hash: &unit.content_hash,
            source,
            transpiled,
        });
    }

    let path = dir.join("units.json");
    let json = serde_json::to_string_pretty(&index)
        .map_err(|e| write_failed(&path, std::io::Error::other(e)))?;
    std::fs::write(&path, json).map_err(|e| write_failed(&path, e))?;
    tracing::debug!("Wrote {} debug unit(s) to {}", units.len(), dir.display());
    Ok(())
}
