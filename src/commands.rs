//! CLI command implementations

use crate::Format;
use anyhow::Context;
use gqlb_builder::config::DEFAULT_CACHE_DIR;
use gqlb_builder::{
    schema_hash, ArtifactCache, ArtifactLoadError, BuildMode, BuildSession, BuilderArtifact,
    BuilderConfig, BuilderError,
};
use std::path::{Path, PathBuf};

pub struct BuildArgs {
    pub root: PathBuf,
    pub entries: Vec<String>,
    pub out: PathBuf,
    pub mode: BuildMode,
    pub debug_dir: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub use_cache: bool,
}

pub async fn build(args: BuildArgs, format: Format) -> anyhow::Result<()> {
    let mut config = BuilderConfig::new(args.root, args.entries, args.out).with_mode(args.mode);
    config.debug_dir = args.debug_dir;
    config.schema_path = args.schema;
    config.cache_dir = args.cache_dir;
    config.use_cache = args.use_cache;
    tracing::info!("Project root: {}", config.root.display());

    let session = BuildSession::with_default_analyzer(config);
    let result = session.build().await;
    if let Err(e) = session.dispose() {
        tracing::warn!("Failed to save build cache: {}", e);
    }
    let outcome = result?;

    let report = &outcome.artifact.report;
    match format {
        Format::Human => {
            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
            println!(
                "Built {} document(s), {} model(s), {} slice(s) from {} module(s) in {} ms -> {}",
                report.documents,
                report.models,
                report.slices,
                outcome.modules,
                report.duration_ms,
                outcome.out_path.display()
            )
        }
        Format::Json => println!(
            "{}",
            serde_json::json!({
                "outPath": outcome.out_path,
                "schemaHash": outcome.schema_hash,
                "report": report,
                "cache": {
                    "hits": outcome.discovery.hits,
                    "touched": outcome.discovery.touched,
                    "misses": outcome.discovery.misses,
                },
            })
        ),
    }
    Ok(())
}

pub fn inspect(root: &Path, artifact: &Path, schema: Option<&Path>) -> anyhow::Result<()> {
    let schema = schema.map(|s| root.join(s));
    let hash = schema_hash(schema.as_deref())
        .with_context(|| format!("Cannot read schema {}", schema.as_deref().unwrap_or(root).display()))?;
    let artifact = ArtifactCache::new().load(&root.join(artifact), &hash)?;
    print_summary(&artifact);
    Ok(())
}

fn print_summary(artifact: &BuilderArtifact) {
    let report = &artifact.report;
    println!(
        "{} document(s), {} model(s), {} slice(s), {} operation(s), built in {} ms",
        report.documents, report.models, report.slices, report.operations, report.duration_ms
    );
    for (name, document) in &artifact.documents {
        println!(
            "  {} ({} variable(s)){}",
            name,
            document.variables.len(),
            document
                .source_path
                .as_deref()
                .map(|p| format!(" from {}", p))
                .unwrap_or_default()
        );
    }
    for (id, entry) in &artifact.ref_map {
        println!("  {} {}", entry.kind, id);
    }
}

pub fn clear(root: &Path, cache_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = root.join(cache_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)));
    tracing::info!("Clearing build cache in {}", dir.display());
    gqlb_core::cache::clear_cache_dir(&dir)
        .with_context(|| format!("Cannot clear {}", dir.display()))?;
    tracing::info!("Build cache cleared");
    Ok(())
}

/// One `CODE: message` line on stderr, or a JSON object in json format.
pub fn report_error(error: &anyhow::Error, format: Format) {
    let code = if let Some(e) = error.downcast_ref::<BuilderError>() {
        e.full_code()
    } else if let Some(e) = error.downcast_ref::<ArtifactLoadError>() {
        e.code().to_string()
    } else {
        "ERROR".to_string()
    };
    match format {
        Format::Human => eprintln!("{}: {:#}", code, error),
        Format::Json => eprintln!(
            "{}",
            serde_json::json!({ "code": code, "message": format!("{:#}", error) })
        ),
    }
}
