//! gqlb builder: discovery, intermediate modules, sandboxed evaluation and the build artifact

pub mod artifact;
pub mod artifact_cache;
pub mod config;
pub mod discovery;
pub mod entries;
pub mod error;
pub mod evaluator;
pub mod intermediate;
pub mod registry;
pub mod session;

#[cfg(test)]
mod tests;

pub use artifact::{BuildReport, BuilderArtifact, DocumentEntry, RefMapEntry, RefMetadata, RefTree};
pub use artifact_cache::{ArtifactCache, ArtifactCacheEntry, ArtifactCacheStats};
pub use config::{schema_hash, BuildMode, BuilderConfig};
pub use discovery::{DiscoveryPipeline, DiscoveryResult};
pub use error::{ArtifactLoadError, BuilderError};
pub use evaluator::{evaluate_modules, Evaluator, SandboxEvaluator};
pub use intermediate::{IntermediateCache, IntermediateModule};
pub use registry::Registry;
pub use session::{BuildCaches, BuildOutcome, BuildSession};
