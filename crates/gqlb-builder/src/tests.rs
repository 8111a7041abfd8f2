//! Unit tests for gqlb-builder

use crate::artifact::{build_artifact, parse_artifact, to_json, RefTree};
use crate::artifact_cache::ArtifactCache;
use crate::config::{BuildMode, BuilderConfig};
use crate::error::BuilderError;
use crate::evaluator::{evaluate_modules, EvalError, Evaluator, RegistryDelta, SandboxEvaluator};
use crate::intermediate::{build_intermediate_modules, IntermediateCache, IntermediateModule};
use crate::registry::Registry;
use crate::session::BuildSession;
use gqlb_analyzer::syntax::SourceParser;
use gqlb_analyzer::{ModuleAnalyzer, ParserPool, TreeSitterAnalyzer};
use gqlb_core::{
    build_dependency_graph, normalize_path, Definition, ElementKind, ModuleAnalysis, ModuleSet,
    SourceLocation,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const USER_TS: &str = r#"import { gql } from "@/graphql-system";

export const userModel = gql.default(({ model }) =>
  model.User({}, ({ f }) => [f.id(), f.name()], (raw) => raw.missing.call()));

export const userSlice = gql.default(({ query }) =>
  query.slice({ id: "ID!" }, ({ f, $ }) => [f.user({ id: $.id }, () => [userModel.fragment()])], (r) => r));
"#;

const PAGE_TS: &str = r#"import { gql } from "@/graphql-system";
import { userSlice } from "./user";

export const pageQuery = gql.default(({ query }) =>
  query.composed({ operationName: "PageQuery", variables: { userId: "ID!" } }, ({ $ }) => ({
    profile: userSlice.build({ id: $.userId }),
  })));
"#;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    dir
}

fn config(dir: &TempDir, entry: &str) -> BuilderConfig {
    let mut config = BuilderConfig::new(dir.path(), vec![entry.to_string()], "out/artifact.json");
    config.use_cache = false;
    config
}

fn file_id(dir: &TempDir, rel: &str, export: &str) -> String {
    let abs = std::path::absolute(dir.path().join(rel)).unwrap();
    format!("{}::{}", normalize_path(&abs.to_string_lossy()), export)
}

fn session(config: BuilderConfig) -> BuildSession<TreeSitterAnalyzer> {
    let pool = ParserPool::new(2);
    BuildSession::new(config, TreeSitterAnalyzer::new(pool.clone()), pool)
}

/// Analyze in-memory sources as if they lived at the given absolute paths.
fn analyze_all(files: &[(&str, &str)]) -> ModuleSet {
    let analyzer = TreeSitterAnalyzer::new(ParserPool::new(1));
    files
        .iter()
        .map(|(path, source)| {
            (
                PathBuf::from(path),
                analyzer.analyze(Path::new(path), source).unwrap(),
            )
        })
        .collect()
}

// ── Full builds ─────────────────────────────────────────

#[tokio::test]
async fn test_scenario_user_page() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let outcome = session(config(&dir, "src/page.ts")).build().await.unwrap();
    let artifact = &outcome.artifact;

    let user_model = file_id(&dir, "src/user.ts", "userModel");
    let user_slice = file_id(&dir, "src/user.ts", "userSlice");
    let page_query = file_id(&dir, "src/page.ts", "pageQuery");

    let kinds: Vec<_> = artifact
        .ref_map
        .iter()
        .map(|(id, entry)| (id.clone(), entry.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (user_model.clone(), ElementKind::Model),
            (user_slice.clone(), ElementKind::Slice),
            (page_query.clone(), ElementKind::Operation),
        ]
    );

    let document = &artifact.documents["PageQuery"];
    assert_eq!(
        document.text,
        "query PageQuery($userId: ID!) {\n  profile_user: user(id: $userId) {\n    ... on User {\n      id\n      name\n    }\n  }\n}\n"
    );
    assert_eq!(document.variables["userId"], "ID!");
    assert_eq!(artifact.report.models, 1);
    assert_eq!(artifact.report.slices, 1);
    assert_eq!(artifact.report.documents, 1);
    assert_eq!(outcome.modules, 2);
    assert_eq!(outcome.units, 2);

    assert!(outcome.out_path.is_file());
    let written = std::fs::read_to_string(&outcome.out_path).unwrap();
    assert_eq!(parse_artifact(&outcome.out_path, &written).unwrap(), *artifact);
}

#[tokio::test]
async fn test_scenario_user_page_dependencies() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let graph = session(config(&dir, "src/page.ts")).graph().await.unwrap();

    let user_model = file_id(&dir, "src/user.ts", "userModel");
    let user_slice = file_id(&dir, "src/user.ts", "userSlice");
    let deps = |id: &str| -> Vec<String> {
        let node = graph.nodes().find(|n| n.id.as_str() == id).unwrap();
        node.dependencies.iter().map(|d| d.as_str().to_string()).collect()
    };
    assert_eq!(deps(&file_id(&dir, "src/page.ts", "pageQuery")), vec![user_slice.clone()]);
    assert_eq!(deps(&user_slice), vec![user_model]);
}

#[tokio::test]
async fn test_nested_export_builds_ref_tree() {
    let dir = project(&[(
        "src/catalog.ts",
        r#"export const catalog = {
  byId: gql.default(({ query }) => query.slice({ id: "ID!" }, ({ f, $ }) => [f.product({ id: $.id }, ({ f }) => [f.id()])])),
};
"#,
    )]);
    let outcome = session(config(&dir, "src/catalog.ts")).build().await.unwrap();

    let id = file_id(&dir, "src/catalog.ts", "catalog.byId");
    let file = id.rsplit_once("::").unwrap().0.to_string();
    let RefTree::Branch(root) = &outcome.artifact.refs[&file] else {
        panic!("file root must be a branch");
    };
    let RefTree::Branch(catalog) = &root["catalog"] else {
        panic!("catalog must be a branch");
    };
    assert_eq!(catalog["byId"], RefTree::Leaf(id.clone()));
    assert!(outcome.artifact.ref_map.contains_key(&id));
}

#[tokio::test]
async fn test_builds_are_deterministic() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let first = session(config(&dir, "src/*.ts")).build().await.unwrap();
    let second = session(config(&dir, "src/*.ts")).build().await.unwrap();

    let mut a = first.artifact.clone();
    let mut b = second.artifact.clone();
    a.report.duration_ms = 0;
    b.report.duration_ms = 0;
    assert_eq!(to_json(&a).unwrap(), to_json(&b).unwrap());
}

#[tokio::test]
async fn test_zero_runtime_mode_adds_prebuild() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let runtime = session(config(&dir, "src/page.ts")).build().await.unwrap();
    let zero = session(config(&dir, "src/page.ts").with_mode(BuildMode::ZeroRuntime))
        .build()
        .await
        .unwrap();

    let id = file_id(&dir, "src/page.ts", "pageQuery");
    let plain = &runtime.artifact.ref_map[&id].metadata;
    assert_eq!(plain.operation_name.as_deref(), Some("PageQuery"));
    assert!(plain.selection.is_none() && plain.document_name.is_none());

    let full = &zero.artifact.ref_map[&id].metadata;
    assert_eq!(full.document_name.as_deref(), Some("PageQuery"));
    assert!(full.selection.as_deref().unwrap().contains("profile_user: user(id: $userId)"));
    assert_eq!(runtime.artifact.documents, zero.artifact.documents);
}

#[tokio::test]
async fn test_touch_reuses_cached_analysis() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let mut cfg = config(&dir, "src/page.ts");
    cfg.use_cache = true;

    let cold = session(cfg.clone());
    let first = cold.build().await.unwrap();
    assert_eq!(first.discovery.misses, 2);
    cold.dispose().unwrap();

    let file = std::fs::File::options()
        .write(true)
        .open(dir.path().join("src/user.ts"))
        .unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
    drop(file);

    let warm = session(cfg);
    let second = warm.build().await.unwrap();
    assert_eq!(second.discovery.hits, 1);
    assert_eq!(second.discovery.touched, 1);
    assert_eq!(second.discovery.misses, 0);
    assert_eq!(first.artifact.ref_map, second.artifact.ref_map);
    assert_eq!(first.artifact.documents, second.artifact.documents);
}

#[tokio::test]
async fn test_missing_entry() {
    let dir = project(&[("src/user.ts", USER_TS)]);
    let err = session(config(&dir, "src/nope.ts")).build().await.unwrap_err();
    assert_eq!(err.code(), "ENTRY_NOT_FOUND");
}

#[tokio::test]
async fn test_circular_dependency() {
    let dir = project(&[
        (
            "src/a.ts",
            "import { b } from \"./b\";\nexport const a = gql.default(({ model }) => model.A({}, () => [b.fragment()]));\n",
        ),
        (
            "src/b.ts",
            "import { a } from \"./a\";\nexport const b = gql.default(({ model }) => model.B({}, () => [a.fragment()]));\n",
        ),
    ]);
    let err = session(config(&dir, "src/a.ts")).build().await.unwrap_err();
    let BuilderError::CircularDependency { chain } = &err else {
        panic!("expected a cycle, got {:?}", err);
    };
    assert_eq!(err.code(), "CIRCULAR_DEPENDENCY");
    assert_eq!(chain.len(), 3);
    assert_eq!(chain.first(), chain.last());
    assert_eq!(
        err.to_string(),
        format!("Circular dependency detected: {}", gqlb_core::format_chain(chain))
    );
    assert_eq!(err.to_string().matches(" -> ").count(), 2);
}

const PING_TS: &str =
    "export const pingModel = gql.default(({ model }) => model.Ping({}, ({ f }) => [f.id()]));\n";

fn page_importing(import: &str) -> String {
    format!("{}\n{}", import, PING_TS)
}

fn warnings_about<'a>(warnings: &'a [String], file: &str) -> Vec<&'a String> {
    warnings.iter().filter(|w| w.contains(file)).collect()
}

#[tokio::test]
async fn test_syntax_error_in_sibling_is_a_warning() {
    let dir = project(&[
        ("src/page.ts", page_importing("import { helper } from \"./util\";").as_str()),
        ("src/util.ts", "export const helper = 1;\nconst broken = (;\n"),
    ]);
    let outcome = session(config(&dir, "src/page.ts")).build().await.unwrap();

    assert_eq!(outcome.modules, 2);
    assert_eq!(outcome.artifact.report.models, 1);
    let warnings = warnings_about(&outcome.artifact.report.warnings, "util.ts");
    assert!(!warnings.is_empty(), "{:?}", outcome.artifact.report.warnings);
}

#[tokio::test]
async fn test_broken_definition_in_sibling_fails_evaluation() {
    let dir = project(&[
        ("src/page.ts", page_importing("import { bad } from \"./bad\";").as_str()),
        (
            "src/bad.ts",
            "export const bad = gql.default(({ model }) => model.B({}, ({ f }) => [f.id(]));\n",
        ),
    ]);
    let err = session(config(&dir, "src/page.ts")).build().await.unwrap_err();
    assert_eq!(err.full_code(), "MODULE_EVALUATION_FAILED/MISSING_EXPRESSION");
}

#[tokio::test]
async fn test_undecodable_module_is_a_warning() {
    let page = page_importing("import { zz } from \"./bad\";");
    let dir = project(&[("src/page.ts", page.as_str())]);
    std::fs::write(dir.path().join("src/bad.ts"), [0xff, 0xfe, 0x00, 0x41]).unwrap();
    let mut cfg = config(&dir, "src/page.ts");
    cfg.use_cache = true;

    let cold = session(cfg.clone());
    let outcome = cold.build().await.unwrap();
    cold.dispose().unwrap();

    assert_eq!(outcome.modules, 2);
    assert_eq!(outcome.artifact.report.models, 1);
    let warnings = warnings_about(&outcome.artifact.report.warnings, "bad.ts");
    assert_eq!(warnings.len(), 1, "{:?}", outcome.artifact.report.warnings);
    assert!(warnings[0].contains("UTF-8"));

    let warm = session(cfg).build().await.unwrap();
    assert_eq!(warm.discovery.misses, 0);
    assert_eq!(warm.artifact.report.warnings, outcome.artifact.report.warnings);
}

#[tokio::test]
async fn test_side_effect_import_is_discovered() {
    let dir = project(&[
        ("src/page.ts", page_importing("import \"./register\";").as_str()),
        (
            "src/register.ts",
            "export const userModel = gql.default(({ model }) => model.User({}, ({ f }) => [f.id()]));\n",
        ),
    ]);
    let outcome = session(config(&dir, "src/page.ts")).build().await.unwrap();

    assert_eq!(outcome.modules, 2);
    assert_eq!(outcome.artifact.report.models, 2);
    assert!(outcome
        .artifact
        .ref_map
        .contains_key(&file_id(&dir, "src/register.ts", "userModel")));
}

#[tokio::test]
async fn test_cache_forgets_modules_no_longer_reachable() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let mut cfg = config(&dir, "src/page.ts");
    cfg.use_cache = true;

    let first = session(cfg.clone());
    first.build().await.unwrap();
    assert_eq!(first.caches().modules.len(), 2);
    first.dispose().unwrap();

    let page = dir.path().join("src/page.ts");
    std::fs::write(&page, PING_TS).unwrap();
    let file = std::fs::File::options().write(true).open(&page).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
    drop(file);

    let second = session(cfg);
    let outcome = second.build().await.unwrap();
    assert_eq!(outcome.modules, 1);
    assert_eq!(second.caches().modules.len(), 1);
    second.dispose().unwrap();

    let reloaded = gqlb_core::ModuleCache::load(
        &dir.path().join(crate::config::DEFAULT_CACHE_DIR),
        gqlb_analyzer::ANALYZER_VERSION,
    );
    assert_eq!(reloaded.len(), 1);
}

#[tokio::test]
async fn test_failed_build_keeps_previous_artifact() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let outcome = session(config(&dir, "src/page.ts")).build().await.unwrap();
    let before = std::fs::read(&outcome.out_path).unwrap();

    std::fs::write(
        dir.path().join("src/user.ts"),
        USER_TS.replace("gql.default(({ model })", "gql.admin(({ model })"),
    )
    .unwrap();
    let err = session(config(&dir, "src/page.ts")).build().await.unwrap_err();
    assert_eq!(err.code(), "MODULE_EVALUATION_FAILED");
    assert!(err.to_string().contains("user.ts"), "{}", err);
    assert!(err.to_string().contains("Unknown schema"), "{}", err);

    assert_eq!(std::fs::read(&outcome.out_path).unwrap(), before);
}

#[tokio::test]
async fn test_write_failure() {
    let dir = project(&[("src/user.ts", USER_TS)]);
    std::fs::create_dir_all(dir.path().join("out/artifact.json")).unwrap();
    let err = session(config(&dir, "src/user.ts")).build().await.unwrap_err();
    assert_eq!(err.code(), "WRITE_FAILED");
}

#[tokio::test]
async fn test_duplicate_document_name_collides() {
    let op = |name: &str| {
        format!(
            "export const {} = gql.default(({{ query }}) => query.inline({{ operationName: \"Same\" }}, ({{ f }}) => [f.ping()]));\n",
            name
        )
    };
    let dir = project(&[("src/ops.ts", &format!("{}{}", op("one"), op("two")))]);
    let err = session(config(&dir, "src/ops.ts")).build().await.unwrap_err();
    assert_eq!(err.code(), "RUNTIME_EXPORT_NAME_COLLISION");
}

#[tokio::test]
async fn test_debug_dir_receives_units() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let mut cfg = config(&dir, "src/page.ts");
    cfg.debug_dir = Some(PathBuf::from("debug"));
    session(cfg).build().await.unwrap();

    let debug = dir.path().join("debug");
    assert!(debug.join("units.json").is_file());
    assert!(debug.join("000-user.ts").is_file());
    assert!(debug.join("001-page.js").is_file());
}

// ── Intermediate modules ────────────────────────────────

#[test]
fn test_units_rewrite_references_and_elide_callbacks() {
    let modules = analyze_all(&[("/src/user.ts", USER_TS), ("/src/page.ts", PAGE_TS)]);
    let graph = build_dependency_graph(&modules).unwrap();
    let parser = SourceParser::new(ParserPool::new(1));
    let cache = IntermediateCache::new();
    let units = build_intermediate_modules(&graph, &parser, &cache).unwrap();

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].file_path, "/src/user.ts");
    assert_eq!(units[0].canonical_ids.len(), 2);

    let user = &units[0].transpiled_code;
    assert!(user.starts_with("registry.model(\"/src/user.ts::userModel\", gql.default("));
    assert!(user.contains("/* gqlb:elided:normalize */"));
    assert!(user.contains("/* gqlb:elided:projection */"));
    assert!(!user.contains("raw.missing"));
    assert!(user.contains("models[\"/src/user.ts::userModel\"].fragment()"));

    let page = &units[1].transpiled_code;
    assert!(page.contains("slices[\"/src/user.ts::userSlice\"].build({ id: $.userId })"));
    // Object keys are never rewritten.
    assert!(page.contains("profile: slices["));

    // A second build of the same graph reuses the parsed executables.
    build_intermediate_modules(&graph, &parser, &cache).unwrap();
    assert_eq!(cache.hits(), 2);
}

#[test]
fn test_shadowed_names_are_not_rewritten() {
    let modules = analyze_all(&[
        ("/src/user.ts", USER_TS),
        (
            "/src/list.ts",
            "import { userModel } from \"./user\";\nexport const list = gql.default(({ model }) => model.List({}, ({ f }) => [f.items({}, (userModel) => [f.id()]), userModel.fragment()]));\n",
        ),
    ]);
    let graph = build_dependency_graph(&modules).unwrap();
    let units = build_intermediate_modules(
        &graph,
        &SourceParser::new(ParserPool::new(1)),
        &IntermediateCache::new(),
    )
    .unwrap();

    let list = &units.last().unwrap().transpiled_code;
    assert!(list.contains("(userModel) => [f.id()]"), "{}", list);
    assert!(list.contains("models[\"/src/user.ts::userModel\"].fragment()"), "{}", list);
}

#[test]
fn test_missing_expression_fails_before_evaluation() {
    let mut analysis = ModuleAnalysis::new(PathBuf::from("/src/broken.ts"));
    analysis.definitions.push(Definition {
        export_name: "broken".to_string(),
        ast_path: "broken".to_string(),
        kind: ElementKind::Model,
        expression: String::new(),
        references: Vec::new(),
        exported: true,
        loc: SourceLocation { line: 3, column: 1 },
    });
    let mut modules = ModuleSet::new();
    modules.insert(PathBuf::from("/src/broken.ts"), analysis);
    let graph = build_dependency_graph(&modules).unwrap();

    let err = build_intermediate_modules(
        &graph,
        &SourceParser::new(ParserPool::new(1)),
        &IntermediateCache::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "MODULE_EVALUATION_FAILED");
    assert_eq!(err.subcode(), Some("MISSING_EXPRESSION"));
    assert_eq!(err.full_code(), "MODULE_EVALUATION_FAILED/MISSING_EXPRESSION");
}

#[test]
fn test_artifact_snapshot() {
    let modules = analyze_all(&[(
        "/src/ping.ts",
        "export const ping = gql.default(({ mutation }) => mutation.inline({ operationName: \"Ping\" }, ({ f }) => [f.ping()]));\n",
    )]);
    let graph = build_dependency_graph(&modules).unwrap();
    let units = build_intermediate_modules(
        &graph,
        &SourceParser::new(ParserPool::new(1)),
        &IntermediateCache::new(),
    )
    .unwrap();
    let mut registry = Registry::new();
    let mut evaluator = SandboxEvaluator::new(vec!["default".to_string()]);
    evaluate_modules(&mut evaluator, &units, &mut registry).unwrap();

    let artifact = build_artifact(&registry, BuildMode::Runtime, Vec::new(), 0).unwrap();
    insta::assert_snapshot!(to_json(&artifact).unwrap().trim_end(), @r#"
    {
      "documents": {
        "Ping": {
          "text": "mutation Ping {\n  ping\n}\n",
          "variables": {},
          "sourcePath": "/src/ping.ts"
        }
      },
      "refs": {
        "/src/ping.ts": {
          "ping": "/src/ping.ts::ping"
        }
      },
      "refMap": {
        "/src/ping.ts::ping": {
          "kind": "operation",
          "metadata": {
            "schema": "default",
            "operationType": "mutation",
            "operationName": "Ping"
          }
        }
      },
      "report": {
        "documents": 1,
        "models": 0,
        "slices": 0,
        "operations": 1,
        "durationMs": 0,
        "warnings": []
      }
    }
    "#);
}

// ── Evaluator port ──────────────────────────────────────

struct PanickingEvaluator;

impl Evaluator for PanickingEvaluator {
    fn evaluate(&mut self, _unit: &IntermediateModule) -> Result<RegistryDelta, EvalError> {
        panic!("boom");
    }
}

#[test]
fn test_evaluator_panic_is_reported_with_file() {
    let unit = IntermediateModule {
        file_path: "/src/user.ts".to_string(),
        canonical_ids: Vec::new(),
        source_code: String::new(),
        transpiled_code: String::new(),
        content_hash: String::new(),
        executable: Arc::new(Vec::new()),
    };
    let mut registry = Registry::new();
    let err = evaluate_modules(&mut PanickingEvaluator, &[unit], &mut registry).unwrap_err();
    match err {
        BuilderError::EvaluationFailed { file, message } => {
            assert_eq!(file, "/src/user.ts");
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected {:?}", other),
    }
}

// ── Artifact cache ──────────────────────────────────────

#[tokio::test]
async fn test_artifact_cache_hit_touch_and_invalidate() {
    let dir = project(&[("src/user.ts", USER_TS), ("src/page.ts", PAGE_TS)]);
    let outcome = session(config(&dir, "src/page.ts")).build().await.unwrap();
    let path = outcome.out_path.clone();

    let cache = ArtifactCache::new();
    let first = cache.load(&path, "none").unwrap();
    let second = cache.load(&path, "none").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.stats().parses, 1);
    assert_eq!(cache.stats().hits, 1);

    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
    drop(file);
    let touched = cache.load(&path, "none").unwrap();
    assert!(Arc::ptr_eq(&first, &touched));
    assert_eq!(cache.stats().touched, 1);
    assert_eq!(cache.stats().parses, 1);

    cache.load(&path, "other-schema").unwrap();
    assert_eq!(cache.len(), 2);
    cache.invalidate(&path);
    assert!(cache.is_empty());
}

#[test]
fn test_artifact_load_errors() {
    let dir = TempDir::new().unwrap();
    let cache = ArtifactCache::new();

    let missing = dir.path().join("missing.json");
    assert_eq!(cache.load(&missing, "none").unwrap_err().code(), "NOT_FOUND");

    let garbled = dir.path().join("garbled.json");
    std::fs::write(&garbled, "{ not json").unwrap();
    assert_eq!(cache.load(&garbled, "none").unwrap_err().code(), "PARSE_FAILED");

    let unknown = dir.path().join("unknown.json");
    std::fs::write(
        &unknown,
        r#"{"documents":{},"refs":{},"refMap":{},"report":{"documents":0,"models":0,"slices":0,"durationMs":1},"extra":1}"#,
    )
    .unwrap();
    assert_eq!(cache.load(&unknown, "none").unwrap_err().code(), "VALIDATION_FAILED");

    let dangling = dir.path().join("dangling.json");
    std::fs::write(
        &dangling,
        r#"{"documents":{},"refs":{"/a.ts":{"x":"/a.ts::x"}},"refMap":{},"report":{"documents":0,"models":0,"slices":0,"durationMs":1}}"#,
    )
    .unwrap();
    assert_eq!(cache.load(&dangling, "none").unwrap_err().code(), "VALIDATION_FAILED");

    let empty = dir.path().join("empty.json");
    std::fs::write(
        &empty,
        r#"{"documents":{},"refs":{},"refMap":{},"report":{"documents":0,"models":0,"slices":0,"durationMs":1}}"#,
    )
    .unwrap();
    assert!(cache.load(&empty, "none").is_ok());
}
