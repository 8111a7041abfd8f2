//! Integration tests for gqlb
//!
//! Builds real project trees through the library and through the CLI binary.

use gqlb_builder::{BuildSession, BuilderConfig};
use gqlb_core::ElementKind;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const MODEL_TS: &str = r#"export const cardModel = gql.default(({ model }) =>
  model.Card({}, ({ f }) => [f.id(), f.title()]));
"#;

const BARREL_TS: &str = r#"export { cardModel as card } from "./model";
export * from "./slices";
"#;

const SLICES_TS: &str = r#"import { card } from "./barrel";

export const cardSlice = gql.default(({ query }) =>
  query.slice({ id: "ID!" }, ({ f, $ }) => [f.card({ id: $.id }, () => [card.fragment()])]));
"#;

const PAGE_TS: &str = r#"import { cardSlice } from "./barrel";

export const cardQuery = gql.default(({ query }) =>
  query.composed({ operationName: "CardQuery", variables: { cardId: "ID!" } }, ({ $ }) => ({
    main: cardSlice.build({ id: $.cardId }),
  })));
"#;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    for (name, content) in [
        ("model.ts", MODEL_TS),
        ("barrel.ts", BARREL_TS),
        ("slices.ts", SLICES_TS),
        ("page.ts", PAGE_TS),
    ] {
        std::fs::write(src.join(name), content).unwrap();
    }
    dir
}

fn gqlb(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gqlb"))
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute gqlb")
}

const CARD_DOCUMENT: &str = "query CardQuery($cardId: ID!) {\n  main_card: card(id: $cardId) {\n    ... on Card {\n      id\n      title\n    }\n  }\n}\n";

/// Re-exports and star exports resolve to the defining module.
#[tokio::test]
async fn test_export_chain_resolves_to_definition() {
    let dir = project();
    let mut config = BuilderConfig::new(dir.path(), vec!["src/page.ts".to_string()], "artifact.json");
    config.use_cache = false;
    let outcome = BuildSession::with_default_analyzer(config).build().await.unwrap();

    let kinds: Vec<_> = outcome
        .artifact
        .ref_map
        .iter()
        .map(|(id, entry)| (id.rsplit("::").next().unwrap_or_default().to_string(), entry.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("cardModel".to_string(), ElementKind::Model),
            ("cardSlice".to_string(), ElementKind::Slice),
            ("cardQuery".to_string(), ElementKind::Operation),
        ]
    );
    assert_eq!(outcome.artifact.documents["CardQuery"].text, CARD_DOCUMENT);
    assert_eq!(outcome.modules, 4);
}

/// A warm cache and a cold build produce the same artifact.
#[tokio::test]
async fn test_cache_is_advisory() {
    let dir = project();
    let config = BuilderConfig::new(dir.path(), vec!["src/*.ts".to_string()], "artifact.json");

    let cold = BuildSession::with_default_analyzer(config.clone());
    let first = cold.build().await.unwrap();
    cold.dispose().unwrap();
    assert!(dir.path().join(".gqlb/build-cache.json").is_file());

    let warm = BuildSession::with_default_analyzer(config.clone());
    let second = warm.build().await.unwrap();
    assert_eq!(second.discovery.misses, 0);
    assert_eq!(second.discovery.hits, 4);

    let mut uncached = config;
    uncached.use_cache = false;
    let third = BuildSession::with_default_analyzer(uncached).build().await.unwrap();

    for outcome in [&second, &third] {
        assert_eq!(outcome.artifact.documents, first.artifact.documents);
        assert_eq!(outcome.artifact.refs, first.artifact.refs);
        assert_eq!(outcome.artifact.ref_map, first.artifact.ref_map);
    }
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_gqlb"))
        .arg("--help")
        .output()
        .expect("Failed to execute gqlb");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Static builder for GraphQL element definitions"));
}

#[test]
fn test_cli_build_inspect_clear() {
    let dir = project();
    let output = gqlb(dir.path(), &["build", "--entry", "src/page.ts", "--out", "out/artifact.json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Built 1 document(s), 1 model(s), 1 slice(s)"), "{}", stdout);
    assert!(dir.path().join("out/artifact.json").is_file());
    assert!(dir.path().join(".gqlb/build-cache.json").is_file());

    let output = gqlb(dir.path(), &["inspect", "out/artifact.json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CardQuery (1 variable(s))"), "{}", stdout);

    let output = gqlb(dir.path(), &["clear"]);
    assert!(output.status.success());
    assert!(!dir.path().join(".gqlb/build-cache.json").exists());
}

#[test]
fn test_cli_json_build_summary() {
    let dir = project();
    let output = gqlb(
        dir.path(),
        &["build", "--entry", "src/page.ts", "--mode", "zero-runtime", "--format", "json", "--no-cache"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["report"]["documents"], 1);
    assert_eq!(summary["schemaHash"], "none");
    assert!(!dir.path().join(".gqlb/build-cache.json").exists());
}

/// stderr holds exactly the error line, nothing logged before it.
fn single_stderr_line(output: &Output) -> String {
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    assert_eq!(lines.len(), 1, "{}", stderr);
    lines[0].to_string()
}

#[test]
fn test_cli_errors_exit_with_code() {
    let dir = project();
    let line = single_stderr_line(&gqlb(dir.path(), &["build", "--entry", "src/missing.ts"]));
    assert!(line.starts_with("ENTRY_NOT_FOUND: "), "{}", line);

    let line = single_stderr_line(&gqlb(
        dir.path(),
        &["build", "--entry", "src/missing.ts", "--format", "json"],
    ));
    let error: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(error["code"], "ENTRY_NOT_FOUND");

    let line = single_stderr_line(&gqlb(dir.path(), &["inspect", "nothing.json"]));
    assert!(line.starts_with("NOT_FOUND: "), "{}", line);
}

#[test]
fn test_cli_evaluation_failure_is_one_line() {
    let dir = project();
    std::fs::write(
        dir.path().join("src/broken.ts"),
        "import { cardModel } from \"./model\";\nexport const broken = gql.default(({ model }) => model.B({}, ({ f }) => [f.id(]));\n",
    )
    .unwrap();
    let line = single_stderr_line(&gqlb(dir.path(), &["build", "--entry", "src/broken.ts"]));
    assert!(line.starts_with("MODULE_EVALUATION_FAILED/MISSING_EXPRESSION: "), "{}", line);
}

#[test]
fn test_cli_prints_warnings_on_stdout() {
    let dir = project();
    std::fs::write(
        dir.path().join("src/loose.ts"),
        "import { gone } from \"./gone\";\nexport const looseModel = gql.default(({ model }) => model.Loose({}, ({ f }) => [f.id()]));\n",
    )
    .unwrap();
    let output = gqlb(dir.path(), &["build", "--entry", "src/loose.ts", "--no-cache"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stderr.is_empty());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("warning: ") && stdout.contains("Cannot resolve module './gone'"), "{}", stdout);
}
