//! Unit tests for gqlb-analyzer

use crate::analyzer::ModuleAnalyzer;
use crate::languages::TreeSitterAnalyzer;
use crate::parser_pool::{FileType, ParserPool};
use crate::syntax::*;
use gqlb_core::{ElementKind, ExportKind, ImportKind, ModuleAnalysis, Severity};
use std::path::Path;

fn analyze(path: &str, source: &str) -> ModuleAnalysis {
    let analyzer = TreeSitterAnalyzer::new(ParserPool::new(1));
    analyzer.analyze(Path::new(path), source).unwrap()
}

fn parse(text: &str) -> Expr {
    SourceParser::new(ParserPool::new(1))
        .parse_expression(text, FileType::TypeScript)
        .unwrap()
}

const USER_TS: &str = r#"
import { gql } from "@app/gql";

export const userModel = gql.default(({ model }) =>
  model.User({}, ({ f }) => [f.id(), f.name()], (raw) => raw));

export const userSlice = gql.default(({ query }) =>
  query.slice({ id: "ID!" }, ({ f, $ }) => [f.user({ id: $.id }, () => [userModel.fragment()])], (r) => r));
"#;

// ── Module analysis ─────────────────────────────────────

#[test]
fn test_definitions_and_kinds() {
    let analysis = analyze("/src/user.ts", USER_TS);

    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(analysis.definitions.len(), 2);

    let model = &analysis.definitions[0];
    assert_eq!(model.export_name, "userModel");
    assert_eq!(model.ast_path, "userModel");
    assert_eq!(model.kind, ElementKind::Model);
    assert!(model.exported);
    assert!(model.expression.starts_with("gql.default("));
    assert_eq!(model.loc.line, 4);

    let slice = &analysis.definitions[1];
    assert_eq!(slice.kind, ElementKind::Slice);
    assert!(slice.references.contains(&"userModel.fragment".to_string()));
    // Callback parameters are bound, not references.
    assert!(!slice.references.iter().any(|r| r.starts_with('$') || r.starts_with("f.")));
}

#[test]
fn test_imports() {
    let analysis = analyze(
        "/src/page.ts",
        r#"
import def, { userSlice, other as renamed } from "./user";
import * as models from "./models";
import type { Shape } from "./types";
import { type OnlyType, value } from "./mixed";
"#,
    );

    let imports: Vec<_> = analysis
        .imports
        .iter()
        .map(|i| (i.local.as_str(), i.imported.as_str(), i.kind, i.source.as_str()))
        .collect();
    assert_eq!(
        imports,
        vec![
            ("def", "default", ImportKind::Default, "./user"),
            ("userSlice", "userSlice", ImportKind::Named, "./user"),
            ("renamed", "other", ImportKind::Named, "./user"),
            ("models", "*", ImportKind::Namespace, "./models"),
            ("value", "value", ImportKind::Named, "./mixed"),
        ]
    );
}

#[test]
fn test_side_effect_import_is_linked() {
    let analysis = analyze(
        "/src/app.ts",
        r#"
import "./polyfill";
import { user } from "./user";
"#,
    );

    assert_eq!(analysis.imports[0].kind, ImportKind::SideEffect);
    assert!(analysis.imports[0].local.is_empty());
    assert_eq!(analysis.specifiers(), vec!["./polyfill", "./user"]);
}

#[test]
fn test_exports() {
    let analysis = analyze(
        "/src/index.ts",
        r#"
export * from "./a";
export { X as Y, Z } from "./b";
export * as ns from "./c";
export type { T } from "./types";
const local = 1;
export { local as publicName };
"#,
    );

    let exports: Vec<_> = analysis
        .exports
        .iter()
        .map(|e| (e.kind, e.local.as_str(), e.exported.as_str(), e.source.as_deref()))
        .collect();
    assert_eq!(
        exports,
        vec![
            (ExportKind::ReexportStar, "*", "*", Some("./a")),
            (ExportKind::ReexportNamed, "X", "Y", Some("./b")),
            (ExportKind::ReexportNamed, "Z", "Z", Some("./b")),
            (ExportKind::ReexportNamed, "*", "ns", Some("./c")),
            (ExportKind::Named, "local", "publicName", None),
        ]
    );
}

#[test]
fn test_nested_object_definitions() {
    let analysis = analyze(
        "/src/catalog.ts",
        r#"
export const catalog = {
  byId: gql.default(({ query }) => query.slice({}, ({ f }) => [f.product()])),
  "list": { all: gql.default(({ model }) => model.Product({}, ({ f }) => [f.id()])) },
};
"#,
    );

    let paths: Vec<_> = analysis.definitions.iter().map(|d| d.ast_path.as_str()).collect();
    assert_eq!(paths, vec!["catalog.byId", "catalog.list.all"]);
    assert!(analysis.definitions.iter().all(|d| d.exported));
}

#[test]
fn test_local_definition_exported_later() {
    let analysis = analyze(
        "/src/late.ts",
        r#"
const hidden = gql.default(({ model }) => model.A({}, ({ f }) => [f.id()]));
const kept = gql.default(({ model }) => model.B({}, ({ f }) => [f.id()]));
export { hidden as visible };
"#,
    );

    let hidden = &analysis.definitions[0];
    assert!(hidden.exported);
    assert_eq!(hidden.export_name, "visible");
    assert_eq!(hidden.ast_path, "hidden");

    let kept = &analysis.definitions[1];
    assert!(!kept.exported);
}

#[test]
fn test_default_export() {
    let analysis = analyze(
        "/src/default.ts",
        "export default gql.default(({ query }) => query.composed({ operationName: \"Q\" }, () => ({})));\n",
    );
    assert_eq!(analysis.definitions.len(), 1);
    assert_eq!(analysis.definitions[0].ast_path, "default");
    assert_eq!(analysis.definitions[0].kind, ElementKind::Operation);
}

#[test]
fn test_non_element_declarations_ignored() {
    let analysis = analyze(
        "/src/misc.ts",
        "export const n = 1;\nexport const f = () => gql;\nconst obj = { a: 2 };\n",
    );
    assert!(analysis.definitions.is_empty());
}

#[test]
fn test_syntax_error_in_definition() {
    let analysis = analyze(
        "/src/broken.ts",
        "export const good = gql.default(({ model }) => model.A({}, ({ f }) => [f.id()]));\nexport const bad = gql.default(({ model }) => model.B({}, ({ f }) => [f.id(]));\n",
    );

    assert!(analysis.has_errors());
    assert!(analysis
        .diagnostics
        .iter()
        .all(|d| d.severity == Severity::Error));

    let good = analysis
        .definitions
        .iter()
        .find(|d| d.ast_path == "good")
        .unwrap();
    assert!(good.has_expression());

    if let Some(bad) = analysis.definitions.iter().find(|d| d.ast_path == "bad") {
        assert!(!bad.has_expression());
    }
}

#[test]
fn test_javascript_module() {
    let analysis = analyze(
        "/src/plain.js",
        "import { userModel } from \"./user\";\nexport const m = gql.default(({ model }) => model.C({}, ({ f }) => [f.id()]));\n",
    );
    assert_eq!(analysis.imports.len(), 1);
    assert_eq!(analysis.definitions.len(), 1);
}

#[test]
fn test_unsupported_extension() {
    let analyzer = TreeSitterAnalyzer::new(ParserPool::new(1));
    assert!(analyzer.analyze(Path::new("/src/a.css"), "").is_err());
}

// ── Syntax layer ────────────────────────────────────────

#[test]
fn test_print_roundtrip() {
    let expr = parse("gql.default(({ model }) => model.User({}, ({ f }) => [f.id(), f.name({ first: 10 })]))");
    insta::assert_snapshot!(
        print_expr(&expr, PrintMode::Source),
        @"gql.default(({ model }) => model.User({}, ({ f }) => [f.id(), f.name({ first: 10 })]))"
    );
}

#[test]
fn test_print_erases_types() {
    let expr = parse("(a as Foo).b(x satisfies Bar, y!)");
    assert_eq!(print_expr(&expr, PrintMode::Source), "(a as Foo).b(x satisfies Bar, y!)");
    assert_eq!(print_expr(&expr, PrintMode::Erased), "a.b(x, y)");
}

#[test]
fn test_print_precedence() {
    let expr = parse("(a + b) * c");
    assert_eq!(print_expr(&expr, PrintMode::Source), "(a + b) * c");
    let expr = parse("() => ({ a: 1 })");
    assert_eq!(print_expr(&expr, PrintMode::Source), "() => ({ a: 1 })");
}

#[test]
fn test_collect_references_respects_scope() {
    let expr = parse("(userModel) => [userModel.fragment(), other.slice.build({ key: value })]");
    assert_eq!(
        collect_references(&expr),
        vec!["other.slice.build".to_string(), "value".to_string()]
    );
}

#[test]
fn test_block_scope_and_shorthand() {
    let expr = parse("() => { const local = 1; return { local, shared }; }");
    assert_eq!(collect_references(&expr), vec!["shared".to_string()]);
}

#[test]
fn test_replace_keeps_object_keys() {
    let expr = parse("({ userModel: userModel, nested: { userModel } })");
    let replaced = visit_and_replace(&expr, &mut |node: Node<'_>| match node {
        Node::Reference("userModel") => Action::Replace(Expr::index(
            Expr::ident("models"),
            Expr::Str("a::userModel".to_string()),
        )),
        _ => Action::Continue,
    });
    assert_eq!(
        print_expr(&replaced, PrintMode::Source),
        r#"{ userModel: models["a::userModel"], nested: { userModel: models["a::userModel"] } }"#
    );
}

#[test]
fn test_builder_call_shape() {
    let expr = parse("gql.admin(({ query }) => query.composed({ operationName: \"Q\" }, () => ({})))");
    let (schema, _) = gql_call(&expr).unwrap();
    assert_eq!(schema, "admin");
    assert_eq!(classify(&expr), ElementKind::Operation);

    let block = parse("gql.default(({ model }) => { return model.User({}, () => []); })");
    assert!(builder_call(&block).is_some());
    assert_eq!(classify(&block), ElementKind::Model);
}

#[test]
fn test_elided_print() {
    let printed = print_expr(
        &Expr::Elided {
            role: "normalize".to_string(),
        },
        PrintMode::Erased,
    );
    assert_eq!(printed, "/* gqlb:elided:normalize */ (() => {})");
}

#[test]
fn test_parse_expression_reports_errors() {
    let parser = SourceParser::new(ParserPool::new(1));
    assert!(matches!(
        parser.parse_expression("a(", FileType::TypeScript),
        Err(SyntaxError::Invalid { .. })
    ));
}

#[test]
fn test_parse_program() {
    let parser = SourceParser::new(ParserPool::new(1));
    let program = parser
        .parse_program("registry.model(\"a\", x);\nregistry.slice(\"b\", y);\n", FileType::JavaScript)
        .unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(
        print_program(&program, PrintMode::Erased),
        "registry.model(\"a\", x);\nregistry.slice(\"b\", y);\n"
    );
}
