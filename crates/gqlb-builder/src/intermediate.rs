//! Intermediate module builder
//!
//! Re-embeds each graph node's expression into a synthetic unit instead of
//! re-importing the original file: cross-node references become registry
//! index expressions, runtime callbacks are elided, and every unit registers
//! its elements through `registry.<kind>(id, element)`.

use crate::error::BuilderError;
use dashmap::DashMap;
use gqlb_analyzer::syntax::{
    builder_call, print_program, visit_and_replace, Action, Expr, FunctionBody, Node, PrintMode,
    Program, SourceParser, Stmt,
};
use gqlb_analyzer::FileType;
use gqlb_core::{content_hash, CanonicalId, DependencyGraph, DependencyGraphNode};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Name of the registration object in synthesized code.
pub const REGISTRY_GLOBAL: &str = "registry";

/// One synthesized unit: consecutive nodes of one file in evaluation order.
#[derive(Debug, Clone)]
pub struct IntermediateModule {
    pub file_path: String,
    pub canonical_ids: Vec<CanonicalId>,
    pub source_code: String,
    pub transpiled_code: String,
    pub content_hash: String,
    pub executable: Arc<Program>,
}

/// Parsed executables by content hash, kept across builds of one session.
#[derive(Debug, Default)]
pub struct IntermediateCache {
    programs: DashMap<String, Arc<Program>>,
    hits: AtomicUsize,
}

impl IntermediateCache {
    pub fn new() -> Self {
        IntermediateCache::default()
    }

    fn get_or_parse(
        &self,
        hash: &str,
        parse: impl FnOnce() -> Result<Program, String>,
    ) -> Result<Arc<Program>, String> {
        if let Some(program) = self.programs.get(hash) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(program.value().clone());
        }
        let program = Arc::new(parse()?);
        self.programs.insert(hash.to_string(), program.clone());
        Ok(program)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn clear(&self) {
        self.programs.clear();
    }
}

/// Fail with `MISSING_EXPRESSION` if any node has no expression text.
pub fn ensure_expressions(graph: &DependencyGraph) -> Result<(), BuilderError> {
    match graph.nodes().find(|n| !n.definition.has_expression()) {
        Some(node) => Err(BuilderError::MissingExpression {
            id: node.id.clone(),
            file: node.id.file_path().to_string(),
            line: node.definition.loc.line,
        }),
        None => Ok(()),
    }
}

/// Build the units for every node of `graph`, in evaluation order.
pub fn build_intermediate_modules(
    graph: &DependencyGraph,
    parser: &SourceParser,
    cache: &IntermediateCache,
) -> Result<Vec<IntermediateModule>, BuilderError> {
    ensure_expressions(graph)?;

    let mut groups: Vec<(String, Vec<&DependencyGraphNode>)> = Vec::new();
    for node in graph.evaluation_order() {
        let file = node.id.file_path();
        match groups.last_mut() {
            Some((last, nodes)) if last.as_str() == file => nodes.push(node),
            _ => groups.push((file.to_string(), vec![node])),
        }
    }

    let mut units = Vec::with_capacity(groups.len());
    for (file_path, nodes) in groups {
        let mut program = Program::with_capacity(nodes.len());
        for node in &nodes {
            let expr = node_expression(node, graph, parser)?;
            program.push(Stmt::Expr(Expr::call(
                Expr::member(Expr::ident(REGISTRY_GLOBAL), node.definition.kind.hook_name()),
                vec![Expr::Str(node.id.as_str().to_string()), expr],
            )));
        }

        let source_code = print_program(&program, PrintMode::Source);
        let transpiled_code = print_program(&program, PrintMode::Erased);
        let hash = content_hash(&transpiled_code);
        let executable = cache
            .get_or_parse(&hash, || {
                parser
                    .parse_program(&transpiled_code, FileType::JavaScript)
                    .map_err(|e| e.to_string())
            })
            .map_err(|message| BuilderError::RuntimeModuleLoad {
                file: file_path.clone(),
                message,
            })?;

        tracing::debug!(
            "Unit {} [{}]: {} element(s)",
            file_path,
            hash,
            nodes.len()
        );
        units.push(IntermediateModule {
            file_path,
            canonical_ids: nodes.iter().map(|n| n.id.clone()).collect(),
            source_code,
            transpiled_code,
            content_hash: hash,
            executable,
        });
    }

    Ok(units)
}

/// Parse a node's expression, elide its runtime callback and rewrite its
/// references to other nodes.
fn node_expression(
    node: &DependencyGraphNode,
    graph: &DependencyGraph,
    parser: &SourceParser,
) -> Result<Expr, BuilderError> {
    let file_type = FileType::from_path(Path::new(node.id.file_path())).unwrap_or(FileType::TypeScript);
    let mut expr = parser
        .parse_expression(&node.definition.expression, file_type)
        .map_err(|e| BuilderError::RuntimeModuleLoad {
            file: node.id.file_path().to_string(),
            message: format!("{}: {}", node.id, e),
        })?;

    if builder_call(&expr).is_some() {
        if let Some(args) = builder_args_mut(&mut expr) {
            if let Some(callback) = args.get_mut(2) {
                *callback = Expr::Elided {
                    role: node.definition.kind.elided_role().to_string(),
                };
            }
        }
    }

    Ok(rewrite_references(&expr, node, graph))
}

/// Replace each free reference that names another node by
/// `<registry>["<id>"]`. The walker offers member chains longest first, so
/// the longest matching prefix wins and the remaining members stay.
pub fn rewrite_references(expr: &Expr, node: &DependencyGraphNode, graph: &DependencyGraph) -> Expr {
    visit_and_replace(expr, &mut |visited: Node<'_>| match visited {
        Node::Reference(path) => {
            let target = node
                .references
                .get(path)
                .and_then(|id| graph.node(id).map(|target| (id, target.definition.kind)));
            match target {
                Some((id, kind)) => Action::Replace(Expr::index(
                    Expr::ident(kind.registry_name()),
                    Expr::Str(id.as_str().to_string()),
                )),
                None => Action::Continue,
            }
        }
        _ => Action::Continue,
    })
}

fn strip_mut(expr: &mut Expr) -> &mut Expr {
    match expr {
        Expr::TypeAssertion { expr: inner, .. } => strip_mut(inner),
        other => other,
    }
}

/// Arguments of the element builder call inside `gql.<schema>(cb)`.
fn builder_args_mut(expr: &mut Expr) -> Option<&mut Vec<Expr>> {
    let Expr::Call { args, .. } = strip_mut(expr) else {
        return None;
    };
    let Some(Expr::Function(func)) = args.first_mut().map(strip_mut) else {
        return None;
    };
    let body = match &mut func.body {
        FunctionBody::Expr(body) => strip_mut(body),
        FunctionBody::Block(stmts) => stmts.iter_mut().rev().find_map(|s| match s {
            Stmt::Return(Some(e)) => Some(strip_mut(e)),
            _ => None,
        })?,
    };
    match body {
        Expr::Call { args, .. } => Some(args),
        _ => None,
    }
}
