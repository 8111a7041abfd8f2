//! Expression syntax layer: AST, tree-sitter lowering, printing and visiting

pub mod ast;
pub mod lower;
pub mod print;
pub mod visit;

pub use ast::*;
pub use lower::Lowerer;
pub use print::{print_expr, print_program, PrintMode, ELIDED_MARKER};
pub use visit::{collect_references, visit_and_replace, visit_program, Action, Node};

use crate::parser_pool::{FileType, ParseRequest, ParserPool};
use gqlb_core::ElementKind;
use std::path::PathBuf;
use thiserror::Error;

/// Identifier of the element-builder entry point in user code.
pub const GQL_ENTRY: &str = "gql";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Syntax error at {line}:{column}: {snippet}")]
    Invalid {
        line: u32,
        column: u32,
        snippet: String,
    },

    #[error("Expected a single expression")]
    NotAnExpression,

    #[error("Parser failure: {0}")]
    Parser(String),
}

/// Parses standalone snippets through the shared parser pool.
#[derive(Clone)]
pub struct SourceParser {
    pool: ParserPool,
}

impl SourceParser {
    pub fn new(pool: ParserPool) -> Self {
        SourceParser { pool }
    }

    fn parse_tree(&self, text: String, file_type: FileType) -> Result<tree_sitter::Tree, SyntaxError> {
        let result = self
            .pool
            .parse_blocking(ParseRequest {
                file_type,
                content: text,
                path: PathBuf::from("<snippet>"),
            })
            .map_err(|e| SyntaxError::Parser(e.to_string()))?;
        Ok(result.tree)
    }

    /// Parse one expression, e.g. a definition's initializer text.
    pub fn parse_expression(&self, text: &str, file_type: FileType) -> Result<Expr, SyntaxError> {
        // Parenthesized so object literals are not read as blocks.
        let wrapped = format!("(\n{}\n)", text);
        let tree = self.parse_tree(wrapped.clone(), file_type)?;
        let root = tree.root_node();
        check_errors(root, &wrapped)?;

        let mut cursor = root.walk();
        let statements: Vec<_> = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();
        let [statement] = statements.as_slice() else {
            return Err(SyntaxError::NotAnExpression);
        };
        if statement.kind() != "expression_statement" {
            return Err(SyntaxError::NotAnExpression);
        }
        let mut cursor = statement.walk();
        let expr = statement
            .named_children(&mut cursor)
            .find(|n| n.kind() != "comment")
            .ok_or(SyntaxError::NotAnExpression)?;
        Ok(Lowerer::new(&wrapped).expr(expr))
    }

    /// Parse a statement list, e.g. a synthesized unit.
    pub fn parse_program(&self, text: &str, file_type: FileType) -> Result<Program, SyntaxError> {
        let tree = self.parse_tree(text.to_string(), file_type)?;
        let root = tree.root_node();
        check_errors(root, text)?;
        Ok(Lowerer::new(text).block(root))
    }
}

/// First error or missing node below `root`, as a [`SyntaxError`].
pub fn check_errors(root: tree_sitter::Node, src: &str) -> Result<(), SyntaxError> {
    let Some(bad) = first_error(root) else {
        return Ok(());
    };
    let pos = bad.start_position();
    let snippet: String = src[bad.byte_range()].chars().take(40).collect();
    Err(SyntaxError::Invalid {
        line: pos.row as u32 + 1,
        column: pos.column as u32 + 1,
        snippet,
    })
}

pub fn first_error(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

// ── Element-builder call shape ──────────────────────────

/// `gql.<schema>(callback)`: the schema name and the callback.
pub fn gql_call(expr: &Expr) -> Option<(&str, &Function)> {
    let Expr::Call { callee, args, .. } = expr.unwrap_assertions() else {
        return None;
    };
    let Expr::Member {
        object, property, ..
    } = callee.as_ref()
    else {
        return None;
    };
    if !matches!(object.as_ref(), Expr::Ident(name) if name == GQL_ENTRY) {
        return None;
    }
    match args.first().map(Expr::unwrap_assertions) {
        Some(Expr::Function(func)) => Some((property.as_str(), func.as_ref())),
        _ => None,
    }
}

/// Expression a function evaluates to: its expression body or the last
/// `return` of its block.
pub fn returned_expr(func: &Function) -> Option<&Expr> {
    match &func.body {
        FunctionBody::Expr(body) => Some(body.unwrap_assertions()),
        FunctionBody::Block(stmts) => stmts.iter().rev().find_map(|s| match s {
            Stmt::Return(Some(e)) => Some(e.unwrap_assertions()),
            _ => None,
        }),
    }
}

/// The element builder call returned by the `gql.<schema>` callback, e.g.
/// `model.User(...)` or `query.slice(...)`.
pub fn builder_call(expr: &Expr) -> Option<&Expr> {
    let (_, func) = gql_call(expr)?;
    let body = returned_expr(func)?;
    matches!(body, Expr::Call { .. }).then_some(body)
}

/// Element kind from the builder call's method name.
pub fn classify(expr: &Expr) -> ElementKind {
    let Some(Expr::Call { callee, .. }) = builder_call(expr) else {
        return ElementKind::Model;
    };
    match callee.as_ref() {
        Expr::Member { property, .. } => kind_for_method(property),
        _ => ElementKind::Model,
    }
}

pub fn kind_for_method(method: &str) -> ElementKind {
    match method {
        "slice" => ElementKind::Slice,
        "composed" | "inline" => ElementKind::Operation,
        _ => ElementKind::Model,
    }
}
