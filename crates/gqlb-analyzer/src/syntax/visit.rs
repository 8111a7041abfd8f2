//! Scope-aware visitor with a visit-and-maybe-replace combinator
//!
//! The walker offers a closed set of node kinds to a callback, top-down:
//! free references (identifiers and member chains whose root is not bound by
//! an enclosing parameter or block declaration), calls and object literals.
//! Member chains are offered longest first, so `a.b.c` is seen before `a.b`
//! and `a`. Object keys and member property names are never offered.

use super::ast::*;

/// Node kinds the callback can act on.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// Free identifier or member chain as a dotted path.
    Reference(&'a str),
    Call(&'a Expr),
    Object(&'a Expr),
}

/// What the walker does with an offered node.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Descend into the node's children.
    Continue,
    /// Keep the node as is without descending.
    Skip,
    /// Substitute the node; the replacement is not visited.
    Replace(Expr),
}

#[derive(Default)]
struct Scope {
    frames: Vec<Vec<String>>,
}

impl Scope {
    fn push(&mut self, names: Vec<String>) {
        self.frames.push(names);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn binds(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.iter().any(|n| n == name))
    }
}

/// Rebuild `expr`, letting `f` replace offered nodes.
pub fn visit_and_replace<F>(expr: &Expr, f: &mut F) -> Expr
where
    F: FnMut(Node<'_>) -> Action,
{
    let mut scope = Scope::default();
    walk(expr, &mut scope, f)
}

/// Visit a statement list at top level, e.g. a synthesized unit.
pub fn visit_program<F>(program: &[Stmt], f: &mut F) -> Program
where
    F: FnMut(Node<'_>) -> Action,
{
    let mut scope = Scope::default();
    walk_block(program, &mut scope, f)
}

/// Free reference paths of an expression, deduplicated, in first-seen order.
pub fn collect_references(expr: &Expr) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    visit_and_replace(expr, &mut |node: Node<'_>| match node {
        Node::Reference(path) => {
            if !found.iter().any(|p| p == path) {
                found.push(path.to_string());
            }
            Action::Skip
        }
        _ => Action::Continue,
    });
    found
}

fn root_of(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

fn walk<F>(expr: &Expr, scope: &mut Scope, f: &mut F) -> Expr
where
    F: FnMut(Node<'_>) -> Action,
{
    let action = match expr {
        Expr::Ident(_) | Expr::Member { .. } => match expr.chain_path() {
            Some(path) if !scope.binds(root_of(&path)) => f(Node::Reference(&path)),
            _ => Action::Continue,
        },
        Expr::Call { .. } => f(Node::Call(expr)),
        Expr::Object(_) => f(Node::Object(expr)),
        _ => Action::Continue,
    };
    match action {
        Action::Replace(new) => return new,
        Action::Skip => return expr.clone(),
        Action::Continue => {}
    }

    match expr {
        Expr::Member {
            object,
            property,
            optional,
        } => Expr::Member {
            object: Box::new(walk(object, scope, f)),
            property: property.clone(),
            optional: *optional,
        },
        Expr::Index { object, index } => Expr::Index {
            object: Box::new(walk(object, scope, f)),
            index: Box::new(walk(index, scope, f)),
        },
        Expr::Call {
            callee,
            args,
            type_args,
        } => Expr::Call {
            callee: Box::new(walk(callee, scope, f)),
            args: args.iter().map(|a| walk(a, scope, f)).collect(),
            type_args: type_args.clone(),
        },
        Expr::Object(props) => Expr::Object(
            props
                .iter()
                .map(|p| walk_prop(p, scope, f))
                .collect(),
        ),
        Expr::Array(items) => Expr::Array(items.iter().map(|i| walk(i, scope, f)).collect()),
        Expr::Spread(inner) => Expr::Spread(Box::new(walk(inner, scope, f))),
        Expr::Function(func) => Expr::Function(Box::new(walk_function(func, scope, f))),
        Expr::Template { quasis, exprs } => Expr::Template {
            quasis: quasis.clone(),
            exprs: exprs.iter().map(|e| walk(e, scope, f)).collect(),
        },
        Expr::Unary { op, arg } => Expr::Unary {
            op: op.clone(),
            arg: Box::new(walk(arg, scope, f)),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: op.clone(),
            left: Box::new(walk(left, scope, f)),
            right: Box::new(walk(right, scope, f)),
        },
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => Expr::Conditional {
            test: Box::new(walk(test, scope, f)),
            consequent: Box::new(walk(consequent, scope, f)),
            alternate: Box::new(walk(alternate, scope, f)),
        },
        Expr::TypeAssertion { expr: inner, kind } => Expr::TypeAssertion {
            expr: Box::new(walk(inner, scope, f)),
            kind: kind.clone(),
        },
        other => other.clone(),
    }
}

fn walk_prop<F>(prop: &Prop, scope: &mut Scope, f: &mut F) -> Prop
where
    F: FnMut(Node<'_>) -> Action,
{
    match prop {
        Prop::KeyValue { key, value } => Prop::KeyValue {
            key: match key {
                PropKey::Computed(inner) => PropKey::Computed(Box::new(walk(inner, scope, f))),
                other => other.clone(),
            },
            value: walk(value, scope, f),
        },
        // `{ name }` reads the binding `name`.
        Prop::Shorthand(name) => {
            if scope.binds(name) {
                return prop.clone();
            }
            match f(Node::Reference(name)) {
                Action::Replace(value) => Prop::KeyValue {
                    key: PropKey::Ident(name.clone()),
                    value,
                },
                _ => prop.clone(),
            }
        }
        Prop::Spread(inner) => Prop::Spread(walk(inner, scope, f)),
    }
}

fn walk_function<F>(func: &Function, scope: &mut Scope, f: &mut F) -> Function
where
    F: FnMut(Node<'_>) -> Action,
{
    let names: Vec<String> = func
        .params
        .iter()
        .flat_map(|p| p.bound_names())
        .map(str::to_string)
        .chain(func.name.clone())
        .collect();
    scope.push(names);

    let params = func.params.iter().map(|p| walk_pattern(p, scope, f)).collect();
    let body = match &func.body {
        FunctionBody::Expr(body) => FunctionBody::Expr(Box::new(walk(body, scope, f))),
        FunctionBody::Block(stmts) => FunctionBody::Block(walk_block(stmts, scope, f)),
    };

    scope.pop();
    Function {
        params,
        body,
        ..func.clone()
    }
}

/// Only default values inside patterns hold expressions.
fn walk_pattern<F>(pattern: &Pattern, scope: &mut Scope, f: &mut F) -> Pattern
where
    F: FnMut(Node<'_>) -> Action,
{
    match pattern {
        Pattern::Default { pattern, default } => Pattern::Default {
            pattern: Box::new(walk_pattern(pattern, scope, f)),
            default: Box::new(walk(default, scope, f)),
        },
        Pattern::Object { props, type_ann } => Pattern::Object {
            props: props
                .iter()
                .map(|p| match p {
                    PatternProp::KeyValue { key, value } => PatternProp::KeyValue {
                        key: key.clone(),
                        value: walk_pattern(value, scope, f),
                    },
                    PatternProp::Rest(inner) => PatternProp::Rest(walk_pattern(inner, scope, f)),
                })
                .collect(),
            type_ann: type_ann.clone(),
        },
        Pattern::Array { elems, type_ann } => Pattern::Array {
            elems: elems
                .iter()
                .map(|e| e.as_ref().map(|p| walk_pattern(p, scope, f)))
                .collect(),
            type_ann: type_ann.clone(),
        },
        Pattern::Rest(inner) => Pattern::Rest(Box::new(walk_pattern(inner, scope, f))),
        other => other.clone(),
    }
}

/// Block declarations are visible to the whole block.
fn walk_block<F>(stmts: &[Stmt], scope: &mut Scope, f: &mut F) -> Vec<Stmt>
where
    F: FnMut(Node<'_>) -> Action,
{
    let names: Vec<String> = stmts
        .iter()
        .filter_map(|s| match s {
            Stmt::Decl { pattern, .. } => Some(pattern.bound_names()),
            _ => None,
        })
        .flatten()
        .map(str::to_string)
        .collect();
    scope.push(names);

    let out = stmts
        .iter()
        .map(|stmt| match stmt {
            Stmt::Decl {
                kind,
                pattern,
                init,
            } => Stmt::Decl {
                kind: *kind,
                pattern: walk_pattern(pattern, scope, f),
                init: init.as_ref().map(|e| walk(e, scope, f)),
            },
            Stmt::Return(value) => Stmt::Return(value.as_ref().map(|e| walk(e, scope, f))),
            Stmt::Expr(e) => Stmt::Expr(walk(e, scope, f)),
            Stmt::Unsupported(text) => Stmt::Unsupported(text.clone()),
        })
        .collect();

    scope.pop();
    out
}
