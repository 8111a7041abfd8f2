//! Expression AST for element definitions
//!
//! Covers the subset of TypeScript that element expressions are written in.
//! Anything else is kept verbatim as [`Expr::Unsupported`].

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    /// `object.property` or `object?.property`
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        /// Raw `<...>` type arguments, erased on transpile.
        type_args: Option<String>,
    },
    Object(Vec<Prop>),
    Array(Vec<Expr>),
    /// `...expr` inside array literals and argument lists.
    Spread(Box<Expr>),
    Function(Box<Function>),
    Str(String),
    /// Raw numeric literal text.
    Num(String),
    Bool(bool),
    Null,
    Undefined,
    /// Template literal; `quasis.len() == exprs.len() + 1`, quasis cooked.
    Template { quasis: Vec<String>, exprs: Vec<Expr> },
    Unary { op: String, arg: Box<Expr> },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `expr as T`, `expr satisfies T`, `expr!`
    TypeAssertion { expr: Box<Expr>, kind: Assertion },
    /// Callback body removed before evaluation.
    Elided { role: String },
    /// Source text of a construct outside the supported subset.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    As(String),
    Satisfies(String),
    NonNull,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    KeyValue { key: PropKey, value: Expr },
    /// `{ name }`
    Shorthand(String),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Num(String),
    Computed(Box<Expr>),
}

impl PropKey {
    /// Static key name, if the key is not computed.
    pub fn name(&self) -> Option<&str> {
        match self {
            PropKey::Ident(s) | PropKey::Str(s) | PropKey::Num(s) => Some(s),
            PropKey::Computed(_) => None,
        }
    }
}

/// Arrow function or function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub is_arrow: bool,
    pub is_async: bool,
    pub name: Option<String>,
    pub type_params: Option<String>,
    pub params: Vec<Pattern>,
    pub return_type: Option<String>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// Binding pattern in parameters and declarations.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident {
        name: String,
        type_ann: Option<String>,
        optional: bool,
    },
    Object {
        props: Vec<PatternProp>,
        type_ann: Option<String>,
    },
    Array {
        elems: Vec<Option<Pattern>>,
        type_ann: Option<String>,
    },
    /// `pattern = default`
    Default {
        pattern: Box<Pattern>,
        default: Box<Expr>,
    },
    /// `...pattern`
    Rest(Box<Pattern>),
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternProp {
    /// `key: value`; shorthand when the value is a plain identifier of the
    /// same name.
    KeyValue { key: String, value: Pattern },
    Rest(Pattern),
}

impl Pattern {
    pub fn ident(name: impl Into<String>) -> Self {
        Pattern::Ident {
            name: name.into(),
            type_ann: None,
            optional: false,
        }
    }

    /// Every name this pattern binds, in source order.
    pub fn bound_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pattern::Ident { name, .. } => out.push(name),
            Pattern::Object { props, .. } => {
                for prop in props {
                    match prop {
                        PatternProp::KeyValue { value, .. } => value.collect_names(out),
                        PatternProp::Rest(p) => p.collect_names(out),
                    }
                }
            }
            Pattern::Array { elems, .. } => {
                for p in elems.iter().flatten() {
                    p.collect_names(out);
                }
            }
            Pattern::Default { pattern, .. } => pattern.collect_names(out),
            Pattern::Rest(p) => p.collect_names(out),
            Pattern::Unsupported(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Const => "const",
            DeclKind::Let => "let",
            DeclKind::Var => "var",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Decl {
        kind: DeclKind,
        pattern: Pattern,
        init: Option<Expr>,
    },
    Return(Option<Expr>),
    Expr(Expr),
    Unsupported(String),
}

/// Top-level statement list of a synthesized unit.
pub type Program = Vec<Stmt>;

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: property.into(),
            optional: false,
        }
    }

    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
            type_args: None,
        }
    }

    /// Dotted path of a pure identifier/member chain (`a.b.c`).
    pub fn chain_path(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::Member {
                object, property, ..
            } => object.chain_path().map(|p| format!("{}.{}", p, property)),
            _ => None,
        }
    }

    /// Strip `as`/`satisfies`/`!` wrappers.
    pub fn unwrap_assertions(&self) -> &Expr {
        match self {
            Expr::TypeAssertion { expr, .. } => expr.unwrap_assertions(),
            other => other,
        }
    }
}
