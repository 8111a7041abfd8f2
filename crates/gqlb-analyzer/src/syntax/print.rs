//! Printer for the expression AST
//!
//! Output is single-line and deterministic. Parentheses are inserted from
//! operator precedence, so lowering can drop them.

use super::ast::*;

/// Marker comment prefix for elided callbacks.
pub const ELIDED_MARKER: &str = "gqlb:elided:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// TypeScript as written, type annotations included.
    Source,
    /// Type annotations, assertions and type arguments removed.
    Erased,
}

const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_RELATIONAL: u8 = 9;
const PREC_UNARY: u8 = 14;
const PREC_POSTFIX: u8 = 16;
const PREC_CALL: u8 = 17;
const PREC_PRIMARY: u8 = 18;

fn binary_precedence(op: &str) -> u8 {
    match op {
        "??" | "||" => 3,
        "&&" => 4,
        "|" => 5,
        "^" => 6,
        "&" => 7,
        "==" | "!=" | "===" | "!==" => 8,
        "<" | ">" | "<=" | ">=" | "instanceof" | "in" => PREC_RELATIONAL,
        "<<" | ">>" | ">>>" => 10,
        "+" | "-" => 11,
        "*" | "/" | "%" => 12,
        "**" => 13,
        _ => 3,
    }
}

pub fn print_expr(expr: &Expr, mode: PrintMode) -> String {
    let mut printer = Printer::new(mode);
    printer.expr(expr, PREC_ASSIGN);
    printer.out
}

pub fn print_program(program: &[Stmt], mode: PrintMode) -> String {
    let mut printer = Printer::new(mode);
    for stmt in program {
        printer.stmt(stmt);
        printer.out.push('\n');
    }
    printer.out
}

/// JSON-compatible double-quoted string literal.
pub fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

struct Printer {
    mode: PrintMode,
    out: String,
}

impl Printer {
    fn new(mode: PrintMode) -> Self {
        Printer {
            mode,
            out: String::new(),
        }
    }

    fn erased(&self) -> bool {
        self.mode == PrintMode::Erased
    }

    fn precedence(&self, expr: &Expr) -> u8 {
        match expr {
            Expr::Function(_) => PREC_ASSIGN,
            Expr::Conditional { .. } => PREC_CONDITIONAL,
            Expr::Binary { op, .. } => binary_precedence(op),
            Expr::Unary { .. } => PREC_UNARY,
            Expr::TypeAssertion { expr, kind } => {
                if self.erased() {
                    self.precedence(expr)
                } else if *kind == Assertion::NonNull {
                    PREC_POSTFIX
                } else {
                    PREC_RELATIONAL
                }
            }
            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => PREC_CALL,
            Expr::Spread(_) | Expr::Elided { .. } | Expr::Unsupported(_) => PREC_ASSIGN,
            _ => PREC_PRIMARY,
        }
    }

    /// Print `expr`, parenthesized when it binds looser than `min`.
    fn expr(&mut self, expr: &Expr, min: u8) {
        let wrap = self.precedence(expr) < min;
        if wrap {
            self.out.push('(');
        }
        self.expr_inner(expr);
        if wrap {
            self.out.push(')');
        }
    }

    fn expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.out.push_str(name),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                self.callee(object);
                self.out.push_str(if *optional { "?." } else { "." });
                self.out.push_str(property);
            }
            Expr::Index { object, index } => {
                self.callee(object);
                self.out.push('[');
                self.expr(index, PREC_ASSIGN);
                self.out.push(']');
            }
            Expr::Call {
                callee,
                args,
                type_args,
            } => {
                self.callee(callee);
                if let (Some(t), false) = (type_args, self.erased()) {
                    self.out.push_str(t);
                }
                self.out.push('(');
                self.list(args);
                self.out.push(')');
            }
            Expr::Object(props) => self.object(props),
            Expr::Array(items) => {
                self.out.push('[');
                self.list(items);
                self.out.push(']');
            }
            Expr::Spread(inner) => {
                self.out.push_str("...");
                self.expr(inner, PREC_ASSIGN);
            }
            Expr::Function(func) => self.function(func),
            Expr::Str(s) => self.out.push_str(&quote(s)),
            Expr::Num(raw) => self.out.push_str(raw),
            Expr::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Expr::Null => self.out.push_str("null"),
            Expr::Undefined => self.out.push_str("undefined"),
            Expr::Template { quasis, exprs } => {
                self.out.push('`');
                for (i, quasi) in quasis.iter().enumerate() {
                    self.out.push_str(&escape_template(quasi));
                    if let Some(e) = exprs.get(i) {
                        self.out.push_str("${");
                        self.expr(e, PREC_ASSIGN);
                        self.out.push('}');
                    }
                }
                self.out.push('`');
            }
            Expr::Unary { op, arg } => {
                self.out.push_str(op);
                if op.chars().all(|c| c.is_ascii_alphabetic()) {
                    self.out.push(' ');
                }
                self.expr(arg, PREC_UNARY);
            }
            Expr::Binary { op, left, right } => {
                let prec = binary_precedence(op);
                // `**` is right-associative.
                let (lmin, rmin) = if op == "**" {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.expr(left, lmin);
                self.out.push(' ');
                self.out.push_str(op);
                self.out.push(' ');
                self.expr(right, rmin);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test, PREC_CONDITIONAL + 1);
                self.out.push_str(" ? ");
                self.expr(consequent, PREC_ASSIGN);
                self.out.push_str(" : ");
                self.expr(alternate, PREC_ASSIGN);
            }
            Expr::TypeAssertion { expr: inner, kind } => {
                if self.erased() {
                    self.expr_inner(inner);
                    return;
                }
                match kind {
                    Assertion::NonNull => {
                        self.expr(inner, PREC_POSTFIX);
                        self.out.push('!');
                    }
                    Assertion::As(ty) => {
                        self.expr(inner, PREC_RELATIONAL);
                        self.out.push_str(" as ");
                        self.out.push_str(ty);
                    }
                    Assertion::Satisfies(ty) => {
                        self.expr(inner, PREC_RELATIONAL);
                        self.out.push_str(" satisfies ");
                        self.out.push_str(ty);
                    }
                }
            }
            Expr::Elided { role } => {
                self.out.push_str("/* ");
                self.out.push_str(ELIDED_MARKER);
                self.out.push_str(role);
                self.out.push_str(" */ (() => {})");
            }
            Expr::Unsupported(text) => self.out.push_str(text),
        }
    }

    /// Callee or member object position. Object literals and functions
    /// need parentheses there as well.
    fn callee(&mut self, expr: &Expr) {
        match expr.unwrap_assertions_if(self.erased()) {
            Expr::Object(_) | Expr::Function(_) => {
                self.out.push('(');
                self.expr_inner(expr);
                self.out.push(')');
            }
            _ => self.expr(expr, PREC_CALL),
        }
    }

    fn list(&mut self, items: &[Expr]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(item, PREC_ASSIGN);
        }
    }

    fn object(&mut self, props: &[Prop]) {
        if props.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{ ");
        for (i, prop) in props.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            match prop {
                Prop::KeyValue { key, value } => {
                    self.prop_key(key);
                    self.out.push_str(": ");
                    self.expr(value, PREC_ASSIGN);
                }
                Prop::Shorthand(name) => self.out.push_str(name),
                Prop::Spread(inner) => {
                    self.out.push_str("...");
                    self.expr(inner, PREC_ASSIGN);
                }
            }
        }
        self.out.push_str(" }");
    }

    fn prop_key(&mut self, key: &PropKey) {
        match key {
            PropKey::Ident(name) => self.out.push_str(name),
            PropKey::Str(s) => self.out.push_str(&quote(s)),
            PropKey::Num(raw) => self.out.push_str(raw),
            PropKey::Computed(inner) => {
                self.out.push('[');
                self.expr(inner, PREC_ASSIGN);
                self.out.push(']');
            }
        }
    }

    fn function(&mut self, func: &Function) {
        if func.is_async {
            self.out.push_str("async ");
        }
        if !func.is_arrow {
            self.out.push_str("function");
            if let Some(name) = &func.name {
                self.out.push(' ');
                self.out.push_str(name);
            }
        }
        if let (Some(t), false) = (&func.type_params, self.erased()) {
            self.out.push_str(t);
        }
        self.out.push('(');
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.pattern(param);
        }
        self.out.push(')');
        if let (Some(t), false) = (&func.return_type, self.erased()) {
            self.out.push_str(": ");
            self.out.push_str(t);
        }
        if func.is_arrow {
            self.out.push_str(" => ");
        } else {
            self.out.push(' ');
        }
        match &func.body {
            FunctionBody::Expr(body) => {
                if matches!(body.unwrap_assertions_if(self.erased()), Expr::Object(_)) {
                    self.out.push('(');
                    self.expr_inner(body);
                    self.out.push(')');
                } else {
                    self.expr(body, PREC_ASSIGN);
                }
            }
            FunctionBody::Block(stmts) => self.block(stmts),
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        if stmts.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{ ");
        for stmt in stmts {
            self.stmt(stmt);
            self.out.push(' ');
        }
        self.out.push('}');
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl {
                kind,
                pattern,
                init,
            } => {
                self.out.push_str(kind.as_str());
                self.out.push(' ');
                self.pattern(pattern);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.expr(init, PREC_ASSIGN);
                }
                self.out.push(';');
            }
            Stmt::Return(value) => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.expr(value, PREC_ASSIGN);
                }
                self.out.push(';');
            }
            Stmt::Expr(e) => {
                if matches!(e, Expr::Object(_) | Expr::Function(_)) {
                    self.out.push('(');
                    self.expr_inner(e);
                    self.out.push(')');
                } else {
                    self.expr(e, PREC_ASSIGN);
                }
                self.out.push(';');
            }
            Stmt::Unsupported(text) => self.out.push_str(text),
        }
    }

    fn type_ann(&mut self, ty: &Option<String>) {
        if let (Some(t), false) = (ty, self.erased()) {
            self.out.push_str(": ");
            self.out.push_str(t);
        }
    }

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident {
                name,
                type_ann,
                optional,
            } => {
                self.out.push_str(name);
                if *optional && !self.erased() {
                    self.out.push('?');
                }
                self.type_ann(type_ann);
            }
            Pattern::Object { props, type_ann } => {
                if props.is_empty() {
                    self.out.push_str("{}");
                } else {
                    self.out.push_str("{ ");
                    for (i, prop) in props.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        match prop {
                            PatternProp::KeyValue { key, value } => {
                                self.pattern_prop(key, value);
                            }
                            PatternProp::Rest(inner) => {
                                self.out.push_str("...");
                                self.pattern(inner);
                            }
                        }
                    }
                    self.out.push_str(" }");
                }
                self.type_ann(type_ann);
            }
            Pattern::Array { elems, type_ann } => {
                self.out.push('[');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if let Some(p) = elem {
                        self.pattern(p);
                    }
                }
                self.out.push(']');
                self.type_ann(type_ann);
            }
            Pattern::Default { pattern, default } => {
                self.pattern(pattern);
                self.out.push_str(" = ");
                self.expr(default, PREC_ASSIGN);
            }
            Pattern::Rest(inner) => {
                self.out.push_str("...");
                self.pattern(inner);
            }
            Pattern::Unsupported(text) => self.out.push_str(text),
        }
    }

    fn pattern_prop(&mut self, key: &str, value: &Pattern) {
        let shorthand = match value {
            Pattern::Ident { name, type_ann: None, .. } => name == key,
            Pattern::Default { pattern, .. } => matches!(
                pattern.as_ref(),
                Pattern::Ident { name, type_ann: None, .. } if name == key
            ),
            _ => false,
        };
        if !shorthand {
            if is_identifier_name(key) {
                self.out.push_str(key);
            } else {
                self.out.push_str(&quote(key));
            }
            self.out.push_str(": ");
        }
        self.pattern(value);
    }
}

impl Expr {
    fn unwrap_assertions_if(&self, erased: bool) -> &Expr {
        if erased {
            self.unwrap_assertions()
        } else {
            self
        }
    }
}

fn escape_template(s: &str) -> String {
    s.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${")
}

pub fn is_identifier_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
