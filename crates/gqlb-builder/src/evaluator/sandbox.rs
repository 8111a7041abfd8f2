//! Tree-walking interpreter for synthesized units
//!
//! Runs the erased-TypeScript subset the printer emits: declarations,
//! returns, expression statements, literals, closures, member access, calls,
//! spreads, templates and the common operators. Assignment, loops and classes
//! are not part of element expressions and are rejected as unsupported.

use super::value::{Caller, Closure, EvalError, EvalResult, Scope, Value};
use gqlb_analyzer::syntax::{
    Expr, Function, FunctionBody, Pattern, PatternProp, Prop, PropKey, Stmt,
};
use indexmap::IndexMap;
use std::rc::Rc;

/// Call depth limit for user closures.
pub const MAX_CALL_DEPTH: usize = 64;

enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<Scope>,
    depth: usize,
    max_depth: usize,
}

impl Interpreter {
    pub fn new(globals: Rc<Scope>) -> Self {
        Interpreter {
            globals,
            depth: 0,
            max_depth: MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Run a statement list in a fresh scope below the globals.
    pub fn run(&mut self, program: &[Stmt]) -> EvalResult<Value> {
        let scope = Scope::child(&self.globals);
        match self.block(program, &scope)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Undefined),
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
        let scope = Scope::child(&self.globals);
        self.expr(expr, &scope)
    }

    // ── Statements ──────────────────────────────────────

    fn block(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> EvalResult<Flow> {
        for stmt in stmts {
            match stmt {
                Stmt::Decl { pattern, init, .. } => {
                    let value = match init {
                        Some(init) => self.expr(init, scope)?,
                        None => Value::Undefined,
                    };
                    self.bind(pattern, value, scope)?;
                }
                Stmt::Return(value) => {
                    let value = match value {
                        Some(e) => self.expr(e, scope)?,
                        None => Value::Undefined,
                    };
                    return Ok(Flow::Return(value));
                }
                Stmt::Expr(e) => {
                    self.expr(e, scope)?;
                }
                Stmt::Unsupported(text) => return Err(EvalError::Unsupported(snippet(text))),
            }
        }
        Ok(Flow::Normal)
    }

    fn bind(&mut self, pattern: &Pattern, value: Value, scope: &Rc<Scope>) -> EvalResult<()> {
        match pattern {
            Pattern::Ident { name, .. } => {
                scope.declare(name.clone(), value);
                Ok(())
            }
            Pattern::Default { pattern, default } => {
                let value = match value {
                    Value::Undefined => self.expr(default, scope)?,
                    other => other,
                };
                self.bind(pattern, value, scope)
            }
            Pattern::Object { props, .. } => {
                if value.is_nullish() {
                    return Err(EvalError::Type(format!(
                        "Cannot destructure '{}'",
                        value.to_display()
                    )));
                }
                let mut used: Vec<&str> = Vec::new();
                for prop in props {
                    match prop {
                        PatternProp::KeyValue { key, value: target } => {
                            let field = self.property(&value, key)?;
                            used.push(key);
                            self.bind(target, field, scope)?;
                        }
                        PatternProp::Rest(target) => {
                            let rest = match &value {
                                Value::Object(map) => map
                                    .iter()
                                    .filter(|(k, _)| !used.contains(&k.as_str()))
                                    .map(|(k, v)| (k.clone(), v.clone()))
                                    .collect(),
                                _ => IndexMap::new(),
                            };
                            self.bind(target, Value::object(rest), scope)?;
                        }
                    }
                }
                Ok(())
            }
            Pattern::Array { elems, .. } => {
                let items = match &value {
                    Value::Array(items) => items.clone(),
                    other => {
                        return Err(EvalError::Type(format!(
                            "{} is not iterable",
                            other.describe()
                        )))
                    }
                };
                for (i, elem) in elems.iter().enumerate() {
                    match elem {
                        Some(Pattern::Rest(target)) => {
                            let rest = items.iter().skip(i).cloned().collect();
                            self.bind(target, Value::array(rest), scope)?;
                            break;
                        }
                        Some(target) => {
                            let item = items.get(i).cloned().unwrap_or(Value::Undefined);
                            self.bind(target, item, scope)?;
                        }
                        None => {}
                    }
                }
                Ok(())
            }
            Pattern::Rest(inner) => self.bind(inner, value, scope),
            Pattern::Unsupported(text) => Err(EvalError::Unsupported(snippet(text))),
        }
    }

    // ── Expressions ─────────────────────────────────────

    fn expr(&mut self, expr: &Expr, scope: &Rc<Scope>) -> EvalResult<Value> {
        match expr {
            Expr::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| EvalError::Reference(name.clone())),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Num(raw) => Ok(Value::Num(parse_number(raw))),
            Expr::Str(s) => Ok(Value::str(s)),
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(e) = exprs.get(i) {
                        out.push_str(&self.expr(e, scope)?.to_display());
                    }
                }
                Ok(Value::str(out))
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let target = self.expr(object, scope)?;
                if *optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                self.property(&target, property)
            }
            Expr::Index { object, index } => {
                let target = self.expr(object, scope)?;
                let key = self.expr(index, scope)?.to_display();
                self.property(&target, &key)
            }
            Expr::Call { callee, args, .. } => {
                let callee_value = self.expr(callee, scope)?;
                let args = self.args(args, scope)?;
                if !callee_value.is_callable() {
                    return Err(EvalError::Type(format!(
                        "{} is not a function",
                        callee_name(callee)
                    )));
                }
                self.call_value(&callee_value, args)
            }
            Expr::Object(props) => self.object(props, scope),
            Expr::Array(items) => Ok(Value::array(self.args(items, scope)?)),
            Expr::Spread(_) => Err(EvalError::Unsupported("spread outside a list".to_string())),
            Expr::Function(func) => Ok(Value::Function(Rc::new(Closure {
                func: Rc::new(Function::clone(func)),
                env: scope.clone(),
            }))),
            Expr::Unary { op, arg } => {
                let value = self.expr(arg, scope)?;
                unary(op, value)
            }
            Expr::Binary { op, left, right } => match op.as_str() {
                "&&" => {
                    let l = self.expr(left, scope)?;
                    if l.truthy() { self.expr(right, scope) } else { Ok(l) }
                }
                "||" => {
                    let l = self.expr(left, scope)?;
                    if l.truthy() { Ok(l) } else { self.expr(right, scope) }
                }
                "??" => {
                    let l = self.expr(left, scope)?;
                    if l.is_nullish() { self.expr(right, scope) } else { Ok(l) }
                }
                _ => {
                    let l = self.expr(left, scope)?;
                    let r = self.expr(right, scope)?;
                    binary(op, l, r)
                }
            },
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.expr(test, scope)?.truthy() {
                    self.expr(consequent, scope)
                } else {
                    self.expr(alternate, scope)
                }
            }
            Expr::TypeAssertion { expr, .. } => self.expr(expr, scope),
            // Never called at build time.
            Expr::Elided { .. } => Ok(Value::Function(Rc::new(Closure {
                func: Rc::new(Function {
                    is_arrow: true,
                    is_async: false,
                    name: None,
                    type_params: None,
                    params: Vec::new(),
                    return_type: None,
                    body: FunctionBody::Block(Vec::new()),
                }),
                env: scope.clone(),
            }))),
            Expr::Unsupported(text) => Err(EvalError::Unsupported(snippet(text))),
        }
    }

    /// Evaluate a list with spreads flattened.
    fn args(&mut self, items: &[Expr], scope: &Rc<Scope>) -> EvalResult<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Expr::Spread(inner) => match self.expr(inner, scope)? {
                    Value::Array(values) => out.extend(values.iter().cloned()),
                    other => {
                        return Err(EvalError::Type(format!(
                            "{} is not iterable",
                            other.describe()
                        )))
                    }
                },
                other => out.push(self.expr(other, scope)?),
            }
        }
        Ok(out)
    }

    fn object(&mut self, props: &[Prop], scope: &Rc<Scope>) -> EvalResult<Value> {
        let mut map = IndexMap::new();
        for prop in props {
            match prop {
                Prop::KeyValue { key, value } => {
                    let key = match key {
                        PropKey::Computed(inner) => self.expr(inner, scope)?.to_display(),
                        PropKey::Num(raw) => format_key_number(raw),
                        other => other.name().unwrap_or_default().to_string(),
                    };
                    let value = self.expr(value, scope)?;
                    map.insert(key, value);
                }
                Prop::Shorthand(name) => {
                    let value = scope
                        .lookup(name)
                        .ok_or_else(|| EvalError::Reference(name.clone()))?;
                    map.insert(name.clone(), value);
                }
                Prop::Spread(inner) => match self.expr(inner, scope)? {
                    Value::Object(source) => {
                        for (k, v) in source.iter() {
                            map.insert(k.clone(), v.clone());
                        }
                    }
                    Value::Undefined | Value::Null => {}
                    other => {
                        return Err(EvalError::Type(format!(
                            "Cannot spread {} into an object",
                            other.describe()
                        )))
                    }
                },
            }
        }
        Ok(Value::object(map))
    }

    fn property(&mut self, target: &Value, key: &str) -> EvalResult<Value> {
        match target {
            Value::Undefined | Value::Null => Err(EvalError::Type(format!(
                "Cannot read properties of {} (reading '{}')",
                target.to_display(),
                key
            ))),
            Value::Object(map) => Ok(map.get(key).cloned().unwrap_or(Value::Undefined)),
            Value::Array(items) => {
                if key == "length" {
                    return Ok(Value::Num(items.len() as f64));
                }
                Ok(key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::Undefined))
            }
            Value::Str(s) if key == "length" => Ok(Value::Num(s.chars().count() as f64)),
            Value::Host(obj) => obj.get(key),
            _ => Ok(Value::Undefined),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        if self.depth >= self.max_depth {
            return Err(EvalError::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = self.invoke(closure, args);
        self.depth -= 1;
        result
    }

    fn invoke(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        let scope = Scope::child(&closure.env);
        let func = &closure.func;
        if let Some(name) = &func.name {
            scope.declare(
                name.clone(),
                Value::Function(Rc::new(Closure {
                    func: func.clone(),
                    env: closure.env.clone(),
                })),
            );
        }

        let mut args = args.into_iter();
        for param in &func.params {
            match param {
                Pattern::Rest(target) => {
                    let rest: Vec<Value> = args.by_ref().collect();
                    self.bind(target, Value::array(rest), &scope)?;
                }
                other => {
                    let value = args.next().unwrap_or(Value::Undefined);
                    self.bind(other, value, &scope)?;
                }
            }
        }

        match &func.body {
            FunctionBody::Expr(body) => self.expr(body, &scope),
            FunctionBody::Block(stmts) => match self.block(stmts, &scope)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            },
        }
    }
}

impl Caller for Interpreter {
    fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match callee {
            Value::Function(closure) => {
                let closure = closure.clone();
                self.call_closure(&closure, args)
            }
            Value::Native(native) => {
                let native = native.clone();
                native.invoke(self, args)
            }
            other => Err(EvalError::Type(format!(
                "{} is not a function",
                other.describe()
            ))),
        }
    }
}

fn unary(op: &str, value: Value) -> EvalResult<Value> {
    Ok(match op {
        "!" => Value::Bool(!value.truthy()),
        "-" => Value::Num(-value.to_number()),
        "+" => Value::Num(value.to_number()),
        "typeof" => Value::str(value.type_of()),
        "void" => Value::Undefined,
        other => return Err(EvalError::Unsupported(format!("operator {}", other))),
    })
}

fn binary(op: &str, l: Value, r: Value) -> EvalResult<Value> {
    let num = |f: fn(f64, f64) -> f64| Value::Num(f(l.to_number(), r.to_number()));
    Ok(match op {
        "+" => match (&l, &r) {
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Value::str(format!("{}{}", l.to_display(), r.to_display()))
            }
            _ => num(|a, b| a + b),
        },
        "-" => num(|a, b| a - b),
        "*" => num(|a, b| a * b),
        "/" => num(|a, b| a / b),
        "%" => num(|a, b| a % b),
        "**" => num(f64::powf),
        "===" => Value::Bool(l.strict_eq(&r)),
        "!==" => Value::Bool(!l.strict_eq(&r)),
        "==" => Value::Bool(l.loose_eq(&r)),
        "!=" => Value::Bool(!l.loose_eq(&r)),
        "<" | ">" | "<=" | ">=" => {
            let ordering = match (&l, &r) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => l.to_number().partial_cmp(&r.to_number()),
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Value::Bool(match op {
                "<" => ordering.is_lt(),
                ">" => ordering.is_gt(),
                "<=" => ordering.is_le(),
                _ => ordering.is_ge(),
            })
        }
        other => return Err(EvalError::Unsupported(format!("operator {}", other))),
    })
}

fn parse_number(raw: &str) -> f64 {
    let clean = raw.replace('_', "");
    let parsed = if let Some(hex) = clean.strip_prefix("0x").or_else(|| clean.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map(|n| n as f64).ok()
    } else if let Some(bin) = clean.strip_prefix("0b").or_else(|| clean.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).map(|n| n as f64).ok()
    } else if let Some(oct) = clean.strip_prefix("0o").or_else(|| clean.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).map(|n| n as f64).ok()
    } else {
        clean.parse().ok()
    };
    parsed.unwrap_or(f64::NAN)
}

fn format_key_number(raw: &str) -> String {
    super::value::format_number(parse_number(raw))
}

fn callee_name(expr: &Expr) -> String {
    expr.chain_path().unwrap_or_else(|| "expression".to_string())
}

fn snippet(text: &str) -> String {
    text.chars().take(40).collect()
}
