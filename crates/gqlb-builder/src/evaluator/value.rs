//! Sandbox values
//!
//! Plain data is immutable once built. Everything the runtime exposes to user
//! code is a [`HostObject`] or a [`Native`] function; the sandbox never hands
//! out filesystem, clock or environment access.

use gqlb_analyzer::syntax::Function;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("{0}")]
    Runtime(String),

    /// A second registration under the same id or document name.
    #[error("{0}")]
    Collision(String),

    #[error("Maximum call depth of {0} exceeded")]
    DepthExceeded(usize),

    #[error("Unsupported syntax: {0}")]
    Unsupported(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Calls back into the interpreter from native code.
pub trait Caller {
    fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> EvalResult<Value>;
}

/// Object implemented by the host and exposed to sandboxed code.
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &'static str;

    /// Property read; missing properties are `undefined`.
    fn get(&self, _key: &str) -> EvalResult<Value> {
        Ok(Value::Undefined)
    }

    fn as_any(&self) -> &dyn Any;
}

type NativeFn = dyn Fn(&mut dyn Caller, Vec<Value>) -> EvalResult<Value>;

pub struct Native {
    pub name: String,
    func: Box<NativeFn>,
}

impl Native {
    pub fn new<F>(name: impl Into<String>, func: F) -> Value
    where
        F: Fn(&mut dyn Caller, Vec<Value>) -> EvalResult<Value> + 'static,
    {
        Value::Native(Rc::new(Native {
            name: name.into(),
            func: Box::new(func),
        }))
    }

    pub fn invoke(&self, caller: &mut dyn Caller, args: Vec<Value>) -> EvalResult<Value> {
        (self.func)(caller, args)
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[native {}]", self.name)
    }
}

/// A user function with its defining scope.
#[derive(Debug)]
pub struct Closure {
    pub func: Rc<Function>,
    pub env: Rc<Scope>,
}

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<IndexMap<String, Value>>),
    Function(Rc<Closure>),
    Native(Rc<Native>),
    Host(Rc<dyn HostObject>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn object(map: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(map))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }

    pub fn host<T: HostObject + 'static>(obj: T) -> Self {
        Value::Host(Rc::new(obj))
    }

    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Host(obj) => obj.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) | Value::Object(_) | Value::Host(_) => "object",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    /// Name used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Host(obj) => obj.type_name().to_string(),
            Value::Native(n) => format!("function {}", n.name),
            Value::Array(_) => "array".to_string(),
            other => other.type_of().to_string(),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Null => 0.0,
            Value::Str(s) => {
                let t = s.trim();
                if t.is_empty() {
                    0.0
                } else {
                    t.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// String conversion as in template literals and `+`.
    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Num(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_display() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) | Value::Host(_) => "[object Object]".to_string(),
            Value::Function(_) | Value::Native(_) => "function".to_string(),
        }
    }

    /// Strict equality; reference types compare by identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Num(_), Value::Str(_)) | (Value::Str(_), Value::Num(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_eq(other),
        }
    }
}

/// Numbers print like JavaScript: integral values without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ── Scopes ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Scope {
    vars: RefCell<FxHashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Rc<Scope> {
        Rc::new(Scope::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            vars: RefCell::new(FxHashMap::default()),
            parent: Some(parent.clone()),
        })
    }

    pub fn declare(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }
}
