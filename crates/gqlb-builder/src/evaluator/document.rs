//! GraphQL selection model and document printer

use crate::evaluator::value::format_number;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Variable name → GraphQL type, e.g. `"id" → "ID!"`.
pub type VariableDefs = IndexMap<String, String>;

pub type Arguments = IndexMap<String, ArgValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Variable(String),
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<ArgValue>),
    Object(IndexMap<String, ArgValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub args: Arguments,
    pub selections: Vec<Selection>,
}

impl Field {
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(Field),
    InlineFragment {
        type_condition: String,
        selections: Vec<Selection>,
    },
}

// ── Variables ───────────────────────────────────────────

/// Variable names used by `selections`, in first-use order.
pub fn used_variables(selections: &[Selection]) -> Vec<String> {
    let mut out = Vec::new();
    for selection in selections {
        collect_selection(selection, &mut out);
    }
    out
}

fn collect_selection(selection: &Selection, out: &mut Vec<String>) {
    match selection {
        Selection::Field(field) => {
            for value in field.args.values() {
                collect_arg(value, out);
            }
            for child in &field.selections {
                collect_selection(child, out);
            }
        }
        Selection::InlineFragment { selections, .. } => {
            for child in selections {
                collect_selection(child, out);
            }
        }
    }
}

fn collect_arg(value: &ArgValue, out: &mut Vec<String>) {
    match value {
        ArgValue::Variable(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        ArgValue::List(items) => items.iter().for_each(|v| collect_arg(v, out)),
        ArgValue::Object(map) => map.values().for_each(|v| collect_arg(v, out)),
        _ => {}
    }
}

/// First used variable that `declared` lacks.
pub fn undeclared_variable(selections: &[Selection], declared: &VariableDefs) -> Option<String> {
    used_variables(selections)
        .into_iter()
        .find(|name| !declared.contains_key(name))
}

/// Replace variables declared in `defs` by the matching `args` value.
/// A declared variable without an argument removes the field argument that
/// used it; a missing non-null variable is an error.
pub fn substitute(
    selections: &[Selection],
    defs: &VariableDefs,
    args: &Arguments,
) -> Result<Vec<Selection>, String> {
    if let Some(unknown) = args.keys().find(|k| !defs.contains_key(*k)) {
        return Err(format!("Unknown argument \"{}\"", unknown));
    }
    if let Some((name, ty)) = defs
        .iter()
        .find(|(name, ty)| ty.ends_with('!') && !args.contains_key(*name))
    {
        return Err(format!("Missing required argument \"{}\" of type {}", name, ty));
    }
    Ok(selections
        .iter()
        .map(|s| substitute_selection(s, defs, args))
        .collect())
}

fn substitute_selection(selection: &Selection, defs: &VariableDefs, args: &Arguments) -> Selection {
    match selection {
        Selection::Field(field) => Selection::Field(Field {
            alias: field.alias.clone(),
            name: field.name.clone(),
            args: field
                .args
                .iter()
                .filter_map(|(k, v)| substitute_arg(v, defs, args).map(|v| (k.clone(), v)))
                .collect(),
            selections: field
                .selections
                .iter()
                .map(|s| substitute_selection(s, defs, args))
                .collect(),
        }),
        Selection::InlineFragment {
            type_condition,
            selections,
        } => Selection::InlineFragment {
            type_condition: type_condition.clone(),
            selections: selections
                .iter()
                .map(|s| substitute_selection(s, defs, args))
                .collect(),
        },
    }
}

fn substitute_arg(value: &ArgValue, defs: &VariableDefs, args: &Arguments) -> Option<ArgValue> {
    match value {
        ArgValue::Variable(name) if defs.contains_key(name) => args.get(name).cloned(),
        ArgValue::List(items) => Some(ArgValue::List(
            items
                .iter()
                .filter_map(|v| substitute_arg(v, defs, args))
                .collect(),
        )),
        ArgValue::Object(map) => Some(ArgValue::Object(
            map.iter()
                .filter_map(|(k, v)| substitute_arg(v, defs, args).map(|v| (k.clone(), v)))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

// ── Printing ────────────────────────────────────────────

pub fn print_operation(
    operation_type: OperationType,
    name: &str,
    variables: &VariableDefs,
    selections: &[Selection],
) -> String {
    let mut out = String::new();
    out.push_str(operation_type.as_str());
    out.push(' ');
    out.push_str(name);
    if !variables.is_empty() {
        let defs: Vec<String> = variables
            .iter()
            .map(|(name, ty)| format!("${}: {}", name, ty))
            .collect();
        out.push('(');
        out.push_str(&defs.join(", "));
        out.push(')');
    }
    out.push(' ');
    print_selection_set(selections, 0, &mut out);
    out.push('\n');
    out
}

/// `{ ... }` block for `selections`, multi-line.
pub fn print_selections(selections: &[Selection]) -> String {
    let mut out = String::new();
    print_selection_set(selections, 0, &mut out);
    out
}

fn print_selection_set(selections: &[Selection], depth: usize, out: &mut String) {
    out.push_str("{\n");
    for selection in selections {
        indent(depth + 1, out);
        match selection {
            Selection::Field(field) => {
                if let Some(alias) = &field.alias {
                    out.push_str(alias);
                    out.push_str(": ");
                }
                out.push_str(&field.name);
                if !field.args.is_empty() {
                    out.push('(');
                    let args: Vec<String> = field
                        .args
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, print_arg(v)))
                        .collect();
                    out.push_str(&args.join(", "));
                    out.push(')');
                }
                if !field.selections.is_empty() {
                    out.push(' ');
                    print_selection_set(&field.selections, depth + 1, out);
                }
            }
            Selection::InlineFragment {
                type_condition,
                selections,
            } => {
                out.push_str("... on ");
                out.push_str(type_condition);
                out.push(' ');
                print_selection_set(selections, depth + 1, out);
            }
        }
        out.push('\n');
    }
    indent(depth, out);
    out.push('}');
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

pub fn print_arg(value: &ArgValue) -> String {
    match value {
        ArgValue::Variable(name) => format!("${}", name),
        ArgValue::Null => "null".to_string(),
        ArgValue::Bool(b) => b.to_string(),
        ArgValue::Num(n) => format_number(*n),
        ArgValue::Str(s) => {
            serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
        }
        ArgValue::List(items) => {
            let items: Vec<String> = items.iter().map(print_arg).collect();
            format!("[{}]", items.join(", "))
        }
        ArgValue::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, print_arg(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}
