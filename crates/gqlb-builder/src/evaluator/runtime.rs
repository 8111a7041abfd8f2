//! Element-builder runtime loaded into the sandbox
//!
//! Exposes the `gql` entry point, the kind registries (`models`, `slices`,
//! `operations`) and the `registry` registration hooks. Builders only record
//! the shape of each element: field selections, variables and whether a
//! runtime callback exists. Callbacks such as normalizers are never invoked.

use super::document::{
    print_operation, substitute, undeclared_variable, ArgValue, Arguments, Field,
    OperationType, Selection, VariableDefs,
};
use super::value::{Caller, EvalError, EvalResult, HostObject, Native, Scope, Value};
use gqlb_core::{CanonicalId, ElementKind};
use indexmap::IndexMap;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

// ── Element data ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub schema: String,
    pub typename: String,
    pub variables: VariableDefs,
    pub selections: Vec<Selection>,
    pub has_normalize: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub schema: String,
    pub operation_type: OperationType,
    pub variables: VariableDefs,
    pub selections: Vec<Selection>,
    pub has_projection: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub schema: String,
    pub operation_type: OperationType,
    pub operation_name: String,
    pub variables: VariableDefs,
    pub selections: Vec<Selection>,
    /// Slice labels for composed operations, empty for inline ones.
    pub slice_labels: Vec<String>,
    pub document: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementData {
    Model(Model),
    Slice(Slice),
    Operation(Operation),
}

impl ElementData {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementData::Model(_) => ElementKind::Model,
            ElementData::Slice(_) => ElementKind::Slice,
            ElementData::Operation(_) => ElementKind::Operation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredElement {
    pub id: CanonicalId,
    pub data: ElementData,
}

/// Elements registered by one unit, in registration order.
pub type RegistryDelta = Vec<RegisteredElement>;

// ── Runtime ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct ElementStore {
    elements: IndexMap<String, (ElementKind, Value)>,
    pending: RegistryDelta,
}

/// The element-builder runtime. Cheap to clone; clones share the store.
#[derive(Debug, Clone)]
pub struct GqlRuntime {
    schemas: Rc<Vec<String>>,
    store: Rc<RefCell<ElementStore>>,
}

impl GqlRuntime {
    pub fn new(schemas: Vec<String>) -> Self {
        GqlRuntime {
            schemas: Rc::new(schemas),
            store: Rc::new(RefCell::new(ElementStore::default())),
        }
    }

    /// Declare the runtime's globals.
    pub fn install(&self, globals: &Rc<Scope>) {
        globals.declare(
            "gql",
            Value::host(GqlEntry {
                schemas: self.schemas.clone(),
            }),
        );
        globals.declare(
            "registry",
            Value::host(RegistryHooks {
                store: self.store.clone(),
            }),
        );
        for kind in [ElementKind::Model, ElementKind::Slice, ElementKind::Operation] {
            globals.declare(
                kind.registry_name(),
                Value::host(RegistryView {
                    kind,
                    store: self.store.clone(),
                }),
            );
        }
    }

    /// Registrations since the last call.
    pub fn take_delta(&self) -> RegistryDelta {
        std::mem::take(&mut self.store.borrow_mut().pending)
    }

    /// Forget registrations of a failed unit.
    pub fn discard_pending(&self) {
        let mut store = self.store.borrow_mut();
        let pending = std::mem::take(&mut store.pending);
        for element in pending {
            store.elements.shift_remove(element.id.as_str());
        }
    }

    pub fn len(&self) -> usize {
        self.store.borrow().elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Entry point and factories ───────────────────────────

#[derive(Debug)]
struct GqlEntry {
    schemas: Rc<Vec<String>>,
}

impl HostObject for GqlEntry {
    fn type_name(&self) -> &'static str {
        "gql"
    }

    fn get(&self, key: &str) -> EvalResult<Value> {
        if !self.schemas.iter().any(|s| s == key) {
            return Err(EvalError::Runtime(format!(
                "Unknown schema \"{}\"; configured schemas: {}",
                key,
                self.schemas.join(", ")
            )));
        }
        let schema = key.to_string();
        Ok(Native::new(format!("gql.{}", key), move |caller, args| {
            let callback = args
                .first()
                .filter(|v| v.is_callable())
                .ok_or_else(|| {
                    EvalError::Type(format!("gql.{} expects a builder callback", schema))
                })?;
            caller.call_value(callback, vec![element_tools(&schema)])
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn element_tools(schema: &str) -> Value {
    let mut tools = IndexMap::new();
    tools.insert(
        "model".to_string(),
        Value::host(ModelFactory {
            schema: schema.to_string(),
        }),
    );
    for operation_type in [
        OperationType::Query,
        OperationType::Mutation,
        OperationType::Subscription,
    ] {
        tools.insert(
            operation_type.as_str().to_string(),
            Value::host(OperationFactory {
                schema: schema.to_string(),
                operation_type,
            }),
        );
    }
    Value::object(tools)
}

/// `{ f, $ }` passed to field builders.
fn field_tools() -> Value {
    let mut tools = IndexMap::new();
    tools.insert("f".to_string(), Value::host(FieldFactory));
    tools.insert("$".to_string(), Value::host(VariableRefs));
    Value::object(tools)
}

/// `model.<Typename>(variables, fields, normalize?)`
#[derive(Debug)]
struct ModelFactory {
    schema: String,
}

impl HostObject for ModelFactory {
    fn type_name(&self) -> &'static str {
        "model"
    }

    fn get(&self, typename: &str) -> EvalResult<Value> {
        let schema = self.schema.clone();
        let typename = typename.to_string();
        Ok(Native::new(format!("model.{}", typename), move |caller, args| {
            let variables = variable_defs(args.first(), "model variables")?;
            let selections = build_selections(caller, args.get(1))?;
            if let Some(name) = undeclared_variable(&selections, &variables) {
                return Err(EvalError::Runtime(format!(
                    "Variable \"${}\" is not declared by model {}",
                    name, typename
                )));
            }
            Ok(Value::host(ModelElement(Rc::new(Model {
                schema: schema.clone(),
                typename: typename.clone(),
                variables,
                selections,
                has_normalize: args.get(2).is_some_and(Value::is_callable),
            }))))
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `query.slice`, `query.composed`, `query.inline` and the mutation and
/// subscription equivalents.
#[derive(Debug)]
struct OperationFactory {
    schema: String,
    operation_type: OperationType,
}

impl HostObject for OperationFactory {
    fn type_name(&self) -> &'static str {
        self.operation_type.as_str()
    }

    fn get(&self, key: &str) -> EvalResult<Value> {
        let schema = self.schema.clone();
        let operation_type = self.operation_type;
        let name = format!("{}.{}", operation_type.as_str(), key);
        Ok(match key {
            "slice" => Native::new(name, move |caller, args| {
                build_slice(caller, &schema, operation_type, &args)
            }),
            "composed" => Native::new(name, move |caller, args| {
                build_composed(caller, &schema, operation_type, &args)
            }),
            "inline" => Native::new(name, move |caller, args| {
                build_inline(caller, &schema, operation_type, &args)
            }),
            _ => Value::Undefined,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn build_slice(
    caller: &mut dyn Caller,
    schema: &str,
    operation_type: OperationType,
    args: &[Value],
) -> EvalResult<Value> {
    let variables = variable_defs(args.first(), "slice variables")?;
    let selections = build_selections(caller, args.get(1))?;
    if let Some(name) = undeclared_variable(&selections, &variables) {
        return Err(EvalError::Runtime(format!(
            "Variable \"${}\" is not declared by the slice",
            name
        )));
    }
    Ok(Value::host(SliceElement(Rc::new(Slice {
        schema: schema.to_string(),
        operation_type,
        variables,
        selections,
        has_projection: args.get(2).is_some_and(Value::is_callable),
    }))))
}

struct OperationOptions {
    name: String,
    variables: VariableDefs,
}

fn operation_options(value: Option<&Value>) -> EvalResult<OperationOptions> {
    let Some(Value::Object(options)) = value else {
        return Err(EvalError::Type(
            "operation options must be an object with operationName".to_string(),
        ));
    };
    let name = options
        .get("operationName")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EvalError::Type("operationName must be a non-empty string".to_string()))?;
    Ok(OperationOptions {
        name: name.to_string(),
        variables: variable_defs(options.get("variables"), "operation variables")?,
    })
}

fn build_composed(
    caller: &mut dyn Caller,
    schema: &str,
    operation_type: OperationType,
    args: &[Value],
) -> EvalResult<Value> {
    let options = operation_options(args.first())?;
    let builder = args
        .get(1)
        .filter(|v| v.is_callable())
        .ok_or_else(|| EvalError::Type("composed operations need a slices builder".to_string()))?;

    let mut tools = IndexMap::new();
    tools.insert("$".to_string(), Value::host(VariableRefs));
    let slices = caller.call_value(builder, vec![Value::object(tools)])?;
    let Value::Object(slices) = slices else {
        return Err(EvalError::Type(format!(
            "slices builder of {} must return an object",
            options.name
        )));
    };

    let mut selections = Vec::new();
    let mut labels = Vec::new();
    for (label, value) in slices.iter() {
        let Some(build) = value.downcast::<SliceBuild>() else {
            return Err(EvalError::Type(format!(
                "\"{}\" in {} is not a built slice (got {})",
                label,
                options.name,
                value.describe()
            )));
        };
        if build.slice.operation_type != operation_type {
            return Err(EvalError::Runtime(format!(
                "Slice \"{}\" is a {} slice but {} is a {}",
                label,
                build.slice.operation_type.as_str(),
                options.name,
                operation_type.as_str()
            )));
        }
        for selection in &build.selections {
            selections.push(match selection {
                Selection::Field(field) => Selection::Field(Field {
                    alias: Some(format!("{}_{}", label, field.response_key())),
                    ..field.clone()
                }),
                other => other.clone(),
            });
        }
        labels.push(label.clone());
    }

    if let Some(name) = undeclared_variable(&selections, &options.variables) {
        return Err(EvalError::Runtime(format!(
            "Variable \"${}\" is not declared in operation {}",
            name, options.name
        )));
    }

    let document = print_operation(operation_type, &options.name, &options.variables, &selections);
    Ok(Value::host(OperationElement(Rc::new(Operation {
        schema: schema.to_string(),
        operation_type,
        operation_name: options.name,
        variables: options.variables,
        selections,
        slice_labels: labels,
        document,
    }))))
}

fn build_inline(
    caller: &mut dyn Caller,
    schema: &str,
    operation_type: OperationType,
    args: &[Value],
) -> EvalResult<Value> {
    let options = operation_options(args.first())?;
    let selections = build_selections(caller, args.get(1))?;
    if let Some(name) = undeclared_variable(&selections, &options.variables) {
        return Err(EvalError::Runtime(format!(
            "Variable \"${}\" is not declared in operation {}",
            name, options.name
        )));
    }
    let document = print_operation(operation_type, &options.name, &options.variables, &selections);
    Ok(Value::host(OperationElement(Rc::new(Operation {
        schema: schema.to_string(),
        operation_type,
        operation_name: options.name,
        variables: options.variables,
        selections,
        slice_labels: Vec::new(),
        document,
    }))))
}

// ── Fields and variables ────────────────────────────────

/// `f.<field>(args?, nested?, options?)`
#[derive(Debug)]
struct FieldFactory;

impl HostObject for FieldFactory {
    fn type_name(&self) -> &'static str {
        "f"
    }

    fn get(&self, name: &str) -> EvalResult<Value> {
        let name = name.to_string();
        Ok(Native::new(format!("f.{}", name), move |caller, args| {
            let mut field = Field {
                alias: None,
                name: name.clone(),
                args: Arguments::new(),
                selections: Vec::new(),
            };
            let mut seen_builder = false;
            for arg in &args {
                match arg {
                    Value::Function(_) | Value::Native(_) => {
                        field.selections = build_selections(caller, Some(arg))?;
                        seen_builder = true;
                    }
                    Value::Object(options) if seen_builder => {
                        field.alias = options
                            .get("alias")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                    }
                    Value::Object(map) => {
                        for (key, value) in map.iter() {
                            if let Some(value) = to_arg(value)? {
                                field.args.insert(key.clone(), value);
                            }
                        }
                    }
                    Value::Undefined | Value::Null => {}
                    other => {
                        return Err(EvalError::Type(format!(
                            "unexpected {} passed to f.{}",
                            other.describe(),
                            name
                        )))
                    }
                }
            }
            Ok(Value::host(SelectionValue(Selection::Field(field))))
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `$`: every property is a variable reference.
#[derive(Debug)]
struct VariableRefs;

impl HostObject for VariableRefs {
    fn type_name(&self) -> &'static str {
        "$"
    }

    fn get(&self, name: &str) -> EvalResult<Value> {
        Ok(Value::host(VariableRef(name.to_string())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct VariableRef(String);

impl HostObject for VariableRef {
    fn type_name(&self) -> &'static str {
        "variable"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct SelectionValue(Selection);

impl HostObject for SelectionValue {
    fn type_name(&self) -> &'static str {
        "selection"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Call a field builder with `{ f, $ }` and flatten its result.
fn build_selections(caller: &mut dyn Caller, builder: Option<&Value>) -> EvalResult<Vec<Selection>> {
    let Some(builder) = builder.filter(|v| v.is_callable()) else {
        return Err(EvalError::Type("expected a field builder function".to_string()));
    };
    let result = caller.call_value(builder, vec![field_tools()])?;
    let mut out = Vec::new();
    flatten_selections(&result, &mut out)?;
    Ok(out)
}

fn flatten_selections(value: &Value, out: &mut Vec<Selection>) -> EvalResult<()> {
    match value {
        Value::Array(items) => {
            for item in items.iter() {
                flatten_selections(item, out)?;
            }
            Ok(())
        }
        other => match other.downcast::<SelectionValue>() {
            Some(selection) => {
                out.push(selection.0.clone());
                Ok(())
            }
            None => Err(EvalError::Type(format!(
                "field builders must return selections, got {}",
                other.describe()
            ))),
        },
    }
}

fn variable_defs(value: Option<&Value>, what: &str) -> EvalResult<VariableDefs> {
    match value {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(VariableDefs::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, ty)| match ty.as_str() {
                Some(ty) if !ty.trim().is_empty() => Ok((name.clone(), ty.trim().to_string())),
                _ => Err(EvalError::Type(format!(
                    "type of variable \"{}\" in {} must be a string",
                    name, what
                ))),
            })
            .collect(),
        Some(other) => Err(EvalError::Type(format!(
            "{} must be an object, got {}",
            what,
            other.describe()
        ))),
    }
}

/// Field argument from a sandbox value; `undefined` omits the argument.
fn to_arg(value: &Value) -> EvalResult<Option<ArgValue>> {
    if let Some(var) = value.downcast::<VariableRef>() {
        return Ok(Some(ArgValue::Variable(var.0.clone())));
    }
    Ok(Some(match value {
        Value::Undefined => return Ok(None),
        Value::Null => ArgValue::Null,
        Value::Bool(b) => ArgValue::Bool(*b),
        Value::Num(n) => ArgValue::Num(*n),
        Value::Str(s) => ArgValue::Str(s.to_string()),
        Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items.iter() {
                if let Some(v) = to_arg(item)? {
                    list.push(v);
                }
            }
            ArgValue::List(list)
        }
        Value::Object(map) => {
            let mut obj = IndexMap::new();
            for (k, v) in map.iter() {
                if let Some(v) = to_arg(v)? {
                    obj.insert(k.clone(), v);
                }
            }
            ArgValue::Object(obj)
        }
        other => {
            return Err(EvalError::Type(format!(
                "{} cannot be used as a field argument",
                other.describe()
            )))
        }
    }))
}

fn to_arguments(value: Option<&Value>) -> EvalResult<Arguments> {
    match value {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(Arguments::new()),
        Some(Value::Object(map)) => {
            let mut out = Arguments::new();
            for (k, v) in map.iter() {
                if let Some(v) = to_arg(v)? {
                    out.insert(k.clone(), v);
                }
            }
            Ok(out)
        }
        Some(other) => Err(EvalError::Type(format!(
            "arguments must be an object, got {}",
            other.describe()
        ))),
    }
}

// ── Elements ────────────────────────────────────────────

#[derive(Debug)]
struct ModelElement(Rc<Model>);

impl HostObject for ModelElement {
    fn type_name(&self) -> &'static str {
        "model"
    }

    fn get(&self, key: &str) -> EvalResult<Value> {
        let model = self.0.clone();
        Ok(match key {
            "typename" => Value::str(&model.typename),
            // Spreads the model's fields as `... on <Typename>`.
            "fragment" => Native::new("fragment", move |_, args| {
                let args = to_arguments(args.first())?;
                let selections = substitute(&model.selections, &model.variables, &args)
                    .map_err(|e| EvalError::Runtime(format!("{}.fragment: {}", model.typename, e)))?;
                Ok(Value::host(SelectionValue(Selection::InlineFragment {
                    type_condition: model.typename.clone(),
                    selections,
                })))
            }),
            _ => Value::Undefined,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct SliceElement(Rc<Slice>);

impl HostObject for SliceElement {
    fn type_name(&self) -> &'static str {
        "slice"
    }

    fn get(&self, key: &str) -> EvalResult<Value> {
        let slice = self.0.clone();
        Ok(match key {
            "operationType" => Value::str(slice.operation_type.as_str()),
            "build" => Native::new("build", move |_, args| {
                let args = to_arguments(args.first())?;
                let selections = substitute(&slice.selections, &slice.variables, &args)
                    .map_err(|e| EvalError::Runtime(format!("slice.build: {}", e)))?;
                Ok(Value::host(SliceBuild {
                    slice: slice.clone(),
                    selections,
                }))
            }),
            _ => Value::Undefined,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A slice with its variables bound by `build(args)`.
#[derive(Debug)]
struct SliceBuild {
    slice: Rc<Slice>,
    selections: Vec<Selection>,
}

impl HostObject for SliceBuild {
    fn type_name(&self) -> &'static str {
        "built slice"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct OperationElement(Rc<Operation>);

impl HostObject for OperationElement {
    fn type_name(&self) -> &'static str {
        "operation"
    }

    fn get(&self, key: &str) -> EvalResult<Value> {
        Ok(match key {
            "operationName" => Value::str(&self.0.operation_name),
            "operationType" => Value::str(self.0.operation_type.as_str()),
            "document" => Value::str(&self.0.document),
            _ => Value::Undefined,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn element_data(value: &Value) -> Option<ElementData> {
    if let Some(model) = value.downcast::<ModelElement>() {
        return Some(ElementData::Model((*model.0).clone()));
    }
    if let Some(slice) = value.downcast::<SliceElement>() {
        return Some(ElementData::Slice((*slice.0).clone()));
    }
    if let Some(operation) = value.downcast::<OperationElement>() {
        return Some(ElementData::Operation((*operation.0).clone()));
    }
    None
}

// ── Registry ────────────────────────────────────────────

/// `registry.model(id, element)` and friends; write-once per id.
#[derive(Debug)]
struct RegistryHooks {
    store: Rc<RefCell<ElementStore>>,
}

impl HostObject for RegistryHooks {
    fn type_name(&self) -> &'static str {
        "registry"
    }

    fn get(&self, key: &str) -> EvalResult<Value> {
        let kind = match key {
            "model" => ElementKind::Model,
            "slice" => ElementKind::Slice,
            "operation" => ElementKind::Operation,
            _ => return Ok(Value::Undefined),
        };
        let store = self.store.clone();
        Ok(Native::new(format!("registry.{}", key), move |_, args| {
            let raw_id = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| EvalError::Type("registry id must be a string".to_string()))?;
            let id = CanonicalId::parse(raw_id)
                .ok_or_else(|| EvalError::Runtime(format!("Invalid canonical id \"{}\"", raw_id)))?;
            let value = args.get(1).cloned().unwrap_or(Value::Undefined);
            let data = element_data(&value)
                .filter(|d| d.kind() == kind)
                .ok_or_else(|| {
                    EvalError::Type(format!(
                        "{} must evaluate to a {} element, got {}",
                        id,
                        kind.hook_name(),
                        value.describe()
                    ))
                })?;

            let mut store = store.borrow_mut();
            if store.elements.contains_key(id.as_str()) {
                return Err(EvalError::Collision(format!(
                    "Element {} is already registered",
                    id
                )));
            }
            store.elements.insert(id.as_str().to_string(), (kind, value));
            store.pending.push(RegisteredElement { id, data });
            Ok(Value::Undefined)
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `models["<id>"]`: elements registered by earlier units.
#[derive(Debug)]
struct RegistryView {
    kind: ElementKind,
    store: Rc<RefCell<ElementStore>>,
}

impl HostObject for RegistryView {
    fn type_name(&self) -> &'static str {
        self.kind.registry_name()
    }

    fn get(&self, id: &str) -> EvalResult<Value> {
        match self.store.borrow().elements.get(id) {
            Some((kind, value)) if *kind == self.kind => Ok(value.clone()),
            _ => Err(EvalError::Runtime(format!(
                "No {} registered under {}",
                self.kind.hook_name(),
                id
            ))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::sandbox::Interpreter;
    use gqlb_analyzer::parser_pool::{FileType, ParserPool};
    use gqlb_analyzer::syntax::SourceParser;

    fn run(runtime: &GqlRuntime, source: &str) -> EvalResult<Value> {
        let program = SourceParser::new(ParserPool::new(1))
            .parse_program(source, FileType::JavaScript)
            .unwrap();
        let globals = Scope::root();
        runtime.install(&globals);
        Interpreter::new(globals).run(&program)
    }

    fn runtime() -> GqlRuntime {
        GqlRuntime::new(vec!["default".to_string()])
    }

    const USER_MODEL: &str = r#"
registry.model("/src/user.ts::userModel", gql.default(({ model }) =>
  model.User({ withName: "Boolean" }, ({ f, $ }) => [f.id(), f.name({ full: $.withName })], (raw) => raw)));
"#;

    #[test]
    fn test_model_registration() {
        let rt = runtime();
        run(&rt, USER_MODEL).unwrap();

        let delta = rt.take_delta();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].id.as_str(), "/src/user.ts::userModel");
        let ElementData::Model(model) = &delta[0].data else {
            panic!("expected a model");
        };
        assert_eq!(model.typename, "User");
        assert!(model.has_normalize);
        assert_eq!(model.selections.len(), 2);
        assert!(rt.take_delta().is_empty());
    }

    #[test]
    fn test_composed_operation_document() {
        let rt = runtime();
        let source = format!(
            "{}{}",
            USER_MODEL,
            r#"
registry.slice("/src/user.ts::userSlice", gql.default(({ query }) =>
  query.slice({ id: "ID!" }, ({ f, $ }) => [f.user({ id: $.id }, () => [models["/src/user.ts::userModel"].fragment({ withName: true })])])));
registry.operation("/src/page.ts::pageQuery", gql.default(({ query }) =>
  query.composed({ operationName: "PageQuery", variables: { userId: "ID!" } }, ({ $ }) => ({
    main: slices["/src/user.ts::userSlice"].build({ id: $.userId }),
  }))));
"#
        );
        run(&rt, &source).unwrap();

        let delta = rt.take_delta();
        let ElementData::Operation(op) = &delta[2].data else {
            panic!("expected an operation");
        };
        assert_eq!(op.slice_labels, vec!["main".to_string()]);
        assert_eq!(
            op.document,
            "query PageQuery($userId: ID!) {\n  main_user: user(id: $userId) {\n    ... on User {\n      id\n      name(full: true)\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn test_inline_operation() {
        let rt = runtime();
        run(
            &rt,
            r#"registry.operation("/a.ts::op", gql.default(({ mutation }) =>
  mutation.inline({ operationName: "Ping", variables: {} }, ({ f }) => [f.ping({ at: [1, "x"] })])));"#,
        )
        .unwrap();
        let delta = rt.take_delta();
        let ElementData::Operation(op) = &delta[0].data else {
            panic!("expected an operation");
        };
        assert_eq!(op.operation_type, OperationType::Mutation);
        assert_eq!(op.document, "mutation Ping {\n  ping(at: [1, \"x\"])\n}\n");
    }

    #[test]
    fn test_duplicate_registration_collides() {
        let rt = runtime();
        let err = run(&rt, &format!("{}{}", USER_MODEL, USER_MODEL)).unwrap_err();
        assert!(matches!(err, EvalError::Collision(_)));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let rt = runtime();
        let err = run(
            &rt,
            r#"registry.slice("/a.ts::m", gql.default(({ model }) => model.A({}, ({ f }) => [f.id()])));"#,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Type(msg) if msg.contains("slice element")));
    }

    #[test]
    fn test_unknown_schema() {
        let err = run(&runtime(), "gql.admin(() => null);").unwrap_err();
        assert!(matches!(err, EvalError::Runtime(msg) if msg.contains("Unknown schema \"admin\"")));
    }

    #[test]
    fn test_undeclared_variable() {
        let err = run(
            &runtime(),
            r#"gql.default(({ model }) => model.A({}, ({ f, $ }) => [f.node({ id: $.id })]));"#,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Runtime(msg) if msg.contains("\"$id\"")));
    }

    #[test]
    fn test_lookup_of_unregistered_element() {
        let err = run(&runtime(), r#"models["/a.ts::missing"].fragment();"#).unwrap_err();
        assert!(matches!(err, EvalError::Runtime(msg) if msg.contains("No model registered")));
    }

    #[test]
    fn test_discard_pending() {
        let rt = runtime();
        run(&rt, USER_MODEL).unwrap();
        rt.discard_pending();
        assert!(rt.is_empty());
        run(&rt, USER_MODEL).unwrap();
        assert_eq!(rt.len(), 1);
    }
}
