//! Lowering of tree-sitter syntax trees into the expression AST

use super::ast::*;
use tree_sitter::Node;

/// Lowers nodes of one source text. Comments are dropped everywhere.
pub struct Lowerer<'s> {
    src: &'s str,
}

impl<'s> Lowerer<'s> {
    pub fn new(src: &'s str) -> Self {
        Lowerer { src }
    }

    pub fn text(&self, node: Node) -> &'s str {
        &self.src[node.byte_range()]
    }

    fn named_children<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .collect()
    }

    fn first_named<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        self.named_children(node).into_iter().next()
    }

    fn unsupported(&self, node: Node) -> Expr {
        Expr::Unsupported(self.text(node).to_string())
    }

    pub fn expr(&self, node: Node) -> Expr {
        match node.kind() {
            "identifier" => Expr::Ident(self.text(node).to_string()),
            "undefined" => Expr::Undefined,
            "null" => Expr::Null,
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            "number" => Expr::Num(self.text(node).to_string()),
            "string" => Expr::Str(self.string_value(node)),
            "template_string" => self.template(node),
            "parenthesized_expression" => match self.first_named(node) {
                Some(inner) => self.expr(inner),
                None => self.unsupported(node),
            },
            "member_expression" => {
                let (Some(object), Some(property)) = (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("property"),
                ) else {
                    return self.unsupported(node);
                };
                Expr::Member {
                    object: Box::new(self.expr(object)),
                    property: self.text(property).to_string(),
                    optional: node.child_by_field_name("optional_chain").is_some(),
                }
            }
            "subscript_expression" => {
                let (Some(object), Some(index)) = (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("index"),
                ) else {
                    return self.unsupported(node);
                };
                Expr::index(self.expr(object), self.expr(index))
            }
            "call_expression" => self.call(node),
            "object" => Expr::Object(self.object(node)),
            "array" => Expr::Array(
                self.named_children(node)
                    .into_iter()
                    .map(|c| self.expr(c))
                    .collect(),
            ),
            "spread_element" => match self.first_named(node) {
                Some(inner) => Expr::Spread(Box::new(self.expr(inner))),
                None => self.unsupported(node),
            },
            "arrow_function" | "function_expression" | "function" => {
                Expr::Function(Box::new(self.function(node)))
            }
            "unary_expression" => {
                let (Some(op), Some(arg)) = (
                    node.child_by_field_name("operator"),
                    node.child_by_field_name("argument"),
                ) else {
                    return self.unsupported(node);
                };
                Expr::Unary {
                    op: self.text(op).to_string(),
                    arg: Box::new(self.expr(arg)),
                }
            }
            "binary_expression" => {
                let (Some(left), Some(op), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("operator"),
                    node.child_by_field_name("right"),
                ) else {
                    return self.unsupported(node);
                };
                Expr::Binary {
                    op: self.text(op).to_string(),
                    left: Box::new(self.expr(left)),
                    right: Box::new(self.expr(right)),
                }
            }
            "ternary_expression" => {
                let (Some(test), Some(cons), Some(alt)) = (
                    node.child_by_field_name("condition"),
                    node.child_by_field_name("consequence"),
                    node.child_by_field_name("alternative"),
                ) else {
                    return self.unsupported(node);
                };
                Expr::Conditional {
                    test: Box::new(self.expr(test)),
                    consequent: Box::new(self.expr(cons)),
                    alternate: Box::new(self.expr(alt)),
                }
            }
            "as_expression" | "satisfies_expression" => {
                let Some(inner) = self.first_named(node) else {
                    return self.unsupported(node);
                };
                let keyword = if node.kind() == "as_expression" { "as" } else { "satisfies" };
                let ty = self.src[inner.end_byte()..node.end_byte()]
                    .trim()
                    .trim_start_matches(keyword)
                    .trim()
                    .to_string();
                let kind = if keyword == "as" {
                    Assertion::As(ty)
                } else {
                    Assertion::Satisfies(ty)
                };
                Expr::TypeAssertion {
                    expr: Box::new(self.expr(inner)),
                    kind,
                }
            }
            "non_null_expression" => match self.first_named(node) {
                Some(inner) => Expr::TypeAssertion {
                    expr: Box::new(self.expr(inner)),
                    kind: Assertion::NonNull,
                },
                None => self.unsupported(node),
            },
            _ => self.unsupported(node),
        }
    }

    fn call(&self, node: Node) -> Expr {
        let (Some(callee), Some(arguments)) = (
            node.child_by_field_name("function"),
            node.child_by_field_name("arguments"),
        ) else {
            return self.unsupported(node);
        };
        // Tagged templates are outside the subset.
        if arguments.kind() != "arguments" {
            return self.unsupported(node);
        }
        Expr::Call {
            callee: Box::new(self.expr(callee)),
            args: self
                .named_children(arguments)
                .into_iter()
                .map(|a| self.expr(a))
                .collect(),
            type_args: node
                .child_by_field_name("type_arguments")
                .map(|t| self.text(t).to_string()),
        }
    }

    fn object(&self, node: Node) -> Vec<Prop> {
        let mut props = Vec::new();
        for child in self.named_children(node) {
            match child.kind() {
                "pair" => {
                    let (Some(key), Some(value)) = (
                        child.child_by_field_name("key"),
                        child.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    props.push(Prop::KeyValue {
                        key: self.prop_key(key),
                        value: self.expr(value),
                    });
                }
                "shorthand_property_identifier" => {
                    props.push(Prop::Shorthand(self.text(child).to_string()));
                }
                "spread_element" => {
                    if let Some(inner) = self.first_named(child) {
                        props.push(Prop::Spread(self.expr(inner)));
                    }
                }
                "method_definition" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let mut func = self.function(child);
                    func.is_arrow = false;
                    props.push(Prop::KeyValue {
                        key: self.prop_key(name),
                        value: Expr::Function(Box::new(func)),
                    });
                }
                _ => {}
            }
        }
        props
    }

    fn prop_key(&self, node: Node) -> PropKey {
        match node.kind() {
            "string" => PropKey::Str(self.string_value(node)),
            "number" => PropKey::Num(self.text(node).to_string()),
            "computed_property_name" => match self.first_named(node) {
                Some(inner) => PropKey::Computed(Box::new(self.expr(inner))),
                None => PropKey::Ident(self.text(node).to_string()),
            },
            _ => PropKey::Ident(self.text(node).to_string()),
        }
    }

    pub fn function(&self, node: Node) -> Function {
        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

        let params = if let Some(single) = node.child_by_field_name("parameter") {
            vec![self.pattern(single)]
        } else if let Some(list) = node.child_by_field_name("parameters") {
            self.named_children(list)
                .into_iter()
                .map(|p| self.parameter(p))
                .collect()
        } else {
            Vec::new()
        };

        let body = match node.child_by_field_name("body") {
            Some(b) if b.kind() == "statement_block" => FunctionBody::Block(self.block(b)),
            Some(b) => FunctionBody::Expr(Box::new(self.expr(b))),
            None => FunctionBody::Block(Vec::new()),
        };

        Function {
            is_arrow: node.kind() == "arrow_function",
            is_async,
            name: node
                .child_by_field_name("name")
                .filter(|_| node.kind() != "method_definition")
                .map(|n| self.text(n).to_string()),
            type_params: node
                .child_by_field_name("type_parameters")
                .map(|t| self.text(t).to_string()),
            params,
            return_type: node
                .child_by_field_name("return_type")
                .map(|t| self.type_annotation(t)),
            body,
        }
    }

    fn parameter(&self, node: Node) -> Pattern {
        match node.kind() {
            "required_parameter" | "optional_parameter" => {
                let Some(pattern) = node.child_by_field_name("pattern") else {
                    return Pattern::Unsupported(self.text(node).to_string());
                };
                let mut lowered = self.pattern(pattern);
                if let Some(ty) = node.child_by_field_name("type") {
                    set_type_ann(&mut lowered, self.type_annotation(ty));
                }
                if node.kind() == "optional_parameter" {
                    if let Pattern::Ident { optional, .. } = &mut lowered {
                        *optional = true;
                    }
                }
                match node.child_by_field_name("value") {
                    Some(value) => Pattern::Default {
                        pattern: Box::new(lowered),
                        default: Box::new(self.expr(value)),
                    },
                    None => lowered,
                }
            }
            _ => self.pattern(node),
        }
    }

    /// Text of a `type_annotation` node without its leading `:`.
    fn type_annotation(&self, node: Node) -> String {
        self.text(node).trim_start_matches(':').trim().to_string()
    }

    pub fn pattern(&self, node: Node) -> Pattern {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                Pattern::ident(self.text(node))
            }
            "object_pattern" => {
                let mut props = Vec::new();
                for child in self.named_children(node) {
                    match child.kind() {
                        "pair_pattern" => {
                            let (Some(key), Some(value)) = (
                                child.child_by_field_name("key"),
                                child.child_by_field_name("value"),
                            ) else {
                                continue;
                            };
                            let key = match key.kind() {
                                "string" => self.string_value(key),
                                _ => self.text(key).to_string(),
                            };
                            props.push(PatternProp::KeyValue {
                                key,
                                value: self.pattern(value),
                            });
                        }
                        "shorthand_property_identifier_pattern" => {
                            let name = self.text(child).to_string();
                            props.push(PatternProp::KeyValue {
                                key: name.clone(),
                                value: Pattern::ident(name),
                            });
                        }
                        "object_assignment_pattern" => {
                            let (Some(left), Some(right)) = (
                                child.child_by_field_name("left"),
                                child.child_by_field_name("right"),
                            ) else {
                                continue;
                            };
                            let name = self.text(left).to_string();
                            props.push(PatternProp::KeyValue {
                                key: name.clone(),
                                value: Pattern::Default {
                                    pattern: Box::new(self.pattern(left)),
                                    default: Box::new(self.expr(right)),
                                },
                            });
                        }
                        "rest_pattern" => {
                            if let Some(inner) = self.first_named(child) {
                                props.push(PatternProp::Rest(self.pattern(inner)));
                            }
                        }
                        _ => {}
                    }
                }
                Pattern::Object {
                    props,
                    type_ann: None,
                }
            }
            "array_pattern" => {
                let mut elems = Vec::new();
                let mut expecting = true;
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    match child.kind() {
                        "[" | "comment" => {}
                        "," | "]" => {
                            if expecting && child.kind() == "," {
                                elems.push(None);
                            }
                            expecting = true;
                        }
                        _ if child.is_named() => {
                            elems.push(Some(self.pattern(child)));
                            expecting = false;
                        }
                        _ => {}
                    }
                }
                Pattern::Array {
                    elems,
                    type_ann: None,
                }
            }
            "assignment_pattern" => {
                let (Some(left), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) else {
                    return Pattern::Unsupported(self.text(node).to_string());
                };
                Pattern::Default {
                    pattern: Box::new(self.pattern(left)),
                    default: Box::new(self.expr(right)),
                }
            }
            "rest_pattern" => match self.first_named(node) {
                Some(inner) => Pattern::Rest(Box::new(self.pattern(inner))),
                None => Pattern::Unsupported(self.text(node).to_string()),
            },
            _ => Pattern::Unsupported(self.text(node).to_string()),
        }
    }

    /// Statements of a `statement_block` or `program`.
    pub fn block(&self, node: Node) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        for child in self.named_children(node) {
            self.statement(child, &mut stmts);
        }
        stmts
    }

    fn statement(&self, node: Node, out: &mut Vec<Stmt>) {
        match node.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let kind = if node.kind() == "variable_declaration" {
                    DeclKind::Var
                } else if self.text(node).starts_with("let") {
                    DeclKind::Let
                } else {
                    DeclKind::Const
                };
                for declarator in self.named_children(node) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(name) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    let mut pattern = self.pattern(name);
                    if let Some(ty) = declarator.child_by_field_name("type") {
                        set_type_ann(&mut pattern, self.type_annotation(ty));
                    }
                    out.push(Stmt::Decl {
                        kind,
                        pattern,
                        init: declarator.child_by_field_name("value").map(|v| self.expr(v)),
                    });
                }
            }
            "return_statement" => {
                out.push(Stmt::Return(self.first_named(node).map(|e| self.expr(e))));
            }
            "expression_statement" => {
                if let Some(e) = self.first_named(node) {
                    out.push(Stmt::Expr(self.expr(e)));
                }
            }
            "empty_statement" => {}
            _ => out.push(Stmt::Unsupported(self.text(node).to_string())),
        }
    }

    pub fn string_value(&self, node: Node) -> String {
        let mut out = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "string_fragment" => out.push_str(self.text(child)),
                "escape_sequence" => out.push_str(&decode_escape(self.text(child))),
                _ => {}
            }
        }
        out
    }

    fn template(&self, node: Node) -> Expr {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "string_fragment" => current.push_str(self.text(child)),
                "escape_sequence" => current.push_str(&decode_escape(self.text(child))),
                "template_substitution" => {
                    let Some(inner) = self.first_named(child) else {
                        return self.unsupported(node);
                    };
                    quasis.push(std::mem::take(&mut current));
                    exprs.push(self.expr(inner));
                }
                _ => {}
            }
        }
        quasis.push(current);
        Expr::Template { quasis, exprs }
    }
}

fn set_type_ann(pattern: &mut Pattern, ty: String) {
    match pattern {
        Pattern::Ident { type_ann, .. }
        | Pattern::Object { type_ann, .. }
        | Pattern::Array { type_ann, .. } => *type_ann = Some(ty),
        Pattern::Default { pattern, .. } => set_type_ann(pattern, ty),
        _ => {}
    }
}

/// Decode one escape sequence (`\n`, `\x41`, `\u{1F600}`...).
pub fn decode_escape(seq: &str) -> String {
    let body = seq.strip_prefix('\\').unwrap_or(seq);
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest: String = chars.collect();
    let simple = match first {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        '0' if rest.is_empty() => Some('\0'),
        _ => None,
    };
    if let Some(c) = simple {
        return c.to_string();
    }
    match first {
        'x' | 'u' => {
            let hex = rest.trim_start_matches('{').trim_end_matches('}');
            u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| body.to_string())
        }
        '\n' | '\r' => String::new(),
        other => format!("{}{}", other, rest),
    }
}
