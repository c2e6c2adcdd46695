//! The structured body tree and its projection from a parsed program.
//!
//! The tree is always recomputed wholesale from a `(Program, catalog)`
//! pair. Node ids are derived from position, so projecting the same pair
//! twice yields identical trees.

use serde::{Deserialize, Serialize};

use super::ast::{quote, CallExpression, Expression, Program, Statement};
use super::suggestion::{param_type, ArgType, Suggestion};

/// Separator placed between the calls of a chain.
pub const PIPE_SEPARATOR: &str = "\n\t|> ";

/// Separator placed between top-level bodies.
pub const BODY_SEPARATOR: &str = "\n\n";

/// Kind of top-level statement a body was projected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    /// A bare pipeline; its calls live in `funcs`.
    Expression,
    /// One or more `name = ...` declarations.
    Declaration,
    /// A statement kept verbatim (options, returns).
    Opaque,
}

/// A top-level element of the body tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub id: String,
    pub kind: BodyKind,
    /// Original text of the statement.
    pub source: String,
    pub funcs: Vec<Func>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: String,
    pub name: String,
    pub source: String,
    /// Empty when the initializer is not a call chain (`limit = 10`).
    pub funcs: Vec<Func>,
}

/// How a chain element is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuncKind {
    /// `name(args)`
    Call,
    /// A bare reference at the head of a chain (`cpu |> ...`).
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Func {
    pub id: String,
    pub name: String,
    pub kind: FuncKind,
    pub args: Vec<Arg>,
    pub source: String,
}

/// A named call argument. String values are stored unquoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
}

impl Arg {
    pub fn new(key: impl Into<String>, value: impl Into<String>, arg_type: ArgType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            arg_type,
        }
    }

    pub fn to_script(&self) -> String {
        match self.arg_type {
            ArgType::String => format!("{}: {}", self.key, quote(&self.value)),
            _ => format!("{}: {}", self.key, self.value),
        }
    }
}

impl Func {
    /// A new call with no arguments.
    pub fn call(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            source: format!("{}()", name),
            name,
            kind: FuncKind::Call,
            args: Vec::new(),
        }
    }

    pub fn is_yield(&self) -> bool {
        self.kind == FuncKind::Call && self.name == "yield"
    }

    pub fn to_script(&self) -> String {
        match self.kind {
            FuncKind::Reference => self.name.clone(),
            FuncKind::Call => {
                let args: Vec<String> = self
                    .args
                    .iter()
                    .filter(|a| !a.value.is_empty())
                    .map(Arg::to_script)
                    .collect();
                format!("{}({})", self.name, args.join(", "))
            }
        }
    }
}

/// Render a chain of calls.
pub fn funcs_to_script(funcs: &[Func]) -> String {
    funcs
        .iter()
        .map(Func::to_script)
        .collect::<Vec<_>>()
        .join(PIPE_SEPARATOR)
}

impl Declaration {
    pub fn to_script(&self) -> String {
        if self.funcs.is_empty() {
            return self.source.clone();
        }
        format!("{} = {}", self.name, funcs_to_script(&self.funcs))
    }
}

impl Body {
    /// Regenerate the text of this body from its nodes.
    pub fn to_script(&self) -> String {
        match self.kind {
            BodyKind::Expression if self.funcs.is_empty() => self.source.clone(),
            BodyKind::Expression => funcs_to_script(&self.funcs),
            BodyKind::Declaration => self
                .declarations
                .iter()
                .map(Declaration::to_script)
                .collect::<Vec<_>>()
                .join("\n"),
            BodyKind::Opaque => self.source.clone(),
        }
    }

    /// Text used for a body an edit did not touch: the original source
    /// when known, regenerated otherwise.
    pub fn source_or_script(&self) -> String {
        if self.source.is_empty() {
            self.to_script()
        } else {
            self.source.clone()
        }
    }

    pub fn declaration(&self, declaration_id: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.id == declaration_id)
    }
}

/// Regenerate a whole script from a body tree.
pub fn body_to_script(bodies: &[Body]) -> String {
    bodies
        .iter()
        .map(Body::to_script)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(BODY_SEPARATOR)
}

/// Project a parsed program onto the body tree.
pub fn body_nodes(program: &Program, suggestions: &[Suggestion]) -> Vec<Body> {
    program
        .body
        .iter()
        .enumerate()
        .filter_map(|(index, statement)| project_statement(index, statement, suggestions))
        .collect()
}

fn project_statement(index: usize, statement: &Statement, suggestions: &[Suggestion]) -> Option<Body> {
    let id = format!("body-{}", index);
    let source = statement.location_source().unwrap_or_default().to_string();

    let body = match statement {
        Statement::ExpressionStatement { expression, .. } => {
            let funcs = project_chain(&id, expression, suggestions);
            let source = if source.is_empty() {
                expression.source_text()
            } else {
                source
            };
            Body {
                id,
                kind: BodyKind::Expression,
                source,
                funcs,
                declarations: Vec::new(),
            }
        }
        Statement::VariableDeclaration { declarations, .. } => {
            let declarations: Vec<Declaration> = declarations
                .iter()
                .enumerate()
                .map(|(i, d)| project_declaration(&id, i, &d.id.name, &d.init, suggestions))
                .collect();
            let source = if source.is_empty() {
                declarations
                    .iter()
                    .map(|d| d.source.clone())
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                source
            };
            Body {
                id,
                kind: BodyKind::Declaration,
                source,
                funcs: Vec::new(),
                declarations,
            }
        }
        Statement::VariableAssignment { id: name, init, .. } => {
            let declaration = project_declaration(&id, 0, &name.name, init, suggestions);
            let source = if source.is_empty() {
                declaration.source.clone()
            } else {
                source
            };
            Body {
                id,
                kind: BodyKind::Declaration,
                source,
                funcs: Vec::new(),
                declarations: vec![declaration],
            }
        }
        Statement::OptionStatement { .. } | Statement::ReturnStatement { .. } => {
            if source.is_empty() {
                return None;
            }
            Body {
                id,
                kind: BodyKind::Opaque,
                source,
                funcs: Vec::new(),
                declarations: Vec::new(),
            }
        }
        Statement::Unsupported => return None,
    };

    Some(body)
}

fn project_declaration(
    body_id: &str,
    index: usize,
    name: &str,
    init: &Expression,
    suggestions: &[Suggestion],
) -> Declaration {
    let id = format!("{}/decl-{}", body_id, index);
    let funcs = match init {
        Expression::PipeExpression { .. } | Expression::CallExpression(_) => {
            project_chain(&id, init, suggestions)
        }
        _ => Vec::new(),
    };
    Declaration {
        source: format!("{} = {}", name, init.source_text()),
        name: name.to_string(),
        id,
        funcs,
    }
}

fn project_chain(parent_id: &str, expression: &Expression, suggestions: &[Suggestion]) -> Vec<Func> {
    let mut funcs = Vec::new();
    collect_chain(expression, suggestions, &mut funcs);
    for (i, func) in funcs.iter_mut().enumerate() {
        func.id = format!("{}/func-{}", parent_id, i);
    }
    funcs
}

fn collect_chain(expression: &Expression, suggestions: &[Suggestion], out: &mut Vec<Func>) {
    match expression {
        Expression::PipeExpression { argument, call, .. } => {
            collect_chain(argument, suggestions, out);
            out.push(project_call(call, suggestions));
        }
        Expression::CallExpression(call) => out.push(project_call(call, suggestions)),
        Expression::Identifier(id) => out.push(Func {
            id: String::new(),
            name: id.name.clone(),
            kind: FuncKind::Reference,
            args: Vec::new(),
            source: id.name.clone(),
        }),
        _ => {}
    }
}

fn project_call(call: &CallExpression, suggestions: &[Suggestion]) -> Func {
    let name = call.callee.callee_name();
    let args = call
        .properties()
        .iter()
        .map(|property| {
            let key = property.key_name();
            let inferred = property
                .value
                .as_ref()
                .map(infer_arg_type)
                .unwrap_or_default();
            let arg_type = param_type(suggestions, &name, &key).unwrap_or(inferred);
            let value = match &property.value {
                Some(Expression::StringLiteral { value, .. }) => value.clone(),
                Some(other) => other.source_text(),
                None => key.clone(),
            };
            Arg {
                key,
                value,
                arg_type,
            }
        })
        .collect();

    Func {
        id: String::new(),
        source: call.source_text(),
        name,
        kind: FuncKind::Call,
        args,
    }
}

/// Type of an argument whose function is not in the catalog.
fn infer_arg_type(expression: &Expression) -> ArgType {
    match expression {
        Expression::StringLiteral { .. } => ArgType::String,
        Expression::DurationLiteral { .. } => ArgType::Duration,
        Expression::DateTimeLiteral { .. } => ArgType::Time,
        Expression::IntegerLiteral { .. } => ArgType::Int,
        Expression::FloatLiteral { .. } => ArgType::Float,
        Expression::BooleanLiteral { .. } => ArgType::Bool,
        Expression::RegexpLiteral { .. } => ArgType::Regexp,
        Expression::ArrayExpression { .. } => ArgType::Array,
        Expression::ObjectExpression(_) => ArgType::Object,
        Expression::ArrowFunctionExpression { .. } => ArgType::Function,
        _ => ArgType::Invalid,
    }
}
