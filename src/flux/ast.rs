//! Typed mirror of the JSON tree returned by the remote parser.
//!
//! Only the node kinds the body projection looks into are modelled with
//! their children. Everything else is kept as a location-only node so that
//! its source text survives a round trip, and kinds this module does not
//! know at all deserialize to `Unsupported`.

use serde::{Deserialize, Serialize};

/// Source location attached to a node.
///
/// The parser also reports start/end positions; only the source slice is
/// used here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Root of a parsed script.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub body: Vec<Statement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Program {
    /// The empty sentinel used whenever the script is empty text.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True for a program with no statements.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    ExpressionStatement {
        expression: Expression,
        #[serde(default)]
        location: Option<Location>,
    },
    VariableDeclaration {
        #[serde(default)]
        declarations: Vec<VariableDeclarator>,
        #[serde(default)]
        location: Option<Location>,
    },
    /// Newer parsers emit assignments instead of single-declarator
    /// declarations.
    VariableAssignment {
        id: Identifier,
        init: Expression,
        #[serde(default)]
        location: Option<Location>,
    },
    OptionStatement {
        #[serde(default)]
        location: Option<Location>,
    },
    ReturnStatement {
        #[serde(default)]
        location: Option<Location>,
    },
    #[serde(other)]
    Unsupported,
}

impl Statement {
    /// Source slice reported by the parser, if any.
    pub fn location_source(&self) -> Option<&str> {
        let location = match self {
            Self::ExpressionStatement { location, .. }
            | Self::VariableDeclaration { location, .. }
            | Self::VariableAssignment { location, .. }
            | Self::OptionStatement { location }
            | Self::ReturnStatement { location } => location.as_ref(),
            Self::Unsupported => None,
        };
        location.and_then(|l| l.source.as_deref())
    }
}

/// `name = init` inside a variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarator {
    pub id: Identifier,
    pub init: Expression,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    #[serde(default)]
    pub arguments: Vec<Expression>,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectExpression {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub location: Option<Location>,
}

/// `key: value` inside an object. A missing value is the shorthand form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: Box<Expression>,
    #[serde(default)]
    pub value: Option<Expression>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Property {
    /// The property name, whether written as an identifier or a string.
    pub fn key_name(&self) -> String {
        match self.key.as_ref() {
            Expression::Identifier(id) => id.name.clone(),
            Expression::StringLiteral { value, .. } => value.clone(),
            other => other.source_text(),
        }
    }
}

/// One `magnitude unit` pair of a duration literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationValue {
    pub magnitude: i64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    PipeExpression {
        argument: Box<Expression>,
        call: CallExpression,
        #[serde(default)]
        location: Option<Location>,
    },
    CallExpression(CallExpression),
    Identifier(Identifier),
    ObjectExpression(ObjectExpression),
    ArrayExpression {
        #[serde(default)]
        elements: Vec<Expression>,
        #[serde(default)]
        location: Option<Location>,
    },
    MemberExpression {
        #[serde(default)]
        location: Option<Location>,
    },
    ArrowFunctionExpression {
        #[serde(default)]
        location: Option<Location>,
    },
    BinaryExpression {
        #[serde(default)]
        location: Option<Location>,
    },
    LogicalExpression {
        #[serde(default)]
        location: Option<Location>,
    },
    UnaryExpression {
        #[serde(default)]
        location: Option<Location>,
    },
    PipeLiteral {
        #[serde(default)]
        location: Option<Location>,
    },
    StringLiteral {
        value: String,
        #[serde(default)]
        location: Option<Location>,
    },
    IntegerLiteral {
        value: serde_json::Value,
        #[serde(default)]
        location: Option<Location>,
    },
    FloatLiteral {
        value: serde_json::Value,
        #[serde(default)]
        location: Option<Location>,
    },
    BooleanLiteral {
        value: bool,
        #[serde(default)]
        location: Option<Location>,
    },
    DurationLiteral {
        #[serde(default)]
        values: Vec<DurationValue>,
        #[serde(default)]
        location: Option<Location>,
    },
    DateTimeLiteral {
        value: String,
        #[serde(default)]
        location: Option<Location>,
    },
    RegexpLiteral {
        value: String,
        #[serde(default)]
        location: Option<Location>,
    },
    #[serde(other)]
    Unsupported,
}

impl Expression {
    /// Source slice reported by the parser, if any.
    pub fn location_source(&self) -> Option<&str> {
        let location = match self {
            Self::CallExpression(call) => call.location.as_ref(),
            Self::Identifier(id) => id.location.as_ref(),
            Self::ObjectExpression(object) => object.location.as_ref(),
            Self::PipeExpression { location, .. }
            | Self::ArrayExpression { location, .. }
            | Self::MemberExpression { location }
            | Self::ArrowFunctionExpression { location }
            | Self::BinaryExpression { location }
            | Self::LogicalExpression { location }
            | Self::UnaryExpression { location }
            | Self::PipeLiteral { location }
            | Self::StringLiteral { location, .. }
            | Self::IntegerLiteral { location, .. }
            | Self::FloatLiteral { location, .. }
            | Self::BooleanLiteral { location, .. }
            | Self::DurationLiteral { location, .. }
            | Self::DateTimeLiteral { location, .. }
            | Self::RegexpLiteral { location, .. } => location.as_ref(),
            Self::Unsupported => None,
        };
        location.and_then(|l| l.source.as_deref())
    }

    /// Render the expression back to script text.
    ///
    /// Uses the parser's source slice when present, otherwise rebuilds the
    /// text from the node. Location-only nodes without a slice render empty.
    pub fn source_text(&self) -> String {
        if let Some(source) = self.location_source() {
            return source.to_string();
        }

        match self {
            Self::PipeExpression { argument, call, .. } => {
                format!("{} |> {}", argument.source_text(), call.source_text())
            }
            Self::CallExpression(call) => call.source_text(),
            Self::Identifier(id) => id.name.clone(),
            Self::ObjectExpression(object) => object.source_text(),
            Self::ArrayExpression { elements, .. } => {
                let items: Vec<String> = elements.iter().map(|e| e.source_text()).collect();
                format!("[{}]", items.join(", "))
            }
            Self::StringLiteral { value, .. } => quote(value),
            Self::IntegerLiteral { value, .. } | Self::FloatLiteral { value, .. } => {
                json_scalar(value)
            }
            Self::BooleanLiteral { value, .. } => value.to_string(),
            Self::DurationLiteral { values, .. } => values
                .iter()
                .map(|v| format!("{}{}", v.magnitude, v.unit))
                .collect(),
            Self::DateTimeLiteral { value, .. } => value.clone(),
            Self::RegexpLiteral { value, .. } => format!("/{}/", value),
            _ => String::new(),
        }
    }

    /// Name used when this expression is a callee or chain head.
    pub fn callee_name(&self) -> String {
        match self {
            Self::Identifier(id) => id.name.clone(),
            other => other.source_text(),
        }
    }
}

impl CallExpression {
    pub fn source_text(&self) -> String {
        if let Some(source) = self.location.as_ref().and_then(|l| l.source.as_deref()) {
            return source.to_string();
        }
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|arg| match arg {
                // Call arguments are written without the surrounding braces.
                Expression::ObjectExpression(object) if object.location.is_none() => {
                    object.properties_text()
                }
                other => other.source_text(),
            })
            .collect();
        format!("{}({})", self.callee.callee_name(), args.join(", "))
    }

    /// Properties of the first argument when it is an object, which is how
    /// named call arguments arrive from the parser.
    pub fn properties(&self) -> &[Property] {
        match self.arguments.first() {
            Some(Expression::ObjectExpression(object)) => &object.properties,
            _ => &[],
        }
    }
}

impl ObjectExpression {
    pub fn source_text(&self) -> String {
        if let Some(source) = self.location.as_ref().and_then(|l| l.source.as_deref()) {
            return source.to_string();
        }
        format!("{{{}}}", self.properties_text())
    }

    fn properties_text(&self) -> String {
        let props: Vec<String> = self
            .properties
            .iter()
            .map(|p| match &p.value {
                Some(value) => format!("{}: {}", p.key_name(), value.source_text()),
                None => p.key_name(),
            })
            .collect();
        props.join(", ")
    }
}

/// Quote a string for use as a script string literal.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
