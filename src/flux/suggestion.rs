//! Function signatures used to annotate body nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Type of a call argument.
///
/// Parameter types come from the suggestion catalog; when a function or
/// parameter is not in the catalog the type is inferred from the literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Duration,
    Time,
    Int,
    Uint,
    Float,
    Bool,
    Regexp,
    Array,
    Object,
    Function,
    #[default]
    #[serde(other)]
    Invalid,
}

impl ArgType {
    /// Parse a catalog type name. Unknown names map to `Invalid`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "duration" => Self::Duration,
            "time" => Self::Time,
            "int" | "integer" => Self::Int,
            "uint" => Self::Uint,
            "float" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            "regexp" => Self::Regexp,
            "array" => Self::Array,
            "object" => Self::Object,
            "function" => Self::Function,
            _ => Self::Invalid,
        }
    }
}

/// A known function and its parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Suggestion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, arg_type: impl Into<String>) -> Self {
        self.params.insert(key.into(), arg_type.into());
        self
    }
}

/// Look up the declared type of `func`'s parameter `key`.
pub fn param_type(suggestions: &[Suggestion], func: &str, key: &str) -> Option<ArgType> {
    suggestions
        .iter()
        .find(|s| s.name == func)
        .and_then(|s| s.params.get(key))
        .map(|t| ArgType::from_name(t))
}
