//! Editor status line.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of the last parse, validation or fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "lowercase")]
pub enum ScriptStatus {
    /// No parse attempted, or the script is empty.
    #[default]
    None,
    /// A fetch is in flight.
    Loading,
    Success,
    /// The parser's diagnostic.
    Error(String),
}

impl ScriptStatus {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Diagnostic text, empty unless this is an error.
    pub fn text(&self) -> &str {
        match self {
            Self::Error(message) => message,
            _ => "",
        }
    }
}

impl fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error(message) => write!(f, "error: {}", message),
        }
    }
}
