//! Error types for remote service calls.

use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that can occur while talking to the parser, execution or
/// config-resolution services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request could not be sent or the response could not be read.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Target URL.
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{url} returned {status}: {message}")]
    Status {
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Failed to decode a JSON response.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Failed to decode an annotated CSV response.
    #[error("failed to decode result tables: {0}")]
    Csv(#[from] csv::Error),

    /// The parser rejected the script.
    #[error("{0}")]
    Parse(String),

    /// The execution service returned an error table.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The resolution response did not contain the requested query.
    #[error("query {0} missing from resolution response")]
    MissingQuery(String),
}

impl ServiceError {
    /// Create a parse error from a parser diagnostic.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Check if the script itself was rejected, as opposed to a transport
    /// or server failure.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Text shown to the user in the editor status line.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Parse(message) | Self::Execution(message) => message.clone(),
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
