//! Remote collaborators: parser, suggestion catalog, query execution and
//! config resolution.
//!
//! Each collaborator is an async trait so the engines can be driven by the
//! HTTP clients in [`http`] or by in-memory fakes in tests.
//!
//! ```text
//!   ScriptSync ──▶ FluxParser      (parse, suggestions)
//!        │
//!        └──────▶ QueryExecutor   (execute through a service proxy)
//!
//!   DraftStore ──▶ ConfigResolver  (raw text ─▶ structured config)
//! ```

mod error;
pub mod http;
pub mod notify;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::{ServiceError, ServiceResult};
pub use http::{FluxHttpClient, HttpConfigResolver};
pub use notify::{ChannelNotifier, LogNotifier, Notification, NotificationKind, Notifier};

use crate::flux::{Program, Suggestion, TimeSeriesResult};
use crate::query::QueryConfig;

/// A script-capable service, reached through its proxy link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "sourceID", default)]
    pub source_id: String,
    pub links: ServiceLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceLinks {
    pub proxy: String,
    #[serde(rename = "self", default)]
    pub self_link: String,
    #[serde(default)]
    pub source: String,
}

impl Service {
    /// A service reached directly through `proxy`.
    pub fn with_proxy(proxy: impl Into<String>) -> Self {
        Self {
            id: "local".to_string(),
            name: "local".to_string(),
            links: ServiceLinks {
                proxy: proxy.into(),
                ..ServiceLinks::default()
            },
            ..Self::default()
        }
    }
}

/// One raw query sent for resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub id: String,
}

/// The resolution service's answer for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedQuery {
    pub id: String,
    #[serde(default)]
    pub query: String,
    pub query_config: QueryConfig,
    /// Estimated span covered by the query's time range.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Remote script parser and function catalog.
#[async_trait]
pub trait FluxParser: Send + Sync {
    /// Parse `script` into a tree, or fail with [`ServiceError::Parse`]
    /// carrying the parser's diagnostic.
    async fn parse(&self, script: &str) -> ServiceResult<Program>;

    /// Fetch the catalog of available functions.
    async fn suggestions(&self) -> ServiceResult<Vec<Suggestion>>;
}

/// Responses larger than this are truncated unless configured otherwise.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10_000_000;

/// Remote script execution.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, service: &Service, script: &str) -> ServiceResult<TimeSeriesResult>;

    /// Size at which responses are truncated.
    fn max_response_bytes(&self) -> usize {
        DEFAULT_MAX_RESPONSE_BYTES
    }
}

/// Remote raw-text to structured-config resolution.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn resolve(&self, url: &str, queries: &[QueryRequest])
        -> ServiceResult<Vec<ResolvedQuery>>;
}
