//! HTTP clients for the parser, execution and resolution services.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    ConfigResolver, FluxParser, QueryExecutor, QueryRequest, ResolvedQuery, Service,
    ServiceError, ServiceResult, DEFAULT_MAX_RESPONSE_BYTES,
};
use crate::config::{Settings, SettingsError};
use crate::flux::table::{parse_response, truncate_response};
use crate::flux::{Program, Suggestion, TimeSeriesResult};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Path appended to a service proxy link to run a script.
const QUERY_PATH: &str = "?path=/v2/query";

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn transport(url: &str) -> impl FnOnce(reqwest::Error) -> ServiceError + '_ {
    move |source| ServiceError::Transport {
        url: url.to_string(),
        source,
    }
}

/// Extract the server's `message` field, falling back to the raw body.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

/// Read a JSON body, or map a non-success status to [`ServiceError::Status`].
async fn read_json<T: serde::de::DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> ServiceResult<T> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport(url))?;
    if !status.is_success() {
        return Err(ServiceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    Ok(serde_json::from_slice(&body)?)
}

#[derive(Serialize)]
struct AstRequest<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct AstResponse {
    ast: Program,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionsResponse {
    Wrapped { funcs: Vec<Suggestion> },
    Bare(Vec<Suggestion>),
}

/// Client for the script parser, the suggestion catalog and script
/// execution.
#[derive(Clone)]
pub struct FluxHttpClient {
    client: reqwest::Client,
    ast_url: String,
    suggestions_url: String,
    max_response_bytes: usize,
}

impl FluxHttpClient {
    /// Creates a client with the default timeout and response cap.
    #[must_use]
    pub fn new(ast_url: impl Into<String>, suggestions_url: impl Into<String>) -> Self {
        Self {
            client: build_client(DEFAULT_REQUEST_TIMEOUT),
            ast_url: ast_url.into(),
            suggestions_url: suggestions_url.into(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Creates a client from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        Ok(Self {
            client: build_client(settings.execution.timeout()),
            ast_url: settings.ast_url()?,
            suggestions_url: settings.suggestions_url()?,
            max_response_bytes: settings.execution.max_response_bytes,
        })
    }

    /// Caps execution responses at `max_bytes`.
    #[must_use]
    pub fn with_max_response_bytes(mut self, max_bytes: usize) -> Self {
        self.max_response_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl FluxParser for FluxHttpClient {
    async fn parse(&self, script: &str) -> ServiceResult<Program> {
        let url = self.ast_url.as_str();
        let response = self
            .client
            .post(url)
            .json(&AstRequest { body: script })
            .send()
            .await
            .map_err(transport(url))?;

        // The parser reports bad scripts as client errors.
        if response.status().is_client_error() {
            let body = response.bytes().await.map_err(transport(url))?;
            return Err(ServiceError::parse(error_message(&body)));
        }

        let parsed: AstResponse = read_json(url, response).await?;
        Ok(parsed.ast)
    }

    async fn suggestions(&self) -> ServiceResult<Vec<Suggestion>> {
        let url = self.suggestions_url.as_str();
        let response = self.client.get(url).send().await.map_err(transport(url))?;
        let suggestions = match read_json::<SuggestionsResponse>(url, response).await? {
            SuggestionsResponse::Wrapped { funcs } => funcs,
            SuggestionsResponse::Bare(funcs) => funcs,
        };
        Ok(suggestions)
    }
}

#[async_trait]
impl QueryExecutor for FluxHttpClient {
    async fn execute(&self, service: &Service, script: &str) -> ServiceResult<TimeSeriesResult> {
        let url = format!("{}{}", service.links.proxy, QUERY_PATH);
        let mut response = self
            .client
            .post(&url)
            .json(&json!({
                "query": script,
                "dialect": { "annotations": ["group", "datatype", "default"] },
            }))
            .send()
            .await
            .map_err(transport(&url))?;

        let status = response.status();
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport(&url))? {
            body.extend_from_slice(&chunk);
            // Keep one byte past the cap so truncation is detected.
            if body.len() > self.max_response_bytes {
                break;
            }
        }

        if !status.is_success() {
            return Err(ServiceError::Status {
                url,
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let (text, did_truncate) = truncate_response(&body, self.max_response_bytes);
        let tables = parse_response(&text)?;
        Ok(TimeSeriesResult {
            tables,
            did_truncate,
        })
    }

    fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    queries: &'a [QueryRequest],
}

#[derive(Deserialize)]
struct ResolveResponse {
    queries: Vec<ResolvedQuery>,
}

/// Client for the raw-text resolution service.
#[derive(Clone)]
pub struct HttpConfigResolver {
    client: reqwest::Client,
}

impl HttpConfigResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: build_client(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
        }
    }
}

impl Default for HttpConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigResolver for HttpConfigResolver {
    async fn resolve(
        &self,
        url: &str,
        queries: &[QueryRequest],
    ) -> ServiceResult<Vec<ResolvedQuery>> {
        let response = self
            .client
            .post(url)
            .json(&ResolveRequest { queries })
            .send()
            .await
            .map_err(transport(url))?;
        let resolved: ResolveResponse = read_json(url, response).await?;
        Ok(resolved.queries)
    }
}
