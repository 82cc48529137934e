
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use ureq::Agent;
use url::Url;

use crate::apis::format::truncate_chars;

/// User agent attached to every outbound request
pub const USER_AGENT: &str = "mcp-civic-data/0.1.0";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const MAX_REDIRECTS: u32 = 10;
const BODY_EXCERPT_CHARS: usize = 200;

/// Failure of a single outbound request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid JSON response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid request URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Ordered list of query parameters for a single request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    #[inline]
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Replace every existing value for `key`, or append it if absent
    #[inline]
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.0.retain(|(existing, _)| *existing != key);
        self.0.push((key, value.into()));
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert a caller-supplied JSON object into query parameters.
    ///
    /// Strings are used verbatim, numbers and booleans use their JSON text,
    /// arrays are comma-joined and nulls are dropped.
    #[inline]
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let mut params = Self::new();
        for (key, value) in map {
            if let Some(text) = query_value_text(value) {
                params.push(key.as_str(), text);
            }
        }
        params
    }
}

fn query_value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(query_value_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

/// Shared HTTP client for every API family.
///
/// Issues exactly one GET per call, never retries, and normalizes failures
/// into [`FetchError`]. Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: Agent,
    timeout: Duration,
}

impl HttpClient {
    #[inline]
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(USER_AGENT)
            .max_redirects(MAX_REDIRECTS)
            .http_status_as_error(false)
            .build()
            .into();

        Self { agent, timeout }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url` with `query` appended and decode the body as JSON.
    ///
    /// A successful response with an empty body decodes to `Value::Null`.
    #[inline]
    pub async fn get_json(&self, url: &str, query: &QueryParams) -> Result<Value, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let agent = self.agent.clone();
        let query = query.clone();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || fetch_blocking(&agent, &parsed, &query, timeout))
            .await
            .map_err(|e| FetchError::Transport(format!("request task failed: {}", e)))?
    }
}

impl Default for HttpClient {
    #[inline]
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
    }
}

fn fetch_blocking(
    agent: &Agent,
    url: &Url,
    query: &QueryParams,
    timeout: Duration,
) -> Result<Value, FetchError> {
    debug!(
        "GET {} (params: {:?})",
        url,
        query.iter().map(|(k, _)| k).collect::<Vec<_>>()
    );

    let mut request = agent.get(url.as_str());
    for (key, value) in query.iter() {
        request = request.query(key, value);
    }

    let mut response = request
        .call()
        .map_err(|e| classify_error(e, url, timeout))?;
    let status = response.status();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| classify_error(e, url, timeout))?;

    if !status.is_success() {
        debug!("HTTP request failed with status {}: {}", status, url);
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
            body: truncate_chars(&body, BODY_EXCERPT_CHARS),
        });
    }

    debug!("Read {} bytes from {}", body.len(), url);

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn classify_error(error: ureq::Error, url: &Url, timeout: Duration) -> FetchError {
    match error {
        ureq::Error::Timeout(_) => FetchError::Timeout {
            url: url.to_string(),
            seconds: timeout.as_secs(),
        },
        ureq::Error::StatusCode(status) => FetchError::HttpStatus {
            status,
            body: String::new(),
        },
        other => FetchError::Transport(other.to_string()),
    }
}
