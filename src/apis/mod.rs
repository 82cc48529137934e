//! Open-data API tool implementations
//!
//! One module per API family. Every operation takes an [`ApiContext`],
//! validates its arguments, performs zero or more GET requests through the
//! shared [`HttpClient`], and renders either a text summary or the raw JSON.


pub mod census;
pub mod datagov;
pub mod economics;
pub mod eu_data;
pub mod format;
pub mod nasa;
pub mod weather;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::http::{FetchError, HttpClient, QueryParams};
use crate::mcp::protocol::Tool;

/// Base URLs for every upstream API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub noaa: String,
    pub openweather: String,
    pub census: String,
    pub nasa: String,
    pub nasa_images: String,
    pub worldbank: String,
    pub datagov: String,
    pub eu_data: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            noaa: "https://api.weather.gov".to_string(),
            openweather: "https://api.openweathermap.org".to_string(),
            census: "https://api.census.gov/data".to_string(),
            nasa: "https://api.nasa.gov".to_string(),
            nasa_images: "https://images-api.nasa.gov".to_string(),
            worldbank: "https://api.worldbank.org/v2".to_string(),
            datagov: "https://catalog.data.gov/api/3".to_string(),
            eu_data: "https://data.europa.eu/api/hub/search".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every API at the same base URL, e.g. a local mock server
    #[inline]
    pub fn uniform(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            noaa: base.clone(),
            openweather: base.clone(),
            census: base.clone(),
            nasa: base.clone(),
            nasa_images: base.clone(),
            worldbank: base.clone(),
            datagov: base.clone(),
            eu_data: base,
        }
    }
}

/// Read-only state shared by every tool invocation
#[derive(Debug, Clone)]
pub struct ApiContext {
    pub config: Config,
    pub http: HttpClient,
    pub endpoints: Endpoints,
}

impl ApiContext {
    #[inline]
    pub fn new(config: Config) -> Self {
        let http = HttpClient::new(config.timeout());
        Self {
            config,
            http,
            endpoints: Endpoints::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Fetch JSON, tagging any failure with the API name
    pub(crate) async fn fetch(
        &self,
        api: &'static str,
        url: &str,
        query: &QueryParams,
    ) -> Result<Value, ToolError> {
        self.http
            .get_json(url, query)
            .await
            .map_err(ToolError::fetch(api))
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),

    #[error("{service} tools require {setting} environment variable")]
    ConfigurationMissing {
        service: &'static str,
        setting: &'static str,
    },

    #[error("{api} request failed: {source}")]
    Fetch {
        api: &'static str,
        #[source]
        source: FetchError,
    },

    #[error("Unexpected response from {api}: {message}")]
    UnexpectedResponse { api: &'static str, message: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolError {
    pub(crate) fn fetch(api: &'static str) -> impl FnOnce(FetchError) -> Self {
        move |source| Self::Fetch { api, source }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
}

#[cfg(test)]
impl ToolOutput {
    pub(crate) fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }
}

/// Groups of tools, one per API module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolGroup {
    Weather,
    Census,
    Nasa,
    Economics,
    DataGov,
    EuData,
}

impl ToolGroup {
    pub const ALL: [Self; 6] = [
        Self::Weather,
        Self::Census,
        Self::Nasa,
        Self::Economics,
        Self::DataGov,
        Self::EuData,
    ];

    #[inline]
    pub fn tools(self) -> Vec<Tool> {
        match self {
            Self::Weather => weather::tools(),
            Self::Census => census::tools(),
            Self::Nasa => nasa::tools(),
            Self::Economics => economics::tools(),
            Self::DataGov => datagov::tools(),
            Self::EuData => eu_data::tools(),
        }
    }

    #[inline]
    pub async fn dispatch(
        self,
        ctx: &ApiContext,
        name: &str,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        match self {
            Self::Weather => weather::dispatch(ctx, name, arguments).await,
            Self::Census => census::dispatch(ctx, name, arguments).await,
            Self::Nasa => nasa::dispatch(ctx, name, arguments).await,
            Self::Economics => economics::dispatch(ctx, name, arguments).await,
            Self::DataGov => datagov::dispatch(ctx, name, arguments).await,
            Self::EuData => eu_data::dispatch(ctx, name, arguments).await,
        }
    }
}

/// Arguments shared by the raw pass-through tools
#[derive(Debug, Deserialize)]
pub(crate) struct RawQueryArgs {
    pub endpoint: String,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

impl RawQueryArgs {
    pub(crate) fn query(&self) -> QueryParams {
        self.params
            .as_ref()
            .map(QueryParams::from_json_map)
            .unwrap_or_default()
    }
}

pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

pub(crate) fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

/// Join a base URL and a caller-supplied endpoint path
pub(crate) fn endpoint_url(base: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        base.to_string()
    } else if endpoint.starts_with('/') {
        format!("{}{}", base, endpoint)
    } else {
        format!("{}/{}", base, endpoint)
    }
}

/// Append path segments to a base URL. Each segment is percent-encoded, so
/// caller-supplied IDs cannot add path levels or a query string.
pub(crate) fn segment_url(
    api: &'static str,
    base: &str,
    segments: &[&str],
) -> Result<String, ToolError> {
    let invalid = |message: String| ToolError::Fetch {
        api,
        source: FetchError::InvalidUrl {
            url: base.to_string(),
            message,
        },
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot have path segments".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

/// Schema for the raw `{endpoint, params}` pass-through tools
pub(crate) fn raw_query_schema(endpoint_description: &str, params_description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "endpoint": {
                "type": "string",
                "description": endpoint_description
            },
            "params": {
                "type": "object",
                "description": params_description,
                "additionalProperties": true
            }
        },
        "required": ["endpoint"],
        "additionalProperties": false
    })
}
