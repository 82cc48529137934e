
use serde::Deserialize;
use serde_json::{Value, json};

use super::format::{NOT_AVAILABLE, localized, non_empty_text_or, text_or, truncate_chars};
use super::{
    ApiContext, RawQueryArgs, ToolError, ToolOutput, endpoint_url, parse_args, raw_query_schema,
    segment_url, tool,
};
use crate::http::QueryParams;
use crate::mcp::protocol::Tool;

pub const EU_DATA_API: &str = "EU Open Data";

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;
pub const MAX_DISTRIBUTIONS: usize = 10;
const MAX_DESCRIPTION_CHARS: usize = 200;

/// Number of results to request and render
#[inline]
pub fn clamp_limit(limit: i64) -> usize {
    // Clamped into 1..=50, so the cast is lossless
    limit.clamp(1, MAX_LIMIT) as usize
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DatasetArgs {
    dataset_id: String,
}

pub(crate) fn tools() -> Vec<Tool> {
    vec![
        tool(
            "search_eu_datasets",
            "Search for datasets on the European Union Open Data Portal.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search terms (e.g., 'environment', 'economy', 'transport')"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_LIMIT,
                        "description": "Number of results to return (default: 10, max: 50)"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        ),
        tool(
            "get_eu_dataset_info",
            "Get detailed metadata and distribution links for an EU Open Data dataset.",
            json!({
                "type": "object",
                "properties": {
                    "dataset_id": {
                        "type": "string",
                        "description": "The dataset ID (from search results)"
                    }
                },
                "required": ["dataset_id"],
                "additionalProperties": false
            }),
        ),
        tool(
            "query_eu_data",
            "Make a raw query to the EU Open Data Portal search API and return the JSON response.",
            raw_query_schema(
                "API endpoint (e.g., '/datasets', '/catalogues')",
                "Query parameters",
            ),
        ),
    ]
}

pub(crate) async fn dispatch(
    ctx: &ApiContext,
    name: &str,
    arguments: Value,
) -> Result<ToolOutput, ToolError> {
    match name {
        "search_eu_datasets" => {
            let args: SearchArgs = parse_args(arguments)?;
            search_eu_datasets(ctx, &args.query, args.limit.unwrap_or(DEFAULT_LIMIT))
                .await
                .map(ToolOutput::Text)
        }
        "get_eu_dataset_info" => {
            let args: DatasetArgs = parse_args(arguments)?;
            get_eu_dataset_info(ctx, &args.dataset_id)
                .await
                .map(ToolOutput::Text)
        }
        "query_eu_data" => {
            let args: RawQueryArgs = parse_args(arguments)?;
            query_eu_data(ctx, &args.endpoint, &args.query())
                .await
                .map(ToolOutput::Json)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

/// Localized text of an optional field
fn localized_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(localized)
}

/// A field that is either plain text or an object carrying a `label` or `id`
fn labelled(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        object @ Value::Object(_) => ["/label", "/id"]
            .iter()
            .map(|pointer| non_empty_text_or(object, pointer, ""))
            .find(|text| !text.is_empty()),
        _ => None,
    }
}

/// Access URL of a distribution, spelled either way and possibly a list
fn access_url(distribution: &Value) -> Option<String> {
    let raw = distribution
        .get("access_url")
        .or_else(|| distribution.get("accessUrl"))?;
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Array(urls) => urls.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn render_distribution(distribution: &Value) -> String {
    format!(
        "- [{}] {}\n  {}",
        labelled(distribution.get("format")).unwrap_or_else(|| "Unknown".to_string()),
        localized_field(distribution, "title").unwrap_or_else(|| "Unnamed".to_string()),
        access_url(distribution).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    )
}

#[inline]
pub async fn search_eu_datasets(
    ctx: &ApiContext,
    query: &str,
    limit: i64,
) -> Result<String, ToolError> {
    let search = query.trim();
    if search.is_empty() {
        return Err(ToolError::validation("Search query cannot be empty"));
    }
    let limit = clamp_limit(limit);

    let url = format!("{}/datasets", ctx.endpoints.eu_data);
    let params = QueryParams::new()
        .with("q", search)
        .with("limit", limit.to_string());
    let data = ctx.fetch(EU_DATA_API, &url, &params).await?;

    let results = data
        .pointer("/result/results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if results.is_empty() {
        return Ok(format!("No EU datasets found for '{}'", search));
    }
    let shown = &results[..results.len().min(limit)];

    let mut sections = vec![format!(
        "**EU Open Data Search: '{}'**\nFound {} datasets (showing {})\n",
        search,
        text_or(&data, "/result/count", "0"),
        shown.len()
    )];
    sections.extend(shown.iter().map(|dataset| {
        let description = localized_field(dataset, "description")
            .map_or_else(
                || "No description".to_string(),
                |text| truncate_chars(&text, MAX_DESCRIPTION_CHARS),
            );
        format!(
            "**{}**\nPublisher: {}\nID: `{}`\n{}...",
            localized_field(dataset, "title").unwrap_or_else(|| "Untitled".to_string()),
            non_empty_text_or(dataset, "/publisher/name", "Unknown"),
            text_or(dataset, "/id", ""),
            description,
        )
    }));

    Ok(sections.join("\n\n---\n\n"))
}

#[inline]
pub async fn get_eu_dataset_info(ctx: &ApiContext, dataset_id: &str) -> Result<String, ToolError> {
    let dataset_id = dataset_id.trim();
    if dataset_id.is_empty() {
        return Err(ToolError::validation("Dataset ID cannot be empty"));
    }

    let url = segment_url(EU_DATA_API, &ctx.endpoints.eu_data, &["datasets", dataset_id])?;
    let data = ctx.fetch(EU_DATA_API, &url, &QueryParams::new()).await?;

    let dataset = match data.get("result") {
        Some(result @ Value::Object(map)) if !map.is_empty() => result,
        _ => return Ok(format!("Dataset not found: {}", dataset_id)),
    };

    let mut lines = vec![
        format!(
            "**{}**\n",
            localized_field(dataset, "title").unwrap_or_else(|| "Untitled".to_string())
        ),
        format!(
            "Publisher: {}",
            non_empty_text_or(dataset, "/publisher/name", "Unknown")
        ),
        format!(
            "Modified: {}",
            truncate_chars(&non_empty_text_or(dataset, "/modified", "Unknown"), 10)
        ),
        format!(
            "License: {}",
            labelled(dataset.get("license")).unwrap_or_else(|| "Unknown".to_string())
        ),
        format!(
            "\n**Description:**\n{}\n",
            localized_field(dataset, "description")
                .unwrap_or_else(|| "No description".to_string())
        ),
    ];

    let distributions = dataset
        .get("distributions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if !distributions.is_empty() {
        lines.push("**Available Distributions:**".to_string());
        lines.extend(
            distributions
                .iter()
                .take(MAX_DISTRIBUTIONS)
                .map(render_distribution),
        );
    }

    Ok(lines.join("\n"))
}

#[inline]
pub async fn query_eu_data(
    ctx: &ApiContext,
    endpoint: &str,
    query: &QueryParams,
) -> Result<Value, ToolError> {
    let url = endpoint_url(&ctx.endpoints.eu_data, endpoint);
    ctx.fetch(EU_DATA_API, &url, query).await
}
