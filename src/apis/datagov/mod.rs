
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::format::{NOT_AVAILABLE, non_empty_text_or, text_or, truncate_chars};
use super::{ApiContext, ToolError, ToolOutput, parse_args, tool};
use crate::http::QueryParams;
use crate::mcp::protocol::Tool;

pub const DATAGOV_API: &str = "Data.gov";

pub const DEFAULT_ROWS: i64 = 10;
pub const MAX_ROWS: i64 = 50;
pub const MAX_RESOURCES: usize = 10;
const MAX_NOTES_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    rows: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DatasetArgs {
    dataset_id: String,
}

#[derive(Debug, Deserialize)]
struct RawActionArgs {
    action: String,
    #[serde(default)]
    params: Option<Map<String, Value>>,
}

/// Clamp a requested page size to what the catalog search allows
#[inline]
pub fn clamp_rows(rows: i64) -> usize {
    // Clamped into 1..=50, so the cast is lossless
    rows.clamp(1, MAX_ROWS) as usize
}

pub(crate) fn tools() -> Vec<Tool> {
    vec![
        tool(
            "search_datasets",
            "Search for datasets in the Data.gov catalog.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search terms (e.g., 'climate', 'census', 'health')"
                    },
                    "rows": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_ROWS,
                        "description": "Number of results to return (default: 10, max: 50)"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        ),
        tool(
            "get_dataset_info",
            "Get detailed metadata and download links for a Data.gov dataset.",
            json!({
                "type": "object",
                "properties": {
                    "dataset_id": {
                        "type": "string",
                        "description": "The dataset ID or name (from search results)"
                    }
                },
                "required": ["dataset_id"],
                "additionalProperties": false
            }),
        ),
        tool(
            "query_datagov",
            "Make a raw query to the Data.gov CKAN API and return the JSON response.",
            json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "CKAN action (e.g., 'package_search', 'package_show', 'group_list')"
                    },
                    "params": {
                        "type": "object",
                        "description": "Query parameters for the action",
                        "additionalProperties": true
                    }
                },
                "required": ["action"],
                "additionalProperties": false
            }),
        ),
    ]
}

pub(crate) async fn dispatch(
    ctx: &ApiContext,
    name: &str,
    arguments: Value,
) -> Result<ToolOutput, ToolError> {
    match name {
        "search_datasets" => {
            let args: SearchArgs = parse_args(arguments)?;
            search_datasets(ctx, &args.query, args.rows.unwrap_or(DEFAULT_ROWS))
                .await
                .map(ToolOutput::Text)
        }
        "get_dataset_info" => {
            let args: DatasetArgs = parse_args(arguments)?;
            get_dataset_info(ctx, &args.dataset_id)
                .await
                .map(ToolOutput::Text)
        }
        "query_datagov" => {
            let args: RawActionArgs = parse_args(arguments)?;
            let query = args
                .params
                .as_ref()
                .map(QueryParams::from_json_map)
                .unwrap_or_default();
            query_datagov(ctx, &args.action, &query)
                .await
                .map(ToolOutput::Json)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn action_url(ctx: &ApiContext, action: &str) -> String {
    format!("{}/action/{}", ctx.endpoints.datagov, action)
}

fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[inline]
pub async fn search_datasets(ctx: &ApiContext, query: &str, rows: i64) -> Result<String, ToolError> {
    let search = query.trim();
    if search.is_empty() {
        return Err(ToolError::validation("Search query cannot be empty"));
    }
    let rows = clamp_rows(rows);

    let params = QueryParams::new()
        .with("q", search)
        .with("rows", rows.to_string());
    let data = ctx
        .fetch(DATAGOV_API, &action_url(ctx, "package_search"), &params)
        .await?;

    let results = array_at(&data, "/result/results");
    if results.is_empty() {
        return Ok(format!("No datasets found for '{}'", search));
    }
    let shown = &results[..results.len().min(rows)];

    let mut sections = vec![format!(
        "**Data.gov Search: '{}'**\nFound {} datasets (showing {})\n",
        search,
        text_or(&data, "/result/count", "0"),
        shown.len()
    )];
    sections.extend(shown.iter().map(|dataset| {
        format!(
            "**{}**\nOrganization: {}\nResources: {} files\nID: `{}`\n{}...",
            non_empty_text_or(dataset, "/title", "Untitled"),
            non_empty_text_or(dataset, "/organization/title", "Unknown"),
            array_at(dataset, "/resources").len(),
            text_or(dataset, "/id", ""),
            truncate_chars(
                &non_empty_text_or(dataset, "/notes", "No description"),
                MAX_NOTES_CHARS
            ),
        )
    }));

    Ok(sections.join("\n\n---\n\n"))
}

fn render_resource(resource: &Value) -> String {
    let name = ["/name", "/description"]
        .iter()
        .map(|pointer| non_empty_text_or(resource, pointer, ""))
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| "Unnamed".to_string());
    let size = match resource.get("size") {
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => format!(" ({} bytes)", n),
        Some(Value::String(s)) if !s.trim().is_empty() => format!(" ({} bytes)", s.trim()),
        _ => String::new(),
    };

    format!(
        "- [{}] {}{}\n  {}",
        non_empty_text_or(resource, "/format", "Unknown"),
        name,
        size,
        non_empty_text_or(resource, "/url", NOT_AVAILABLE)
    )
}

#[inline]
pub async fn get_dataset_info(ctx: &ApiContext, dataset_id: &str) -> Result<String, ToolError> {
    let dataset_id = dataset_id.trim();
    if dataset_id.is_empty() {
        return Err(ToolError::validation("Dataset ID cannot be empty"));
    }

    let params = QueryParams::new().with("id", dataset_id);
    let data = ctx
        .fetch(DATAGOV_API, &action_url(ctx, "package_show"), &params)
        .await?;

    let dataset = match data.get("result") {
        Some(result @ Value::Object(map)) if !map.is_empty() => result,
        _ => return Ok(format!("Dataset not found: {}", dataset_id)),
    };

    let mut lines = vec![
        format!("**{}**\n", non_empty_text_or(dataset, "/title", "Untitled")),
        format!(
            "Organization: {}",
            non_empty_text_or(dataset, "/organization/title", "Unknown")
        ),
        format!(
            "License: {}",
            non_empty_text_or(dataset, "/license_title", "Unknown")
        ),
        format!(
            "Last Updated: {}",
            truncate_chars(
                &non_empty_text_or(dataset, "/metadata_modified", "Unknown"),
                10
            )
        ),
        format!(
            "\n**Description:**\n{}\n",
            non_empty_text_or(dataset, "/notes", "No description available")
        ),
    ];

    let resources = array_at(dataset, "/resources");
    if !resources.is_empty() {
        lines.push("**Available Resources:**".to_string());
        lines.extend(resources.iter().take(MAX_RESOURCES).map(render_resource));
    }

    Ok(lines.join("\n"))
}

#[inline]
pub async fn query_datagov(
    ctx: &ApiContext,
    action: &str,
    query: &QueryParams,
) -> Result<Value, ToolError> {
    let action = action.trim().trim_matches('/');
    if action.is_empty() {
        return Err(ToolError::validation("CKAN action cannot be empty"));
    }

    ctx.fetch(DATAGOV_API, &action_url(ctx, action), query)
        .await
}
