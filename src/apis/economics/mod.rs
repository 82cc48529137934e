#[cfg(test)]
mod tests;

use futures::future::join_all;
use itertools::Itertools;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::format::{format_decimal, text_or};
use super::{ApiContext, ToolError, ToolOutput, parse_args, segment_url, tool};
use crate::http::QueryParams;
use crate::mcp::protocol::Tool;

pub const WORLD_BANK_API: &str = "World Bank";

pub const GDP: &str = "NY.GDP.MKTP.CD";
pub const POPULATION: &str = "SP.POP.TOTL";
pub const POVERTY: &str = "SI.POV.DDAY";
pub const GDP_PER_CAPITA: &str = "NY.GDP.PCAP.CD";
pub const UNEMPLOYMENT: &str = "SL.UEM.TOTL.ZS";
pub const INFLATION: &str = "FP.CPI.TOTL.ZG";

pub const DEFAULT_INDICATORS: &[&str] = &[GDP, POPULATION, POVERTY, GDP_PER_CAPITA];

/// Human-readable label for a World Bank indicator code
#[inline]
pub fn indicator_name(code: &str) -> &str {
    match code {
        GDP => "GDP (current US$)",
        POPULATION => "Population",
        POVERTY => "Poverty Rate (% at $2.15/day)",
        GDP_PER_CAPITA => "GDP per Capita",
        UNEMPLOYMENT => "Unemployment Rate (%)",
        INFLATION => "Inflation Rate (%)",
        other => other,
    }
}

/// Long-form value used by the single-country report
#[inline]
pub fn format_indicator_value(code: &str, value: f64) -> String {
    match code {
        GDP => format!("${:.2} trillion", value / 1e12),
        POPULATION => format!("{:.1} million", value / 1e6),
        POVERTY | UNEMPLOYMENT | INFLATION => format!("{:.1}%", value),
        GDP_PER_CAPITA => format!("${}", format_decimal(value, 0)),
        _ => format_decimal(value, 2),
    }
}

/// Compact value used by the comparison table
#[inline]
pub fn format_comparison_value(code: &str, value: f64) -> String {
    match code {
        GDP => format!("${:.2}T", value / 1e12),
        POPULATION => format!("{:.1}M", value / 1e6),
        GDP_PER_CAPITA => format!("${}", format_decimal(value, 0)),
        _ => format_decimal(value, 2),
    }
}

/// Most recent observation of one indicator for one country
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub country: String,
    pub year: String,
    pub value: Option<f64>,
}

impl Observation {
    /// Read the first record of a World Bank `[metadata, records]` response
    fn from_response(data: &Value, requested_country: &str) -> Option<Self> {
        let record = data.get(1)?.get(0)?;
        Some(Self {
            country: record
                .pointer("/country/value")
                .and_then(Value::as_str)
                .unwrap_or(requested_country)
                .to_string(),
            year: text_or(record, "/date", ""),
            value: record.get("value").and_then(Value::as_f64),
        })
    }
}

#[derive(Debug, Deserialize)]
struct IndicatorArgs {
    country: String,
    #[serde(default)]
    indicators: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CompareArgs {
    countries: Vec<String>,
    #[serde(default)]
    indicator: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWorldBankArgs {
    country: String,
    indicator: String,
    #[serde(default)]
    params: Option<serde_json::Map<String, Value>>,
}

pub(crate) fn tools() -> Vec<Tool> {
    vec![
        tool(
            "get_country_indicators",
            "Get economic indicators for a country from the World Bank. Defaults to GDP, population, poverty rate and GDP per capita.",
            json!({
                "type": "object",
                "properties": {
                    "country": {
                        "type": "string",
                        "description": "Country code (e.g., 'USA', 'CHN', 'IND', 'BRA')"
                    },
                    "indicators": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Optional list of World Bank indicator codes"
                    }
                },
                "required": ["country"],
                "additionalProperties": false
            }),
        ),
        tool(
            "compare_countries",
            "Compare an economic indicator across multiple countries, sorted from highest to lowest.",
            json!({
                "type": "object",
                "properties": {
                    "countries": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "description": "Country codes (e.g., ['USA', 'CHN', 'IND'])"
                    },
                    "indicator": {
                        "type": "string",
                        "description": "World Bank indicator code (default: NY.GDP.MKTP.CD)"
                    }
                },
                "required": ["countries"],
                "additionalProperties": false
            }),
        ),
        tool(
            "query_worldbank",
            "Make a raw query to the World Bank API for one country and indicator. JSON format is always requested.",
            json!({
                "type": "object",
                "properties": {
                    "country": {
                        "type": "string",
                        "description": "Country code (e.g., 'USA', 'all')"
                    },
                    "indicator": {
                        "type": "string",
                        "description": "World Bank indicator code (e.g., 'NY.GDP.MKTP.CD')"
                    },
                    "params": {
                        "type": "object",
                        "description": "Additional query parameters",
                        "additionalProperties": true
                    }
                },
                "required": ["country", "indicator"],
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
        "get_country_indicators" => {
            let args: IndicatorArgs = parse_args(arguments)?;
            let indicators = args.indicators.unwrap_or_default();
            get_country_indicators(ctx, &args.country, &indicators)
                .await
                .map(ToolOutput::Text)
        }
        "compare_countries" => {
            let args: CompareArgs = parse_args(arguments)?;
            compare_countries(ctx, &args.countries, args.indicator.as_deref().unwrap_or(GDP))
                .await
                .map(ToolOutput::Text)
        }
        "query_worldbank" => {
            let args: RawWorldBankArgs = parse_args(arguments)?;
            let query = args
                .params
                .as_ref()
                .map(QueryParams::from_json_map)
                .unwrap_or_default();
            query_worldbank(ctx, &args.country, &args.indicator, query)
                .await
                .map(ToolOutput::Json)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

/// Country codes are case-insensitive upstream; they are sent uppercase
fn indicator_url(ctx: &ApiContext, country: &str, indicator: &str) -> Result<String, ToolError> {
    segment_url(
        WORLD_BANK_API,
        &ctx.endpoints.worldbank,
        &["country", &country.to_uppercase(), "indicator", indicator],
    )
}

async fn fetch_observation(
    ctx: &ApiContext,
    country: &str,
    indicator: &str,
    per_page: u32,
) -> Result<Option<Observation>, ToolError> {
    let query = QueryParams::new()
        .with("format", "json")
        .with("per_page", per_page.to_string())
        .with("mrv", "1");
    let url = indicator_url(ctx, country, indicator)?;
    let data = ctx.fetch(WORLD_BANK_API, &url, &query).await?;
    Ok(Observation::from_response(&data, country))
}

fn require_code<'a>(value: &'a str, what: &str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::validation(format!("{} cannot be empty", what)));
    }
    Ok(value)
}

/// Latest value of each indicator for one country.
///
/// Indicators are fetched concurrently; a failed lookup is reported inline
/// and does not fail the whole report.
#[inline]
pub async fn get_country_indicators(
    ctx: &ApiContext,
    country: &str,
    indicators: &[String],
) -> Result<String, ToolError> {
    let country = require_code(country, "Country code")?;
    let indicators: Vec<&str> = if indicators.is_empty() {
        DEFAULT_INDICATORS.to_vec()
    } else {
        indicators.iter().map(|code| code.trim()).collect()
    };

    let lookups = indicators
        .iter()
        .map(|indicator| fetch_observation(ctx, country, indicator, 5));
    let results = join_all(lookups).await;

    let mut lines = vec![format!(
        "**Economic Indicators for {}**\n",
        country.to_uppercase()
    )];
    for (indicator, result) in indicators.iter().zip(results) {
        let name = indicator_name(indicator);
        let line = match result {
            Ok(Some(Observation {
                value: Some(value),
                year,
                ..
            })) => format!(
                "- **{}** ({}): {}",
                name,
                year,
                format_indicator_value(indicator, value)
            ),
            Ok(_) => format!("- **{}**: No data available", name),
            Err(e) => {
                warn!("Indicator {} for {} failed: {}", indicator, country, e);
                format!("- {}: Error fetching data", indicator)
            }
        };
        lines.push(line);
    }

    Ok(lines.join("\n"))
}

/// One indicator across several countries, highest value first.
///
/// Countries whose lookup fails or has no value are left out.
#[inline]
pub async fn compare_countries(
    ctx: &ApiContext,
    countries: &[String],
    indicator: &str,
) -> Result<String, ToolError> {
    let countries: Vec<&str> = countries
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if countries.is_empty() {
        return Err(ToolError::validation(
            "At least one country code is required",
        ));
    }
    let indicator = require_code(indicator, "Indicator code")?;

    let lookups = countries
        .iter()
        .map(|country| fetch_observation(ctx, country, indicator, 1));
    let results = join_all(lookups).await;

    let rows = countries
        .iter()
        .zip(results)
        .filter_map(|(country, result)| match result {
            Ok(Some(observation)) => observation
                .value
                .map(|value| (observation.country, value, observation.year)),
            Ok(None) => None,
            Err(e) => {
                warn!("Skipping {} in comparison: {}", country, e);
                None
            }
        })
        .sorted_by(|a, b| b.1.total_cmp(&a.1));

    let mut lines = vec![format!("**Comparing {}**\n", indicator_name(indicator))];
    lines.extend(rows.map(|(country, value, year)| {
        format!(
            "- {}: {} ({})",
            country,
            format_comparison_value(indicator, value),
            year
        )
    }));

    Ok(lines.join("\n"))
}

#[inline]
pub async fn query_worldbank(
    ctx: &ApiContext,
    country: &str,
    indicator: &str,
    mut query: QueryParams,
) -> Result<Value, ToolError> {
    let country = require_code(country, "Country code")?;
    let indicator = require_code(indicator, "Indicator code")?;
    query.set("format", "json");

    let url = indicator_url(ctx, country, indicator)?;
    ctx.fetch(WORLD_BANK_API, &url, &query).await
}
