#[cfg(test)]
mod tests;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::format::{NOT_AVAILABLE, capitalize, text_or};
use super::{
    ApiContext, RawQueryArgs, ToolError, ToolOutput, endpoint_url, parse_args, raw_query_schema,
    tool,
};
use crate::config::settings::OPENWEATHER_API_KEY_VAR;
use crate::http::QueryParams;
use crate::mcp::protocol::Tool;

pub const NOAA_API: &str = "NOAA";
pub const OPENWEATHER_API: &str = "OpenWeather";

/// Day/night periods shown by the forecast tool (three days)
pub const MAX_FORECAST_PERIODS: usize = 6;
pub const MAX_ALERTS: usize = 10;

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct AlertsArgs {
    state: String,
}

#[derive(Debug, Deserialize)]
struct GlobalWeatherArgs {
    city: String,
    #[serde(default)]
    country_code: Option<String>,
}

pub(crate) fn tools() -> Vec<Tool> {
    vec![
        tool(
            "get_weather_forecast",
            "Get weather forecast for a US location by coordinates. Returns the next 3 days of NOAA forecast periods.",
            json!({
                "type": "object",
                "properties": {
                    "latitude": {
                        "type": "number",
                        "description": "Latitude of the location (e.g., 38.8894 for Washington DC)"
                    },
                    "longitude": {
                        "type": "number",
                        "description": "Longitude of the location (e.g., -77.0352 for Washington DC)"
                    }
                },
                "required": ["latitude", "longitude"],
                "additionalProperties": false
            }),
        ),
        tool(
            "get_weather_alerts",
            "Get active weather alerts for a US state.",
            json!({
                "type": "object",
                "properties": {
                    "state": {
                        "type": "string",
                        "description": "Two-letter state code (e.g., 'CA', 'TX', 'NY')"
                    }
                },
                "required": ["state"],
                "additionalProperties": false
            }),
        ),
        tool(
            "get_global_weather",
            "Get current weather for any city worldwide (requires OPENWEATHER_API_KEY).",
            json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name (e.g., 'London', 'Tokyo', 'Paris')"
                    },
                    "country_code": {
                        "type": "string",
                        "description": "Optional 2-letter country code (e.g., 'GB', 'JP', 'FR')"
                    }
                },
                "required": ["city"],
                "additionalProperties": false
            }),
        ),
        tool(
            "query_noaa",
            "Make a raw query to the NOAA Weather API and return the JSON response.",
            raw_query_schema(
                "API endpoint path (e.g., '/points/38.8894,-77.0352', '/alerts/active')",
                "Optional query parameters",
            ),
        ),
        tool(
            "query_openweather",
            "Make a raw query to the OpenWeather API (requires OPENWEATHER_API_KEY). The appid parameter is added automatically.",
            raw_query_schema(
                "API endpoint (e.g., '/data/2.5/weather', '/data/2.5/forecast')",
                "Query parameters (appid will be added automatically)",
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
        "get_weather_forecast" => {
            let args: ForecastArgs = parse_args(arguments)?;
            get_weather_forecast(ctx, args.latitude, args.longitude)
                .await
                .map(ToolOutput::Text)
        }
        "get_weather_alerts" => {
            let args: AlertsArgs = parse_args(arguments)?;
            get_weather_alerts(ctx, &args.state)
                .await
                .map(ToolOutput::Text)
        }
        "get_global_weather" => {
            let args: GlobalWeatherArgs = parse_args(arguments)?;
            get_global_weather(ctx, &args.city, args.country_code.as_deref())
                .await
                .map(ToolOutput::Text)
        }
        "query_noaa" => {
            let args: RawQueryArgs = parse_args(arguments)?;
            query_noaa(ctx, &args.endpoint, &args.query())
                .await
                .map(ToolOutput::Json)
        }
        "query_openweather" => {
            let args: RawQueryArgs = parse_args(arguments)?;
            query_openweather(ctx, &args.endpoint, args.query())
                .await
                .map(ToolOutput::Json)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ToolError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ToolError::validation(format!(
            "Latitude must be between -90 and 90 (got {})",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ToolError::validation(format!(
            "Longitude must be between -180 and 180 (got {})",
            longitude
        )));
    }
    Ok(())
}

fn require_openweather_key(ctx: &ApiContext) -> Result<&str, ToolError> {
    ctx.config
        .openweather_api_key
        .as_deref()
        .ok_or(ToolError::ConfigurationMissing {
            service: OPENWEATHER_API,
            setting: OPENWEATHER_API_KEY_VAR,
        })
}

/// Two-step NOAA lookup: resolve the forecast grid for the point, then
/// fetch its forecast periods.
#[inline]
pub async fn get_weather_forecast(
    ctx: &ApiContext,
    latitude: f64,
    longitude: f64,
) -> Result<String, ToolError> {
    validate_coordinates(latitude, longitude)?;

    let points_url = format!("{}/points/{},{}", ctx.endpoints.noaa, latitude, longitude);
    let points = ctx.fetch(NOAA_API, &points_url, &QueryParams::new()).await?;

    let forecast_url = points
        .pointer("/properties/forecast")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::UnexpectedResponse {
            api: NOAA_API,
            message: format!(
                "no forecast grid for {}, {} (NOAA only covers US locations)",
                latitude, longitude
            ),
        })?;
    debug!("Resolved forecast grid: {}", forecast_url);

    let forecast = ctx
        .fetch(NOAA_API, forecast_url, &QueryParams::new())
        .await?;
    let periods = forecast
        .pointer("/properties/periods")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut sections = vec![format!("Weather forecast for {}, {}:\n", latitude, longitude)];
    sections.extend(periods.iter().take(MAX_FORECAST_PERIODS).map(|period| {
        format!(
            "**{}**: {}",
            text_or(period, "/name", NOT_AVAILABLE),
            text_or(period, "/detailedForecast", NOT_AVAILABLE)
        )
    }));

    Ok(sections.join("\n\n"))
}

#[inline]
pub async fn get_weather_alerts(ctx: &ApiContext, state: &str) -> Result<String, ToolError> {
    let state = state.trim().to_uppercase();
    if state.chars().count() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::validation(
            "State must be a 2-letter code (e.g., 'CA', 'TX')",
        ));
    }

    let url = format!("{}/alerts/active", ctx.endpoints.noaa);
    let data = ctx
        .fetch(NOAA_API, &url, &QueryParams::new().with("area", state.as_str()))
        .await?;

    let alerts = data
        .get("features")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if alerts.is_empty() {
        return Ok(format!("No active weather alerts for {}", state));
    }

    let mut sections = vec![format!("Active weather alerts for {}:\n", state)];
    sections.extend(alerts.iter().take(MAX_ALERTS).map(|alert| {
        format!(
            "**{}** ({})\nAreas: {}\n{}",
            text_or(alert, "/properties/event", NOT_AVAILABLE),
            text_or(alert, "/properties/severity", NOT_AVAILABLE),
            text_or(alert, "/properties/areaDesc", NOT_AVAILABLE),
            text_or(alert, "/properties/headline", "")
        )
    }));

    Ok(sections.join("\n\n---\n\n"))
}

#[inline]
pub async fn get_global_weather(
    ctx: &ApiContext,
    city: &str,
    country_code: Option<&str>,
) -> Result<String, ToolError> {
    let api_key = require_openweather_key(ctx)?;

    let city = city.trim();
    if city.is_empty() {
        return Err(ToolError::validation("City name cannot be empty"));
    }
    let location = match country_code.map(str::trim).filter(|cc| !cc.is_empty()) {
        Some(cc) => format!("{},{}", city, cc),
        None => city.to_string(),
    };

    let url = format!("{}/data/2.5/weather", ctx.endpoints.openweather);
    let query = QueryParams::new()
        .with("q", location)
        .with("appid", api_key)
        .with("units", "metric");
    let data = ctx.fetch(OPENWEATHER_API, &url, &query).await?;

    let description = text_or(&data, "/weather/0/description", NOT_AVAILABLE);

    Ok(format!(
        "**Weather in {}, {}**\n\n\
         Conditions: {}\n\
         Temperature: {}°C (feels like {}°C)\n\
         Humidity: {}%\n\
         Wind: {} m/s\n\
         Pressure: {} hPa",
        text_or(&data, "/name", NOT_AVAILABLE),
        text_or(&data, "/sys/country", NOT_AVAILABLE),
        capitalize(&description),
        text_or(&data, "/main/temp", NOT_AVAILABLE),
        text_or(&data, "/main/feels_like", NOT_AVAILABLE),
        text_or(&data, "/main/humidity", NOT_AVAILABLE),
        text_or(&data, "/wind/speed", NOT_AVAILABLE),
        text_or(&data, "/main/pressure", NOT_AVAILABLE),
    ))
}

#[inline]
pub async fn query_noaa(
    ctx: &ApiContext,
    endpoint: &str,
    query: &QueryParams,
) -> Result<Value, ToolError> {
    let url = endpoint_url(&ctx.endpoints.noaa, endpoint);
    ctx.fetch(NOAA_API, &url, query).await
}

#[inline]
pub async fn query_openweather(
    ctx: &ApiContext,
    endpoint: &str,
    mut query: QueryParams,
) -> Result<Value, ToolError> {
    let api_key = require_openweather_key(ctx)?;
    query.set("appid", api_key);

    let url = endpoint_url(&ctx.endpoints.openweather, endpoint);
    ctx.fetch(OPENWEATHER_API, &url, &query).await
}
