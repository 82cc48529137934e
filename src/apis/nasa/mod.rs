
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use super::format::{NOT_AVAILABLE, capitalize, text_or, truncate_chars};
use super::{
    ApiContext, RawQueryArgs, ToolError, ToolOutput, endpoint_url, parse_args, raw_query_schema,
    tool,
};
use crate::http::QueryParams;
use crate::mcp::protocol::Tool;

pub const NASA_API: &str = "NASA";

pub const ROVERS: &[&str] = &["curiosity", "opportunity", "spirit", "perseverance"];
pub const MEDIA_TYPES: &[&str] = &["image", "video", "audio"];

/// Sol used when neither a sol nor an Earth date is requested
pub const DEFAULT_SOL: u32 = 1000;
pub const MAX_PHOTOS: usize = 10;
pub const MAX_IMAGE_RESULTS: usize = 10;
const MAX_DESCRIPTION_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct ApodArgs {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoverArgs {
    #[serde(default)]
    rover: Option<String>,
    #[serde(default)]
    sol: Option<u32>,
    #[serde(default)]
    earth_date: Option<String>,
    #[serde(default)]
    camera: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageSearchArgs {
    query: String,
    #[serde(default)]
    media_type: Option<String>,
}

/// Which Martian day to fetch photos for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoverDay {
    Sol(u32),
    EarthDate(NaiveDate),
}

impl Default for RoverDay {
    fn default() -> Self {
        Self::Sol(DEFAULT_SOL)
    }
}

impl RoverDay {
    /// Resolve the optional `sol` and `earth_date` arguments; both at once is
    /// rejected
    #[inline]
    pub fn from_args(sol: Option<u32>, earth_date: Option<&str>) -> Result<Self, ToolError> {
        let earth_date = earth_date.map(str::trim).filter(|d| !d.is_empty());
        match (sol, earth_date) {
            (Some(_), Some(_)) => Err(ToolError::validation(
                "Specify either sol or earth_date, not both",
            )),
            (Some(sol), None) => Ok(Self::Sol(sol)),
            (None, Some(date)) => parse_date(date).map(Self::EarthDate),
            (None, None) => Ok(Self::default()),
        }
    }

    fn apply(&self, query: &mut QueryParams) {
        match self {
            Self::Sol(sol) => query.push("sol", sol.to_string()),
            Self::EarthDate(date) => query.push("earth_date", date.format("%Y-%m-%d").to_string()),
        }
    }
}

fn parse_date(date: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        ToolError::validation(format!("Date must be in YYYY-MM-DD format (got '{}')", date))
    })
}

fn one_of<'a>(value: &str, allowed: &[&'a str], what: &str) -> Result<&'a str, ToolError> {
    let normalized = value.trim().to_lowercase();
    allowed
        .iter()
        .find(|candidate| **candidate == normalized)
        .copied()
        .ok_or_else(|| {
            ToolError::validation(format!(
                "Unknown {} '{}' (expected one of: {})",
                what,
                value.trim(),
                allowed.join(", ")
            ))
        })
}

pub(crate) fn tools() -> Vec<Tool> {
    vec![
        tool(
            "get_astronomy_photo",
            "Get NASA's Astronomy Picture of the Day (APOD) with its title, explanation and URL.",
            json!({
                "type": "object",
                "properties": {
                    "date": {
                        "type": "string",
                        "description": "Optional date in YYYY-MM-DD format (default: today)"
                    }
                },
                "additionalProperties": false
            }),
        ),
        tool(
            "get_mars_rover_photos",
            "Get photos from Mars rovers (Curiosity, Opportunity, Spirit, Perseverance).",
            json!({
                "type": "object",
                "properties": {
                    "rover": {
                        "type": "string",
                        "enum": ROVERS,
                        "description": "Rover name (default: curiosity)"
                    },
                    "sol": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Martian sol (day) number; defaults to 1000 when no date is given"
                    },
                    "earth_date": {
                        "type": "string",
                        "description": "Earth date in YYYY-MM-DD format (alternative to sol)"
                    },
                    "camera": {
                        "type": "string",
                        "description": "Optional camera name (e.g., 'FHAZ', 'RHAZ', 'MAST', 'NAVCAM')"
                    }
                },
                "additionalProperties": false
            }),
        ),
        tool(
            "search_nasa_images",
            "Search NASA's image and video library.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search terms (e.g., 'apollo 11', 'mars', 'hubble')"
                    },
                    "media_type": {
                        "type": "string",
                        "enum": MEDIA_TYPES,
                        "description": "Type of media (default: image)"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        ),
        tool(
            "query_nasa",
            "Make a raw query to the NASA API. The api_key parameter is added automatically.",
            raw_query_schema(
                "API endpoint (e.g., '/planetary/apod', '/neo/rest/v1/feed')",
                "Query parameters (api_key will be added automatically)",
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
        "get_astronomy_photo" => {
            let args: ApodArgs = parse_args(arguments)?;
            get_astronomy_photo(ctx, args.date.as_deref())
                .await
                .map(ToolOutput::Text)
        }
        "get_mars_rover_photos" => {
            let args: RoverArgs = parse_args(arguments)?;
            let day = RoverDay::from_args(args.sol, args.earth_date.as_deref())?;
            get_mars_rover_photos(
                ctx,
                args.rover.as_deref().unwrap_or("curiosity"),
                &day,
                args.camera.as_deref(),
            )
            .await
            .map(ToolOutput::Text)
        }
        "search_nasa_images" => {
            let args: ImageSearchArgs = parse_args(arguments)?;
            search_nasa_images(
                ctx,
                &args.query,
                args.media_type.as_deref().unwrap_or("image"),
            )
            .await
            .map(ToolOutput::Text)
        }
        "query_nasa" => {
            let args: RawQueryArgs = parse_args(arguments)?;
            query_nasa(ctx, &args.endpoint, args.query())
                .await
                .map(ToolOutput::Json)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

/// Astronomy Picture of the Day, optionally for a past date
#[inline]
pub async fn get_astronomy_photo(ctx: &ApiContext, date: Option<&str>) -> Result<String, ToolError> {
    let mut query = QueryParams::new().with("api_key", ctx.config.nasa_api_key_or_demo());
    if let Some(date) = date.map(str::trim).filter(|d| !d.is_empty()) {
        parse_date(date)?;
        query.push("date", date);
    }

    let url = format!("{}/planetary/apod", ctx.endpoints.nasa);
    let data = ctx.fetch(NASA_API, &url, &query).await?;

    let media_label = match data.get("media_type").and_then(Value::as_str) {
        Some("video") => "Video",
        _ => "Image",
    };

    let hd_line = data
        .get("hdurl")
        .and_then(Value::as_str)
        .map(|hd_url| format!("\nHD: {}", hd_url))
        .unwrap_or_default();

    Ok(format!(
        "**{}**\nDate: {}\n\n{}\n\n{}: {}{}",
        text_or(&data, "/title", "Untitled"),
        text_or(&data, "/date", NOT_AVAILABLE),
        text_or(&data, "/explanation", NOT_AVAILABLE),
        media_label,
        text_or(&data, "/url", NOT_AVAILABLE),
        hd_line,
    ))
}

#[inline]
pub async fn get_mars_rover_photos(
    ctx: &ApiContext,
    rover: &str,
    day: &RoverDay,
    camera: Option<&str>,
) -> Result<String, ToolError> {
    let rover = one_of(rover, ROVERS, "rover")?;

    let mut query = QueryParams::new().with("api_key", ctx.config.nasa_api_key_or_demo());
    day.apply(&mut query);
    if let Some(camera) = camera.map(str::trim).filter(|c| !c.is_empty()) {
        query.push("camera", camera.to_lowercase());
    }

    let url = format!(
        "{}/mars-photos/api/v1/rovers/{}/photos",
        ctx.endpoints.nasa, rover
    );
    let data = ctx.fetch(NASA_API, &url, &query).await?;

    let photos = data
        .get("photos")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if photos.is_empty() {
        return Ok(format!(
            "No photos found for {} with the specified parameters",
            rover
        ));
    }

    let mut sections = vec![
        format!("**Mars Rover Photos - {}**\n", capitalize(rover)),
        format!("Found {} photos\n", photos.len()),
    ];
    sections.extend(photos.iter().take(MAX_PHOTOS).map(|photo| {
        format!(
            "- Camera: {}\n  Sol: {} | Earth Date: {}\n  URL: {}",
            text_or(photo, "/camera/full_name", NOT_AVAILABLE),
            text_or(photo, "/sol", NOT_AVAILABLE),
            text_or(photo, "/earth_date", NOT_AVAILABLE),
            text_or(photo, "/img_src", NOT_AVAILABLE),
        )
    }));

    Ok(sections.join("\n\n"))
}

#[inline]
pub async fn search_nasa_images(
    ctx: &ApiContext,
    query: &str,
    media_type: &str,
) -> Result<String, ToolError> {
    let search = query.trim();
    if search.is_empty() {
        return Err(ToolError::validation("Search query cannot be empty"));
    }
    let media_type = one_of(media_type, MEDIA_TYPES, "media type")?;

    let url = format!("{}/search", ctx.endpoints.nasa_images);
    let params = QueryParams::new()
        .with("q", search)
        .with("media_type", media_type);
    let data = ctx.fetch(NASA_API, &url, &params).await?;

    let items = data
        .pointer("/collection/items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if items.is_empty() {
        return Ok(format!("No results found for '{}'", search));
    }

    let mut sections = vec![format!(
        "**NASA Image Search: '{}'**\n\nFound {} results\n",
        search,
        items.len()
    )];
    sections.extend(items.iter().take(MAX_IMAGE_RESULTS).map(|item| {
        let details = item.pointer("/data/0").unwrap_or(&Value::Null);
        format!(
            "**{}**\nDate: {}\nDescription: {}...\nPreview: {}",
            text_or(details, "/title", "Untitled"),
            truncate_chars(&text_or(details, "/date_created", NOT_AVAILABLE), 10),
            truncate_chars(
                &text_or(details, "/description", NOT_AVAILABLE),
                MAX_DESCRIPTION_CHARS
            ),
            text_or(item, "/links/0/href", NOT_AVAILABLE),
        )
    }));

    Ok(sections.join("\n\n---\n\n"))
}

#[inline]
pub async fn query_nasa(
    ctx: &ApiContext,
    endpoint: &str,
    mut query: QueryParams,
) -> Result<Value, ToolError> {
    query.set("api_key", ctx.config.nasa_api_key_or_demo());

    let url = endpoint_url(&ctx.endpoints.nasa, endpoint);
    ctx.fetch(NASA_API, &url, &query).await
}
