
use serde::Deserialize;
use serde_json::{Value, json};

use super::format::{NOT_AVAILABLE, cell_f64, cell_i64, group_thousands, text_or};
use super::{ApiContext, ToolError, ToolOutput, parse_args, segment_url, tool};
use crate::http::QueryParams;
use crate::mcp::protocol::Tool;

pub const CENSUS_API: &str = "Census";

/// American Community Survey 5-Year Estimates vintage
pub const ACS_YEAR: &str = "2022";
const ACS_DATASET: &str = "acs/acs5";

pub const MAX_POPULATION_ROWS: usize = 20;

/// State (plus DC and Puerto Rico) postal code to FIPS code
pub const STATE_FIPS: &[(&str, &str)] = &[
    ("AL", "01"),
    ("AK", "02"),
    ("AZ", "04"),
    ("AR", "05"),
    ("CA", "06"),
    ("CO", "08"),
    ("CT", "09"),
    ("DE", "10"),
    ("FL", "12"),
    ("GA", "13"),
    ("HI", "15"),
    ("ID", "16"),
    ("IL", "17"),
    ("IN", "18"),
    ("IA", "19"),
    ("KS", "20"),
    ("KY", "21"),
    ("LA", "22"),
    ("ME", "23"),
    ("MD", "24"),
    ("MA", "25"),
    ("MI", "26"),
    ("MN", "27"),
    ("MS", "28"),
    ("MO", "29"),
    ("MT", "30"),
    ("NE", "31"),
    ("NV", "32"),
    ("NH", "33"),
    ("NJ", "34"),
    ("NM", "35"),
    ("NY", "36"),
    ("NC", "37"),
    ("ND", "38"),
    ("OH", "39"),
    ("OK", "40"),
    ("OR", "41"),
    ("PA", "42"),
    ("RI", "44"),
    ("SC", "45"),
    ("SD", "46"),
    ("TN", "47"),
    ("TX", "48"),
    ("UT", "49"),
    ("VT", "50"),
    ("VA", "51"),
    ("WA", "53"),
    ("WV", "54"),
    ("WI", "55"),
    ("WY", "56"),
    ("DC", "11"),
    ("PR", "72"),
];

const POPULATION_VARIABLES: &[&str] = &["NAME", "B01003_001E"];

const DEMOGRAPHIC_VARIABLES: &[&str] = &[
    "NAME",
    "B01003_001E", // Total population
    "B01002_001E", // Median age
    "B19013_001E", // Median household income
    "B02001_002E", // White alone
    "B02001_003E", // Black alone
    "B02001_005E", // Asian alone
    "B03001_003E", // Hispanic/Latino
];

const HOUSING_VARIABLES: &[&str] = &[
    "NAME",
    "B25001_001E", // Total housing units
    "B25002_002E", // Occupied
    "B25002_003E", // Vacant
    "B25077_001E", // Median home value
    "B25064_001E", // Median gross rent
];

#[derive(Debug, Deserialize)]
struct AreaArgs {
    state: String,
    #[serde(default)]
    county: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCensusArgs {
    dataset: String,
    variables: Vec<String>,
    geo: String,
    #[serde(default)]
    year: Option<String>,
}

/// Map a state postal code to its FIPS code.
///
/// Unmapped input (including numeric FIPS codes) is passed through unchanged.
#[inline]
pub fn state_fips(state: &str) -> String {
    let code = state.trim().to_uppercase();
    STATE_FIPS
        .iter()
        .find(|(postal, _)| *postal == code)
        .map_or(code, |(_, fips)| (*fips).to_string())
}

/// Geography selector for a state or one of its counties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geography {
    pub for_clause: String,
    pub in_clause: Option<String>,
}

impl Geography {
    #[inline]
    pub fn state(fips: &str) -> Self {
        Self {
            for_clause: format!("state:{}", fips),
            in_clause: None,
        }
    }

    #[inline]
    pub fn county(county: &str, state_fips: &str) -> Self {
        Self {
            for_clause: format!("county:{}", county),
            in_clause: Some(format!("state:{}", state_fips)),
        }
    }

    /// Parse a raw `for` clause with an optional `&in=` suffix,
    /// e.g. `county:*&in=state:06`
    #[inline]
    pub fn parse(geo: &str) -> Self {
        let geo = geo.trim();
        let geo = geo.strip_prefix("for=").unwrap_or(geo);
        match geo.split_once("&in=") {
            Some((for_clause, in_clause)) => Self {
                for_clause: for_clause.trim().to_string(),
                in_clause: Some(in_clause.trim().to_string()),
            },
            None => Self {
                for_clause: geo.to_string(),
                in_clause: None,
            },
        }
    }

    fn apply(&self, query: &mut QueryParams) {
        query.push("for", self.for_clause.as_str());
        if let Some(in_clause) = &self.in_clause {
            query.push("in", in_clause.as_str());
        }
    }
}

pub(crate) fn tools() -> Vec<Tool> {
    let area_schema = |county_description: &str| {
        json!({
            "type": "object",
            "properties": {
                "state": {
                    "type": "string",
                    "description": "Two-letter state code (e.g., 'CA', 'TX') or state FIPS code"
                },
                "county": {
                    "type": "string",
                    "description": county_description
                }
            },
            "required": ["state"],
            "additionalProperties": false
        })
    };

    vec![
        tool(
            "get_population",
            "Get population data for a US state or its counties from the American Community Survey.",
            area_schema("Optional county FIPS code (3 digits) or county name"),
        ),
        tool(
            "get_demographics",
            "Get age, race, and income demographics for a US state or county.",
            area_schema("Optional county FIPS code (3 digits)"),
        ),
        tool(
            "get_housing_stats",
            "Get housing statistics (units, vacancy, median value and rent) for a US state or county.",
            area_schema("Optional county FIPS code (3 digits)"),
        ),
        tool(
            "query_census",
            "Make a raw query to the Census API and return the JSON response.",
            json!({
                "type": "object",
                "properties": {
                    "dataset": {
                        "type": "string",
                        "description": "Dataset path (e.g., 'acs/acs5', 'dec/pl')"
                    },
                    "variables": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Variable codes to retrieve (e.g., ['NAME', 'B01003_001E'])"
                    },
                    "geo": {
                        "type": "string",
                        "description": "Geography specification (e.g., 'state:06', 'county:*&in=state:06')"
                    },
                    "year": {
                        "type": "string",
                        "description": "Data year (default: 2022)"
                    }
                },
                "required": ["dataset", "variables", "geo"],
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
        "get_population" => {
            let args: AreaArgs = parse_args(arguments)?;
            get_population(ctx, &args.state, args.county.as_deref())
                .await
                .map(ToolOutput::Text)
        }
        "get_demographics" => {
            let args: AreaArgs = parse_args(arguments)?;
            get_demographics(ctx, &args.state, args.county.as_deref())
                .await
                .map(ToolOutput::Text)
        }
        "get_housing_stats" => {
            let args: AreaArgs = parse_args(arguments)?;
            get_housing_stats(ctx, &args.state, args.county.as_deref())
                .await
                .map(ToolOutput::Text)
        }
        "query_census" => {
            let args: RawCensusArgs = parse_args(arguments)?;
            query_census(
                ctx,
                &args.dataset,
                &args.variables,
                &args.geo,
                args.year.as_deref().unwrap_or(ACS_YEAR),
            )
            .await
            .map(ToolOutput::Json)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_county_code(county: &str) -> bool {
    county == "*" || (!county.is_empty() && county.chars().all(|c| c.is_ascii_digit()))
}

fn acs_geography(state: &str, county: Option<&str>) -> Geography {
    let fips = state_fips(state);
    match non_empty(county) {
        Some(county) => Geography::county(county, &fips),
        None => Geography::state(&fips),
    }
}

/// `{census}/{year}/{dataset}`, where the dataset may span several path
/// levels such as `acs/acs5`
fn table_url(ctx: &ApiContext, year: &str, dataset: &str) -> Result<String, ToolError> {
    let segments: Vec<&str> = std::iter::once(year)
        .chain(dataset.split('/').filter(|segment| !segment.is_empty()))
        .collect();
    segment_url(CENSUS_API, &ctx.endpoints.census, &segments)
}

/// Fetch a Census table and split it into header and data rows
async fn fetch_table(
    ctx: &ApiContext,
    year: &str,
    dataset: &str,
    variables: &[&str],
    geography: &Geography,
) -> Result<Vec<Vec<Value>>, ToolError> {
    let url = table_url(ctx, year, dataset)?;
    let mut query = QueryParams::new().with("get", variables.join(","));
    geography.apply(&mut query);

    let data = ctx.fetch(CENSUS_API, &url, &query).await?;
    let rows = match data {
        Value::Null => Vec::new(),
        Value::Array(rows) => rows,
        _ => {
            return Err(ToolError::UnexpectedResponse {
                api: CENSUS_API,
                message: "expected a table of rows".to_string(),
            });
        }
    };

    Ok(rows
        .into_iter()
        .skip(1)
        .map(|row| match row {
            Value::Array(cells) => cells,
            _ => Vec::new(),
        })
        .collect())
}

fn cell_text(row: &[Value], index: usize) -> String {
    row.get(index)
        .map_or_else(|| NOT_AVAILABLE.to_string(), |cell| text_or(cell, "", NOT_AVAILABLE))
}

#[inline]
pub async fn get_population(
    ctx: &ApiContext,
    state: &str,
    county: Option<&str>,
) -> Result<String, ToolError> {
    let county = non_empty(county);
    // County names are matched locally against every county in the state
    let (geography, name_filter) = match county {
        Some(c) if is_county_code(c) => (acs_geography(state, Some(c)), None),
        Some(c) => (acs_geography(state, Some("*")), Some(c.to_lowercase())),
        None => (acs_geography(state, None), None),
    };

    let rows = fetch_table(ctx, ACS_YEAR, ACS_DATASET, POPULATION_VARIABLES, &geography).await?;
    let lines: Vec<String> = rows
        .iter()
        .filter(|row| {
            name_filter
                .as_ref()
                .is_none_or(|needle| cell_text(row, 0).to_lowercase().contains(needle))
        })
        .take(MAX_POPULATION_ROWS)
        .map(|row| {
            format!(
                "- {}: {}",
                cell_text(row, 0),
                group_thousands(cell_i64(row.get(1)))
            )
        })
        .collect();

    if lines.is_empty() {
        return Ok(format!(
            "No population data found for {}{}",
            state.trim().to_uppercase(),
            county.map(|c| format!(" (county: {})", c)).unwrap_or_default()
        ));
    }

    let mut result = vec![format!(
        "Population Data ({} ACS 5-Year Estimates):\n",
        ACS_YEAR
    )];
    result.extend(lines);
    Ok(result.join("\n"))
}

fn percent_of(part: i64, total: i64) -> String {
    if total == 0 {
        NOT_AVAILABLE.to_string()
    } else {
        format!("{:.1}%", part as f64 / total as f64 * 100.0)
    }
}

#[inline]
pub async fn get_demographics(
    ctx: &ApiContext,
    state: &str,
    county: Option<&str>,
) -> Result<String, ToolError> {
    let geography = acs_geography(state, county);
    let rows = fetch_table(ctx, ACS_YEAR, ACS_DATASET, DEMOGRAPHIC_VARIABLES, &geography).await?;
    let Some(row) = rows.first() else {
        return Ok(format!(
            "No demographic data found for {}",
            geography.for_clause
        ));
    };

    let total = cell_i64(row.get(1));
    let median_age = cell_f64(row.get(2));
    let median_income = cell_i64(row.get(3));
    let white = cell_i64(row.get(4));
    let black = cell_i64(row.get(5));
    let asian = cell_i64(row.get(6));
    let hispanic = cell_i64(row.get(7));

    Ok(format!(
        "**Demographics for {}** ({} ACS 5-Year Estimates)\n\n\
         **Population**: {}\n\
         **Median Age**: {}\n\
         **Median Household Income**: ${}\n\n\
         **Race/Ethnicity**:\n\
         - White: {} ({})\n\
         - Black: {} ({})\n\
         - Asian: {} ({})\n\
         - Hispanic/Latino: {} ({})",
        cell_text(row, 0),
        ACS_YEAR,
        group_thousands(total),
        median_age,
        group_thousands(median_income),
        group_thousands(white),
        percent_of(white, total),
        group_thousands(black),
        percent_of(black, total),
        group_thousands(asian),
        percent_of(asian, total),
        group_thousands(hispanic),
        percent_of(hispanic, total),
    ))
}

#[inline]
pub async fn get_housing_stats(
    ctx: &ApiContext,
    state: &str,
    county: Option<&str>,
) -> Result<String, ToolError> {
    let geography = acs_geography(state, county);
    let rows = fetch_table(ctx, ACS_YEAR, ACS_DATASET, HOUSING_VARIABLES, &geography).await?;
    let Some(row) = rows.first() else {
        return Ok(format!("No housing data found for {}", geography.for_clause));
    };

    let total_units = cell_i64(row.get(1));
    let occupied = cell_i64(row.get(2));
    let vacant = cell_i64(row.get(3));
    let median_value = cell_i64(row.get(4));
    let median_rent = cell_i64(row.get(5));

    let vacancy_rate = if total_units == 0 {
        0.0
    } else {
        vacant as f64 / total_units as f64 * 100.0
    };

    Ok(format!(
        "**Housing Statistics for {}** ({} ACS 5-Year Estimates)\n\n\
         **Total Housing Units**: {}\n\
         **Occupied**: {}\n\
         **Vacant**: {} ({:.1}% vacancy rate)\n\n\
         **Median Home Value**: ${}\n\
         **Median Gross Rent**: ${}/month",
        cell_text(row, 0),
        ACS_YEAR,
        group_thousands(total_units),
        group_thousands(occupied),
        group_thousands(vacant),
        vacancy_rate,
        group_thousands(median_value),
        group_thousands(median_rent),
    ))
}

#[inline]
pub async fn query_census(
    ctx: &ApiContext,
    dataset: &str,
    variables: &[String],
    geo: &str,
    year: &str,
) -> Result<Value, ToolError> {
    if variables.is_empty() {
        return Err(ToolError::validation("At least one variable is required"));
    }
    let dataset = dataset.trim().trim_matches('/');
    if dataset.is_empty() {
        return Err(ToolError::validation("Dataset path cannot be empty"));
    }

    let url = table_url(ctx, year.trim(), dataset)?;
    let mut query = QueryParams::new().with("get", variables.join(","));
    Geography::parse(geo).apply(&mut query);

    ctx.fetch(CENSUS_API, &url, &query).await
}
