use super::*;
use crate::apis::tests::{context_for, request_count};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn world_bank_body(country: &str, year: &str, value: Value) -> Value {
    json!([
        {"page": 1, "pages": 1, "per_page": 5, "total": 1},
        [{
            "indicator": {"id": "X", "value": "X"},
            "country": {"id": "XX", "value": country},
            "date": year,
            "value": value
        }]
    ])
}

async fn mount_indicator(server: &MockServer, country: &str, indicator: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/country/{}/indicator/{}", country, indicator)))
        .and(query_param("format", "json"))
        .and(query_param("mrv", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[test]
fn indicator_value_formats() {
    assert_eq!(format_indicator_value(GDP, 2.5e13), "$25.00 trillion");
    assert_eq!(format_indicator_value(POPULATION, 333_287_557.0), "333.3 million");
    assert_eq!(format_indicator_value(POVERTY, 1.23), "1.2%");
    assert_eq!(format_indicator_value(INFLATION, 4.117), "4.1%");
    assert_eq!(format_indicator_value(GDP_PER_CAPITA, 76_329.58), "$76,330");
    assert_eq!(format_indicator_value("EN.ATM.CO2E.PC", 12_345.678), "12,345.68");
}

#[test]
fn comparison_value_formats() {
    assert_eq!(format_comparison_value(GDP, 2.5e13), "$25.00T");
    assert_eq!(format_comparison_value(POPULATION, 1_412_000_000.0), "1412.0M");
    assert_eq!(format_comparison_value(GDP_PER_CAPITA, 12_345.4), "$12,345");
    assert_eq!(format_comparison_value(UNEMPLOYMENT, 3.64), "3.64");
}

#[test]
fn unknown_indicator_name_is_the_code() {
    assert_eq!(indicator_name(GDP), "GDP (current US$)");
    assert_eq!(indicator_name("AG.LND.FRST.ZS"), "AG.LND.FRST.ZS");
}

#[tokio::test]
async fn gdp_renders_in_trillions() {
    let server = MockServer::start().await;
    mount_indicator(
        &server,
        "USA",
        GDP,
        world_bank_body("United States", "2022", json!(25_000_000_000_000.0)),
    )
    .await;
    let ctx = context_for(&server);

    let text = get_country_indicators(&ctx, "USA", &[])
        .await
        .expect("indicators");

    assert!(
        text.starts_with(
            "**Economic Indicators for USA**\n\n- **GDP (current US$)** (2022): $25.00 trillion\n"
        ),
        "{}",
        text
    );
    assert_eq!(request_count(&server).await, DEFAULT_INDICATORS.len());
}

#[tokio::test]
async fn country_code_is_sent_uppercase() {
    let server = MockServer::start().await;
    mount_indicator(
        &server,
        "USA",
        GDP,
        world_bank_body("United States", "2022", json!(25_000_000_000_000.0)),
    )
    .await;
    let ctx = context_for(&server);

    let text = get_country_indicators(&ctx, "usa", &[GDP.to_string()])
        .await
        .expect("indicators");

    assert_eq!(
        text,
        "**Economic Indicators for USA**\n\n- **GDP (current US$)** (2022): $25.00 trillion"
    );
}

#[tokio::test]
async fn country_code_cannot_escape_its_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    query_worldbank(&ctx, "x?foo=bar", GDP, QueryParams::new())
        .await
        .expect("raw query");

    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(
        received[0].url.path(),
        format!("/country/X%3FFOO=BAR/indicator/{}", GDP)
    );
    assert_eq!(received[0].url.query(), Some("format=json"));
}

#[tokio::test]
async fn default_indicators_report_partial_failures_inline() {
    let server = MockServer::start().await;
    mount_indicator(
        &server,
        "BRA",
        GDP,
        world_bank_body("Brazil", "2022", json!(1.92e12)),
    )
    .await;
    mount_indicator(
        &server,
        "BRA",
        POPULATION,
        world_bank_body("Brazil", "2022", json!(215_313_498)),
    )
    .await;
    mount_indicator(
        &server,
        "BRA",
        POVERTY,
        world_bank_body("Brazil", "2021", Value::Null),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("/country/BRA/indicator/{}", GDP_PER_CAPITA)))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let text = get_country_indicators(&ctx, "BRA", &[])
        .await
        .expect("partial failures do not fail the report");

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "**Economic Indicators for BRA**",
            "",
            "- **GDP (current US$)** (2022): $1.92 trillion",
            "- **Population** (2022): 215.3 million",
            "- **Poverty Rate (% at $2.15/day)**: No data available",
            "- NY.GDP.PCAP.CD: Error fetching data",
        ]
    );
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn comparison_skips_failures_and_sorts_descending() {
    let server = MockServer::start().await;
    mount_indicator(
        &server,
        "IND",
        GDP,
        world_bank_body("India", "2022", json!(3.39e12)),
    )
    .await;
    mount_indicator(
        &server,
        "USA",
        GDP,
        world_bank_body("United States", "2022", json!(2.546e13)),
    )
    .await;
    mount_indicator(
        &server,
        "CHN",
        GDP,
        world_bank_body("China", "2022", json!(1.796e13)),
    )
    .await;
    mount_indicator(
        &server,
        "PRK",
        GDP,
        world_bank_body("Korea, Dem. People's Rep.", "2022", Value::Null),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("/country/XXX/indicator/{}", GDP)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let countries: Vec<String> = ["IND", "XXX", "USA", "PRK", "CHN"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let text = compare_countries(&ctx, &countries, GDP)
        .await
        .expect("comparison");

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "**Comparing GDP (current US$)**",
            "",
            "- United States: $25.46T (2022)",
            "- China: $17.96T (2022)",
            "- India: $3.39T (2022)",
        ]
    );
}

#[tokio::test]
async fn comparison_uses_per_page_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/country/JPN/indicator/{}", POPULATION)))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(world_bank_body(
            "Japan",
            "2022",
            json!(125_124_989),
        )))
        .expect(1)
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let text = compare_countries(&ctx, &["JPN".to_string()], POPULATION)
        .await
        .expect("comparison");

    assert!(text.starts_with("**Comparing Population**"));
    assert!(text.contains("- Japan: 125.1M (2022)"));
}

#[tokio::test]
async fn comparison_requires_countries() {
    let server = MockServer::start().await;
    let ctx = context_for(&server);

    let error = compare_countries(&ctx, &[], GDP)
        .await
        .expect_err("empty list");

    assert!(matches!(error, ToolError::Validation(_)));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn raw_query_forces_json_format() {
    let server = MockServer::start().await;
    let body = world_bank_body("France", "2022", json!(2.78e12));
    Mock::given(method("GET"))
        .and(path(format!("/country/FRA/indicator/{}", GDP)))
        .and(query_param("format", "json"))
        .and(query_param("date", "2015:2022"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let output = dispatch(
        &ctx,
        "query_worldbank",
        json!({
            "country": "FRA",
            "indicator": GDP,
            "params": {"format": "xml", "date": "2015:2022"}
        }),
    )
    .await
    .expect("raw query");

    assert_eq!(output, ToolOutput::Json(body));
}
