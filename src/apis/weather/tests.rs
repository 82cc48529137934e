use super::*;
use crate::apis::tests::{context_for, context_with_keys, request_count};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn forecast_period(number: usize) -> Value {
    json!({
        "number": number,
        "name": format!("Period {}", number),
        "temperature": 70,
        "detailedForecast": format!("Detailed forecast number {}.", number)
    })
}

async fn mount_forecast_fixture(server: &MockServer, period_count: usize) {
    Mock::given(method("GET"))
        .and(path("/points/38.8894,-77.0352"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {
                "forecast": format!("{}/gridpoints/LWX/97,71/forecast", server.uri())
            }
        })))
        .expect(1)
        .mount(server)
        .await;

    let periods: Vec<Value> = (1..=period_count).map(forecast_period).collect();
    Mock::given(method("GET"))
        .and(path("/gridpoints/LWX/97,71/forecast"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"properties": {"periods": periods}})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn forecast_resolves_grid_then_renders_periods() {
    let server = MockServer::start().await;
    mount_forecast_fixture(&server, 14).await;
    let ctx = context_for(&server);

    let text = get_weather_forecast(&ctx, 38.8894, -77.0352)
        .await
        .expect("forecast should succeed");

    assert!(text.starts_with("Weather forecast for 38.8894, -77.0352:"));
    assert!(text.contains("38.8894"));
    assert!(text.contains("-77.0352"));
    assert!(text.contains("**Period 1**: Detailed forecast number 1."));
    assert!(text.contains("**Period 6**"));
    assert!(!text.contains("Period 7"));
    assert_eq!(text.matches("**Period").count(), MAX_FORECAST_PERIODS);
}

#[tokio::test]
async fn forecast_with_fewer_periods_renders_all() {
    let server = MockServer::start().await;
    mount_forecast_fixture(&server, 2).await;
    let ctx = context_for(&server);

    let text = get_weather_forecast(&ctx, 38.8894, -77.0352)
        .await
        .expect("forecast should succeed");

    assert_eq!(text.matches("**Period").count(), 2);
}

#[tokio::test]
async fn forecast_without_grid_is_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/points/10,10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"properties": {}})))
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let error = get_weather_forecast(&ctx, 10.0, 10.0)
        .await
        .expect_err("no grid");

    assert!(matches!(
        error,
        ToolError::UnexpectedResponse { api: NOAA_API, .. }
    ));
}

#[tokio::test]
async fn forecast_rejects_out_of_range_coordinates() {
    let server = MockServer::start().await;
    let ctx = context_for(&server);

    for (lat, lon) in [(91.0, 0.0), (0.0, -181.0), (f64::NAN, 0.0)] {
        let error = get_weather_forecast(&ctx, lat, lon)
            .await
            .expect_err("invalid coordinates");
        assert!(matches!(error, ToolError::Validation(_)));
    }
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn alerts_reject_non_two_letter_codes_without_network() {
    let server = MockServer::start().await;
    let ctx = context_for(&server);

    for state in ["CAL", "C", "", "12"] {
        let error = get_weather_alerts(&ctx, state)
            .await
            .expect_err("invalid state code");
        assert!(
            matches!(error, ToolError::Validation(_)),
            "{:?} should be a validation error",
            state
        );
    }

    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn alerts_are_capped_and_uppercased() {
    let server = MockServer::start().await;
    let features: Vec<Value> = (1..=12)
        .map(|i| {
            json!({
                "properties": {
                    "event": format!("Event {}", i),
                    "severity": "Moderate",
                    "areaDesc": "Los Angeles",
                    "headline": format!("Headline {}", i)
                }
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/alerts/active"))
        .and(query_param("area", "CA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": features})))
        .expect(1)
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let text = get_weather_alerts(&ctx, " ca ")
        .await
        .expect("alerts should succeed");

    assert!(text.starts_with("Active weather alerts for CA:"));
    assert!(text.contains("**Event 1** (Moderate)\nAreas: Los Angeles\nHeadline 1"));
    assert!(text.contains("**Event 10**"));
    assert!(!text.contains("Event 11"));
}

#[tokio::test]
async fn alerts_missing_fields_render_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [{"properties": {"event": "Flood Watch"}}]
        })))
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let text = get_weather_alerts(&ctx, "TX").await.expect("alerts");

    assert!(text.contains("**Flood Watch** (N/A)\nAreas: N/A"));
}

#[tokio::test]
async fn no_alerts_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let text = get_weather_alerts(&ctx, "TX").await.expect("alerts");

    assert_eq!(text, "No active weather alerts for TX");
}

#[tokio::test]
async fn alerts_server_error_names_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts/active"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let error = get_weather_alerts(&ctx, "TX")
        .await
        .expect_err("500 should fail");

    let message = error.to_string();
    assert!(message.starts_with("NOAA request failed"), "{}", message);
    assert!(message.contains("HTTP 500: upstream broke"), "{}", message);
}

#[tokio::test]
async fn global_weather_requires_key_before_network() {
    let server = MockServer::start().await;
    let ctx = context_for(&server);

    let error = get_global_weather(&ctx, "London", Some("GB"))
        .await
        .expect_err("missing key");

    assert!(matches!(error, ToolError::ConfigurationMissing { .. }));
    assert!(error.to_string().contains("OPENWEATHER_API_KEY"));

    let error = query_openweather(&ctx, "/data/2.5/weather", QueryParams::new())
        .await
        .expect_err("missing key");
    assert!(matches!(error, ToolError::ConfigurationMissing { .. }));

    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn global_weather_renders_conditions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London,GB"))
        .and(query_param("appid", "ow-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "London",
            "sys": {"country": "GB"},
            "weather": [{"description": "light rain"}],
            "main": {"temp": 11.5, "feels_like": 10.2, "humidity": 81, "pressure": 1012}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let ctx = context_with_keys(&server, Some("ow-key"), None);

    let text = get_global_weather(&ctx, "London", Some("GB"))
        .await
        .expect("weather");

    assert!(text.starts_with("**Weather in London, GB**"));
    assert!(text.contains("Conditions: Light rain"));
    assert!(text.contains("Temperature: 11.5°C (feels like 10.2°C)"));
    assert!(text.contains("Humidity: 81%"));
    assert!(text.contains("Wind: N/A m/s"));
    assert!(text.contains("Pressure: 1012 hPa"));
}

#[tokio::test]
async fn query_openweather_injects_key_over_caller_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("appid", "real-key"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cnt": 40})))
        .expect(1)
        .mount(&server)
        .await;
    let ctx = context_with_keys(&server, Some("real-key"), None);

    let query = QueryParams::new()
        .with("q", "Paris")
        .with("appid", "spoofed");
    let value = query_openweather(&ctx, "/data/2.5/forecast", query)
        .await
        .expect("raw query");

    assert_eq!(value, json!({"cnt": 40}));
}

#[tokio::test]
async fn query_noaa_dispatch_returns_raw_json() {
    let server = MockServer::start().await;
    let body = json!({"@context": [], "features": [{"id": "alert-1"}]});
    Mock::given(method("GET"))
        .and(path("/alerts/active"))
        .and(query_param("area", "FL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;
    let ctx = context_for(&server);

    let output = dispatch(
        &ctx,
        "query_noaa",
        json!({"endpoint": "/alerts/active", "params": {"area": "FL"}}),
    )
    .await
    .expect("raw query");

    assert_eq!(output, ToolOutput::Json(body));
}

#[tokio::test]
async fn dispatch_reports_bad_argument_types() {
    let server = MockServer::start().await;
    let ctx = context_for(&server);

    let error = dispatch(
        &ctx,
        "get_weather_forecast",
        json!({"latitude": "north", "longitude": 1.0}),
    )
    .await
    .expect_err("latitude must be a number");

    assert!(matches!(error, ToolError::InvalidArguments(_)));
    assert_eq!(request_count(&server).await, 0);
}
