use super::*;
use serial_test::serial;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.timeout_seconds, 30);
    assert!(!config.has_openweather());
    assert!(!config.has_nasa_key());
    assert_eq!(config.nasa_api_key_or_demo(), "DEMO_KEY");
    assert_eq!(config.timeout(), Duration::from_secs(30));
}

#[test]
fn empty_environment_uses_defaults() {
    let config = Config::from_lookup(lookup_from(&[])).expect("empty env is valid");
    assert_eq!(config, Config::default());
}

#[test]
fn keys_are_loaded() {
    let config = Config::from_lookup(lookup_from(&[
        ("OPENWEATHER_API_KEY", "ow-secret"),
        ("NASA_API_KEY", "nasa-secret"),
        ("API_TIMEOUT", "45"),
    ]))
    .expect("valid env");

    assert!(config.has_openweather());
    assert!(config.has_nasa_key());
    assert_eq!(config.openweather_api_key.as_deref(), Some("ow-secret"));
    assert_eq!(config.nasa_api_key_or_demo(), "nasa-secret");
    assert_eq!(config.timeout_seconds, 45);
}

#[test]
fn blank_keys_count_as_unset() {
    let config = Config::from_lookup(lookup_from(&[
        ("OPENWEATHER_API_KEY", ""),
        ("NASA_API_KEY", "   "),
    ]))
    .expect("valid env");

    assert!(!config.has_openweather());
    assert!(!config.has_nasa_key());
}

#[test]
fn malformed_timeout_fails_fast() {
    for raw in ["abc", "0", "-5", "1.5", "301", ""] {
        let result = Config::from_lookup(lookup_from(&[("API_TIMEOUT", raw)]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidTimeout(raw.trim().to_string())),
            "timeout {:?} should be rejected",
            raw
        );
    }
}

#[test]
fn timeout_bounds_are_inclusive() {
    let low = Config::from_lookup(lookup_from(&[("API_TIMEOUT", "1")])).expect("1 is valid");
    let high = Config::from_lookup(lookup_from(&[("API_TIMEOUT", " 300 ")])).expect("300 is valid");
    assert_eq!(low.timeout_seconds, 1);
    assert_eq!(high.timeout_seconds, 300);
}

#[test]
fn timeout_error_message_names_variable() {
    let error = Config::from_lookup(lookup_from(&[("API_TIMEOUT", "soon")]))
        .expect_err("non-numeric timeout");
    let message = error.to_string();
    assert!(message.contains("API_TIMEOUT"), "{}", message);
    assert!(message.contains("soon"), "{}", message);
}

#[test]
fn availability_summary_without_keys() {
    let summary = Config::default().availability_summary();

    assert!(summary.starts_with("API Availability:"));
    assert!(summary.contains("✗ OpenWeather (OPENWEATHER_API_KEY not set)"));
    assert!(summary.contains("NASA (no key, limited to 30 req/hour)"));
    // header plus one line per API family
    assert_eq!(summary.lines().count(), 8);
}

#[test]
fn availability_summary_with_keys() {
    let config = Config {
        openweather_api_key: Some("k".to_string()),
        nasa_api_key: Some("n".to_string()),
        ..Config::default()
    };
    let summary = config.availability_summary();

    assert!(summary.contains("✓ OpenWeather (API key configured)"));
    assert!(summary.contains("✓ NASA (using API key for higher limits)"));
    assert!(!summary.contains('✗'));
}

#[test]
#[serial]
fn from_env_reads_process_environment() {
    // SAFETY: serialized with other environment-mutating tests
    unsafe {
        std::env::set_var("OPENWEATHER_API_KEY", "from-env");
        std::env::remove_var("NASA_API_KEY");
        std::env::set_var("API_TIMEOUT", "12");
    }

    let config = Config::from_env();

    // SAFETY: serialized with other environment-mutating tests
    unsafe {
        std::env::remove_var("OPENWEATHER_API_KEY");
        std::env::remove_var("API_TIMEOUT");
    }

    let config = config.expect("valid env");
    assert_eq!(config.openweather_api_key.as_deref(), Some("from-env"));
    assert!(!config.has_nasa_key());
    assert_eq!(config.timeout_seconds, 12);
}
