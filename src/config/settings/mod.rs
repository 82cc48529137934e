#[cfg(test)]
mod tests;

use std::time::Duration;
use thiserror::Error;

pub const OPENWEATHER_API_KEY_VAR: &str = "OPENWEATHER_API_KEY";
pub const NASA_API_KEY_VAR: &str = "NASA_API_KEY";
pub const API_TIMEOUT_VAR: &str = "API_TIMEOUT";

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Shared NASA key with a low hourly rate limit, used when no key is set
pub const NASA_DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub openweather_api_key: Option<String>,
    pub nasa_api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Invalid {var}: '{0}' (must be a whole number of seconds between 1 and {max})",
        var = API_TIMEOUT_VAR,
        max = MAX_TIMEOUT_SECONDS
    )]
    InvalidTimeout(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            nasa_api_key: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Blank keys count as unset. A timeout that is not an integer in
    /// `1..=MAX_TIMEOUT_SECONDS` is rejected rather than defaulted.
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let timeout_seconds = match lookup(API_TIMEOUT_VAR) {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT_SECONDS,
        };

        Ok(Self {
            openweather_api_key: non_blank(OPENWEATHER_API_KEY_VAR),
            nasa_api_key: non_blank(NASA_API_KEY_VAR),
            timeout_seconds,
        })
    }

    #[inline]
    pub fn has_openweather(&self) -> bool {
        self.openweather_api_key.is_some()
    }

    #[inline]
    pub fn has_nasa_key(&self) -> bool {
        self.nasa_api_key.is_some()
    }

    #[inline]
    pub fn nasa_api_key_or_demo(&self) -> &str {
        self.nasa_api_key.as_deref().unwrap_or(NASA_DEMO_KEY)
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Human-readable report of which API families are usable
    #[inline]
    pub fn availability_summary(&self) -> String {
        let mut lines = vec![
            "API Availability:".to_string(),
            "  ✓ NOAA (no key required)".to_string(),
            "  ✓ Census (no key required)".to_string(),
        ];

        if self.has_nasa_key() {
            lines.push("  ✓ NASA (using API key for higher limits)".to_string());
        } else {
            lines.push("  ✓ NASA (no key, limited to 30 req/hour)".to_string());
        }

        if self.has_openweather() {
            lines.push("  ✓ OpenWeather (API key configured)".to_string());
        } else {
            lines.push(format!(
                "  ✗ OpenWeather ({} not set)",
                OPENWEATHER_API_KEY_VAR
            ));
        }

        lines.extend([
            "  ✓ World Bank (no key required)".to_string(),
            "  ✓ Data.gov (no key required)".to_string(),
            "  ✓ EU Open Data (no key required)".to_string(),
        ]);

        lines.join("\n")
    }
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    let trimmed = raw.trim();
    match trimmed.parse::<u64>() {
        Ok(seconds) if (1..=MAX_TIMEOUT_SECONDS).contains(&seconds) => Ok(seconds),
        _ => Err(ConfigError::InvalidTimeout(trimmed.to_string())),
    }
}
