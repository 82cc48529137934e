// Configuration management module
// API keys and the request timeout are read from the environment once at startup

pub mod settings;

pub use settings::{Config, ConfigError};
