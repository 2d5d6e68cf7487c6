//! Environment-driven configuration for the server and services.

use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://agora.db";
const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_GATEWAY_MODEL: &str = "deepseek-chat";
const DEFAULT_NEWS_TTL_MINUTES: i64 = 30;
const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gateway_api_key: String,
    pub gateway_base_url: String,
    pub gateway_model: String,
    pub news_endpoint: Option<String>,
    pub news_ttl_minutes: i64,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let gateway_api_key =
            std::env::var("GATEWAY_API_KEY").map_err(|_| ConfigError::MissingVar("GATEWAY_API_KEY"))?;

        Ok(Self {
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            gateway_api_key,
            gateway_base_url: env_or("GATEWAY_BASE_URL", DEFAULT_GATEWAY_BASE_URL),
            gateway_model: env_or("GATEWAY_MODEL", DEFAULT_GATEWAY_MODEL),
            news_endpoint: std::env::var("NEWS_ENDPOINT").ok(),
            news_ttl_minutes: parse_env("NEWS_TTL_MINUTES", DEFAULT_NEWS_TTL_MINUTES)?,
            port: parse_env("PORT", DEFAULT_PORT)?,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}
