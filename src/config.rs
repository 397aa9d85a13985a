// src/config.rs

use std::env;

use dotenvy::dotenv;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub log_dir: String,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw.clone() })?,
            Err(_) => 3000,
        };

        let rust_log = parse_log_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))?;

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        );

        Ok(Self {
            database_url,
            port,
            rust_log,
            log_dir,
            cors_origins,
        })
    }
}

/// Rejects directives the subscriber would not understand.
fn parse_log_filter(raw: String) -> Result<String, ConfigError> {
    match EnvFilter::try_new(&raw) {
        Ok(_) => Ok(raw),
        Err(_) => Err(ConfigError::Invalid { key: "RUST_LOG", value: raw }),
    }
}

/// Splits a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
