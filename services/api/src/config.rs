//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use bookmark_search_core::controller::{SearchSettings, DEFAULT_PAGE_SIZE, DEFAULT_PAGINATION_CALLER};
use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    /// Results per page handed to both fetch collaborators.
    pub page_size: u32,
    /// Where unauthenticated personal searches are sent.
    pub login_url: String,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_source<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let db_max_connections = parse_positive(&var, "DB_MAX_CONNECTIONS", 5)?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Search Settings ---
        let page_size = parse_positive(&var, "PAGINATION_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let login_url = var("LOGIN_URL").unwrap_or_else(|| "/login".to_string());
        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:4200".to_string());

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            page_size,
            login_url,
            cors_origin,
        })
    }

    /// The slice of configuration the search engine needs.
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            page_size: self.page_size,
            pagination_caller: DEFAULT_PAGINATION_CALLER.to_string(),
        }
    }
}

fn parse_positive<F>(var: &F, key: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    key.to_string(),
                    format!("'{}' is not a positive integer", raw),
                )
            }),
    }
}
