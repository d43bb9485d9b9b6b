//! Process configuration read from environment variables.

use std::{env, net::IpAddr, path::PathBuf};

use thiserror::Error;
use tracing::Level;

use crate::util::persistence::{default_store_path, MEMORY_STORE_PATH};

const DEFAULT_ENV: &str = "dev";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_LOG_LEVEL: &str = "DEBUG";
const DEFAULT_BACKEND_URL: &str = "/v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid SERVER_PORT: {0}")]
    InvalidPort(String),
    #[error("invalid SERVER_HOST: {0}")]
    InvalidHost(String),
}

/// Where pack sizes are persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub env: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: Level,
    pub store: StoreLocation,
    /// API base URL handed to the embedded web page.
    pub backend_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("SERVER_PORT") {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_PORT,
        };

        let host_raw = lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host_raw
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host_raw.clone()))?;

        let store = match lookup("DB_PATH") {
            Some(path) if path == MEMORY_STORE_PATH => StoreLocation::Memory,
            Some(path) if !path.trim().is_empty() => StoreLocation::File(PathBuf::from(path)),
            _ => StoreLocation::File(default_store_path()),
        };

        Ok(Self {
            env: lookup("ENV").unwrap_or_else(|| DEFAULT_ENV.to_string()),
            host,
            port,
            log_level: parse_log_level(
                &lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            ),
            store,
            backend_url: lookup("BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
        })
    }

    pub fn is_dev(&self) -> bool {
        self.env.eq_ignore_ascii_case(DEFAULT_ENV)
    }
}

/// Accepts `8080` as well as the `:8080` listen-address form.
fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .trim_start_matches(':')
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}

/// Unknown levels fall back to errors only.
fn parse_log_level(raw: &str) -> Level {
    match raw.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" => Level::WARN,
        _ => Level::ERROR,
    }
}
