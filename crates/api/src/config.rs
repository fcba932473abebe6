//! Application configuration

use std::env;
use std::net::SocketAddr;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Database; when unset the in-memory store is used
    pub database_url: Option<String>,

    // Status workflow JSON document; when unset the stock workflow applies
    pub workflow_path: Option<String>,

    // CORS
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
        if bind_address.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(
                "BIND_ADDRESS must be a host:port socket address",
            ));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:5500".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        if allowed_origins.is_empty() {
            return Err(ConfigError::Invalid(
                "ALLOWED_ORIGINS must list at least one origin",
            ));
        }

        Ok(Self {
            bind_address,
            database_url: env::var("DATABASE_URL").ok(),
            workflow_path: env::var("WORKFLOW_PATH").ok(),
            allowed_origins,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Only meaningful when the variables are unset in the test env
        if env::var("BIND_ADDRESS").is_err() && env::var("ALLOWED_ORIGINS").is_err() {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_address, "0.0.0.0:3001");
            assert!(!config.allowed_origins.is_empty());
        }
    }
}
