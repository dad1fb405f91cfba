//! Configuration management for the client.

use std::env;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SQLite connection URL for the local store
    pub database_url: String,
    /// Base URL of the remote note collection (e.g. `http://host/api/notes`)
    pub remote_url: String,
    /// Failed deliveries after which a queued operation is parked
    pub max_retries: u32,
    /// Per-request timeout for remote calls
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT_DATABASE_URL: &'static str = "sqlite://noteline.db";
    pub const DEFAULT_REMOTE_URL: &'static str = "http://127.0.0.1:3000/api/notes";
    pub const DEFAULT_MAX_RETRIES: u32 = 5;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Build a configuration with defaults for everything but the two URLs.
    pub fn new(database_url: impl Into<String>, remote_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            remote_url: remote_url.into(),
            max_retries: Self::DEFAULT_MAX_RETRIES,
            request_timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("NOTELINE_DATABASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_DATABASE_URL.to_string());

        let remote_url = env::var("NOTELINE_REMOTE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_REMOTE_URL.to_string());

        let max_retries = match env::var("NOTELINE_MAX_RETRIES") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidMaxRetries)?,
            Err(_) => Self::DEFAULT_MAX_RETRIES,
        };
        if max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries);
        }

        let timeout_secs = match env::var("NOTELINE_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidTimeout)?,
            Err(_) => Self::DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            database_url,
            remote_url,
            max_retries,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("NOTELINE_MAX_RETRIES must be a positive integer")]
    InvalidMaxRetries,

    #[error("Invalid NOTELINE_REQUEST_TIMEOUT_SECS value")]
    InvalidTimeout,

    #[error("Invalid remote URL '{0}'")]
    InvalidRemoteUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
