//! Server settings, read from `HOST` and `PORT`.

use std::env;

/// Where the note API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
        }
    }
}

impl Config {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3000;

    /// Read `HOST` and `PORT`, falling back to the defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = env::var("HOST") {
            let host = host.trim();
            if host.is_empty() {
                return Err(ConfigError::EmptyHost);
            }
            config.host = host.to_string();
        }
        if let Ok(raw) = env::var("PORT") {
            config.port = parse_port(&raw)?;
        }

        Ok(config)
    }

    /// `host:port` to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("HOST must not be empty")]
    EmptyHost,

    #[error("Invalid PORT value '{0}'")]
    InvalidPort(String),
}
