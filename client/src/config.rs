//! Configuration management for the client.

use std::env;
use std::path::PathBuf;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// AI response gateway endpoint
    pub gateway_url: String,
    /// Optional file path for durable preferences
    pub preferences_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let gateway_url =
            env::var("WARDLINE_GATEWAY_URL").map_err(|_| ConfigError::MissingGatewayUrl)?;

        let preferences_path = env::var("WARDLINE_PREFERENCES").ok().map(PathBuf::from);

        Ok(Self {
            gateway_url,
            preferences_path,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("WARDLINE_GATEWAY_URL environment variable is required")]
    MissingGatewayUrl,
}
