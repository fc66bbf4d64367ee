//! API configuration

use serde::Deserialize;

/// API configuration
///
/// Every field can be set through an `API_`-prefixed environment variable,
/// e.g. `API_PORT=9090` or `API_AUTO_CALCULATE=false`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// HS256 secret used to validate bearer tokens
    pub jwt_secret: String,
    /// Database URL
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Recalculate premiums after every create and edit
    pub auto_calculate: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            database_url: "postgres://localhost/quotes".to_string(),
            max_connections: 10,
            min_connections: 2,
            log_level: "info".to_string(),
            json_logs: false,
            auto_calculate: true,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment, falling back to defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port as i64)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("database_url", defaults.database_url)?
            .set_default("max_connections", defaults.max_connections as i64)?
            .set_default("min_connections", defaults.min_connections as i64)?
            .set_default("log_level", defaults.log_level)?
            .set_default("json_logs", defaults.json_logs)?
            .set_default("auto_calculate", defaults.auto_calculate)?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
