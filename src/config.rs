//! Configuration module for the Paddock exporter.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (bind address, port)
//! - OAuth2 provider settings (client credentials, endpoints, scopes)
//! - Vehicle settings (VIN, telemetry API base URL)
//!
//! Values in the YAML file may reference environment variables using
//! `${VAR}` or `${VAR:-default}` syntax, which keeps client secrets out
//! of the file itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authorization endpoint of the vehicle data provider.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://id.mercedes-benz.com/as/authorization.oauth2";

/// Token endpoint of the vehicle data provider.
pub const DEFAULT_TOKEN_URL: &str = "https://id.mercedes-benz.com/as/token.oauth2";

/// Base URL of the vehicle telemetry API.
pub const DEFAULT_API_BASE: &str = "https://api.mercedes-benz.com/vehicledata/v2";

/// Redirect URI registered with the provider for the code flow.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/oauth.redirect";

/// Scopes requested during authorization. `offline_access` is required
/// for the provider to issue a refresh token.
pub const DEFAULT_SCOPES: &[&str] = &[
    "offline_access",
    "mb:vehicle:mbdata:evstatus",
    "mb:vehicle:mbdata:fuelstatus",
    "mb:vehicle:mbdata:payasyoudrive",
    "mb:vehicle:mbdata:vehiclelock",
    "mb:vehicle:mbdata:vehiclestatus",
];

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    Validation(String),
}

fn default_authorize_url() -> String {
    DEFAULT_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_state_path() -> PathBuf {
    PathBuf::from("state.json")
}

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8080).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// OAuth2 provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Client identifier issued by the provider.
    pub client_id: String,

    /// Client secret issued by the provider.
    pub client_secret: String,

    /// Authorization-code endpoint.
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    /// Token exchange and refresh endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Redirect URI registered with the provider.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Scopes requested during authorization.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Path of the persisted token state file (default: "state.json").
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

/// Vehicle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Vehicle identification number used in API paths and metric labels.
    pub vin: String,

    /// Base URL of the telemetry API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// OAuth2 provider settings.
    pub oauth: OAuthConfig,

    /// Vehicle settings.
    pub vehicle: VehicleConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file, expanding environment
    /// variable references before parsing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&raw);
        let config: AppConfig = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.client_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "oauth.client_id must not be empty".to_string(),
            ));
        }
        if self.oauth.client_secret.trim().is_empty() {
            return Err(ConfigError::Validation(
                "oauth.client_secret must not be empty".to_string(),
            ));
        }
        if self.vehicle.vin.trim().is_empty() {
            return Err(ConfigError::Validation(
                "vehicle.vin must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}
