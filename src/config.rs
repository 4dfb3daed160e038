//! Environment-driven runtime configuration, loaded once at startup.

use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Fichario server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// API key presented to the AI gateway.
    pub openai_api_key: String,
    /// Base URL of the AI gateway (override for proxies and tests).
    pub openai_base_url: String,
    /// Model identifier used for transient assistants.
    pub openai_model: String,
    /// Pre-provisioned vector store identifier (legacy deployments).
    ///
    /// When absent, the ingestion workflow self-provisions a store on first
    /// use and persists its identifier.
    pub vector_store_id: Option<String>,
    /// Base URL of the drive API.
    pub drive_base_url: String,
    /// OAuth access token presented to the drive API.
    pub drive_access_token: String,
    /// Optional drive folder scope applied to listings.
    pub drive_folder_id: Option<String>,
    /// Path of the SQLite database file.
    pub database_path: String,
    /// Delay between files during batch processing, in milliseconds.
    pub batch_delay_ms: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_DATABASE_PATH: &str = "data/fichario.db";
const DEFAULT_BATCH_DELAY_MS: u64 = 2000;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            openai_api_key: load_env("OPENAI_API_KEY")?,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: load_env_optional("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            vector_store_id: load_env_optional("VECTOR_STORE_ID"),
            drive_base_url: load_env_optional("DRIVE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DRIVE_BASE_URL.to_string()),
            drive_access_token: load_env("DRIVE_ACCESS_TOKEN")?,
            drive_folder_id: load_env_optional("DRIVE_FOLDER_ID"),
            database_path: load_env_optional("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            batch_delay_ms: load_env_optional("BATCH_DELAY_MS")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("BATCH_DELAY_MS".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_BATCH_DELAY_MS),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        openai_base_url = %config.openai_base_url,
        drive_base_url = %config.drive_base_url,
        database_path = %config.database_path,
        server_port = ?config.server_port,
        has_legacy_store = config.vector_store_id.is_some(),
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
