//! Service configuration.
//!
//! Centralizes everything the session service reads from the environment,
//! plus the runtime constants that are deliberately not configurable.

use secrecy::SecretString;
use std::env;
use tracing::Level;

// --- Runtime Constants ---

/// Capacity of the session loop's input channel.
pub const INPUT_CHANNEL_CAPACITY: usize = 256;
/// Capacity of the command channel from the core logic to the runtime.
pub const COMMAND_CHANNEL_CAPACITY: usize = 32;
/// Capacity of the bridge's outbound and broadcast channels.
pub const BRIDGE_CHANNEL_CAPACITY: usize = 256;
/// How long to wait for the companion to announce itself.
pub const BRIDGE_HANDSHAKE_SECS: u64 = 10;
/// How long to wait for the capture acquisition response.
pub const CAPTURE_HANDSHAKE_SECS: u64 = 10;
/// How long teardown waits for the command handler to drain.
pub const TEARDOWN_GRACE_SECS: u64 = 5;

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub store_url: String,
    pub store_api_key: SecretString,
    pub preferred_voice: String,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `VIGIL_STORE_URL`: Base URL of the session document store. Required.
    // *   `VIGIL_STORE_API_KEY`: Bearer token for the document store. Required.
    // *   `VIGIL_PREFERRED_VOICE`: (Optional) Preferred synthesis voice name. Defaults to "Google US English".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    //
    // The bridge relay address and token are read by `vigil-bridge` itself
    // (`VIGIL_BRIDGE_URL`, `VIGIL_BRIDGE_TOKEN`).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if absent.
        dotenvy::dotenv().ok();

        let store_url = env::var("VIGIL_STORE_URL")
            .map_err(|_| ConfigError::MissingVar("VIGIL_STORE_URL must be set".to_string()))?;
        let store_api_key: SecretString = env::var("VIGIL_STORE_API_KEY")
            .map_err(|_| ConfigError::MissingVar("VIGIL_STORE_API_KEY must be set".to_string()))?
            .into();

        let preferred_voice = env::var("VIGIL_PREFERRED_VOICE")
            .unwrap_or_else(|_| "Google US English".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            store_url,
            store_api_key,
            preferred_voice,
            log_level,
        })
    }
}
