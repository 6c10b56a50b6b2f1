//! Client configuration.
//!
//! Settings come from the environment (and a `.env` file when present); command
//! line flags override them in `main`.

use std::env;
use tracing::Level;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_url: String,
    /// Command used to play one MP3 clip; the clip path is appended as the last argument.
    pub player: Option<String>,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid server URL in CHATBOT_URL: {0}")]
    InvalidUrl(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `CHATBOT_URL`: Base URL of the chat server. Defaults to "http://localhost:3000".
    // *   `AUDIO_PLAYER`: (Optional) Player command, e.g. "mpv --really-quiet".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "WARN" so logs do not
    //     interleave with the streamed answer.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_url = lookup("CHATBOT_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(server_url));
        }

        let player = lookup("AUDIO_PLAYER").filter(|p| !p.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "WARN".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            server_url,
            player,
            log_level,
        })
    }
}
