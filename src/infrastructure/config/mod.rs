//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::errors::ConfigError;

/// Default Telegram Bot API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Messenger configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Long-polling timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MessengerConfig {
    /// Group channels the adapter reacts to. Empty means all of them.
    #[serde(default)]
    pub confinement_channels: Vec<String>,
    /// Directory holding the per-identity state files
    #[serde(default = "default_memory_path")]
    pub memory_path: PathBuf,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_memory_path() -> PathBuf {
    PathBuf::from("./memory/")
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
            poll_timeout: default_poll_timeout(),
        }
    }
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            confinement_channels: Vec::new(),
            memory_path: default_memory_path(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            self.telegram.token = Some(token);
        }

        if let Ok(channels) = std::env::var("CONFINEMENT_CHANNELS") {
            self.messenger.confinement_channels = parse_channel_list(&channels);
        }

        if let Ok(path) = std::env::var("MEMORY_PATH") {
            self.messenger.memory_path = PathBuf::from(path);
        }
    }

    /// The bot token, which is required to open a session
    pub fn telegram_token(&self) -> Result<&str, ConfigError> {
        match self.telegram.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            Some(_) => Err(ConfigError::InvalidValue("telegram.token is empty".to_string())),
            None => Err(ConfigError::MissingField("telegram.token".to_string())),
        }
    }
}

/// Split a comma separated channel list, dropping blanks
pub fn parse_channel_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
