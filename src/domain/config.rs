//! # Configuration
//!
//! Manages the loading and validation of the bot's configuration file (`data/config.yaml`).
//! A token passed on the command line overrides the file.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::domain::error::BotError;
use crate::domain::types::GuildId;

pub const DEFAULT_CONFIG_PATH: &str = "data/config.yaml";

/// Token shipped in the sample configuration. Starting with it is a configuration error.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_BOT_TOKEN_HERE";

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub polls: PollConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub prefix: String,
    /// Register slash commands to this guild only (instant updates) instead of globally.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default = "default_activity")]
    pub activity: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            prefix: String::new(),
            guild_id: None,
            activity: default_activity(),
        }
    }
}

fn default_activity() -> String {
    "Type / for commands".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_poll_minutes")]
    pub default_duration_minutes: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: default_poll_minutes(),
        }
    }
}

fn default_poll_minutes() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file: default_log_file(),
        }
    }
}

fn default_log_directory() -> String {
    "data".to_string()
}
fn default_log_file() -> String {
    "bot.log".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShutdownConfig {
    #[serde(default = "default_shutdown_timeout")]
    pub timeout_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_shutdown_timeout(),
        }
    }
}

fn default_shutdown_timeout() -> u64 {
    5000
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Overrides supplied as positional process arguments.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub guild_id: Option<GuildId>,
}

impl AppConfig {
    /// Loads and validates the configuration. A missing file is only acceptable when a
    /// token override is given, in which case defaults (prefix `!`) apply.
    pub fn load(path: &Path, overrides: Overrides) -> Result<Self, BotError> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)?,
            Err(e) if overrides.token.is_some() && e.kind() == std::io::ErrorKind::NotFound => {
                let mut config = Self::default();
                config.bot.prefix = "!".to_string();
                config
            }
            Err(e) => {
                return Err(BotError::ConfigurationError(format!(
                    "Unable to read {}: {e}",
                    path.display()
                )));
            }
        };

        if let Some(token) = overrides.token {
            config.bot.token = token;
        }
        if overrides.guild_id.is_some() {
            config.bot.guild_id = overrides.guild_id;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, BotError> {
        serde_yaml::from_str(content).map_err(|e| {
            BotError::ConfigurationError(format!("Failed to parse configuration: {e}"))
        })
    }

    /// Checks the required properties and rejects the placeholder token.
    pub fn validate(&self) -> Result<(), BotError> {
        let mut missing = Vec::new();
        if self.bot.token.trim().is_empty() {
            missing.push("bot.token");
        }
        if self.bot.prefix.is_empty() {
            missing.push("bot.prefix");
        }
        if !missing.is_empty() {
            return Err(BotError::ConfigurationError(format!(
                "Missing required properties: {}",
                missing.join(", ")
            )));
        }

        if self.bot.token == PLACEHOLDER_TOKEN {
            return Err(BotError::ConfigurationError(
                "Bot token is still set to the default placeholder. Please update it with your actual token."
                    .to_string(),
            ));
        }
        Ok(())
    }
}
