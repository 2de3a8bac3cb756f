use std::path::PathBuf;

use crate::error::{BotError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_STAGING_CATEGORY: &str = "VERIFICATION OPEN";
pub const DEFAULT_LOG_CHANNEL: &str = "verification-logs";

/// Runtime settings read from the process environment
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub token: String,
    pub config_path: PathBuf,
    /// Category that holds open ticket channels
    pub staging_category: String,
    /// Admin-only channel receiving audit records
    pub log_channel: String,
}

impl BotSettings {
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("DISCORD_TOKEN")
            .or_else(|_| std::env::var("BOT_TOKEN"))
            .map_err(|_| BotError::MissingEnv {
                name: "DISCORD_TOKEN".to_string(),
            })?;

        Ok(Self {
            token,
            config_path: std::env::var("CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
            staging_category: std::env::var("STAGING_CATEGORY")
                .unwrap_or_else(|_| DEFAULT_STAGING_CATEGORY.to_string()),
            log_channel: std::env::var("LOG_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_LOG_CHANNEL.to_string()),
        })
    }
}
