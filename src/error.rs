use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save config to '{path}': {source}")]
    ConfigSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required environment variable: {name}")]
    MissingEnv { name: String },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord {
        message: String,
        /// HTTP status returned by Discord, if the failure came from a REST call
        status: Option<u16>,
    },

    // Interaction errors
    #[error("Malformed ticket component id: {custom_id}")]
    InvalidComponentId { custom_id: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    /// True when Discord reports the target resource as already gone
    pub fn is_missing(&self) -> bool {
        matches!(self, BotError::Discord { status: Some(404), .. })
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        let status = match &err {
            serenity::Error::Http(http_err) => http_err.status_code().map(|s| s.as_u16()),
            _ => None,
        };
        BotError::Discord {
            message: err.to_string(),
            status,
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_resource_detection() {
        let gone = BotError::Discord {
            message: "Unknown Role".to_string(),
            status: Some(404),
        };
        let forbidden = BotError::Discord {
            message: "Missing Permissions".to_string(),
            status: Some(403),
        };

        assert!(gone.is_missing());
        assert!(!forbidden.is_missing());
        assert!(!BotError::Internal {
            message: "boom".to_string()
        }
        .is_missing());
    }
}
