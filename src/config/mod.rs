pub mod guild_config;
pub mod settings;

pub use guild_config::{create_shared_config_store, SharedConfigStore};
pub use settings::BotSettings;
