use poise::serenity_prelude::RoleId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{BotError, Result};

/// Persisted guild configuration
///
/// Stored as `{"allowed-role": <id>}`. The file holds nothing else; every
/// write replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    /// Role granted to members once a moderator approves them
    #[serde(rename = "allowed-role", skip_serializing_if = "Option::is_none")]
    pub verified_role_id: Option<u64>,
}

impl GuildConfig {
    pub fn verified_role(&self) -> Option<RoleId> {
        // Snowflake 0 is never a valid id
        self.verified_role_id.filter(|id| *id != 0).map(RoleId::new)
    }
}

/// Reads and writes the single-key config file
pub struct ConfigStore {
    path: PathBuf,

    /// Serializes writers so two commands never interleave temp-file renames
    write_lock: tokio::sync::Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config file. A missing file is an empty config.
    pub async fn load(&self) -> Result<GuildConfig> {
        let path = self.path.display().to_string();
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| BotError::ConfigParse { path, source: e })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GuildConfig::default()),
            Err(e) => Err(BotError::ConfigLoad { path, source: e }),
        }
    }

    /// Current verified role, failing open to `None`
    pub async fn get(&self) -> Option<RoleId> {
        match self.load().await {
            Ok(config) => config.verified_role(),
            Err(e) => {
                warn!("Treating verified role as unset: {}", e);
                None
            }
        }
    }

    /// Replace the stored config with just this role
    pub async fn set(&self, role_id: RoleId) -> Result<()> {
        let config = GuildConfig {
            verified_role_id: Some(role_id.get()),
        };
        self.save(&config).await?;
        info!("Verified role set to {} in {}", role_id, self.path.display());
        Ok(())
    }

    /// Save to file atomically
    async fn save(&self, config: &GuildConfig) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.display().to_string();
        let content = serde_json::to_string_pretty(config)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::ConfigSave {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| BotError::ConfigSave { path, source: e })?;

        Ok(())
    }
}

/// Shared config store type
pub type SharedConfigStore = Arc<ConfigStore>;

pub fn create_shared_config_store(path: impl Into<PathBuf>) -> SharedConfigStore {
    Arc::new(ConfigStore::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir().join(format!("gatekeeper-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_get_without_file_is_none() {
        let store = ConfigStore::new(temp_config_path());
        assert_eq!(store.get().await, None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let path = temp_config_path();
        let store = ConfigStore::new(&path);

        store.set(RoleId::new(1234567890)).await.unwrap();
        assert_eq!(store.get().await, Some(RoleId::new(1234567890)));

        store.set(RoleId::new(42)).await.unwrap();
        assert_eq!(store.get().await, Some(RoleId::new(42)));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_set_overwrites_other_keys() {
        let path = temp_config_path();
        std::fs::write(&path, r#"{"allowed-role": 1, "welcome": "hi"}"#).unwrap();

        let store = ConfigStore::new(&path);
        store.set(RoleId::new(7)).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "allowed-role": 7 }));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_missing_key_and_corrupt_file_fail_open() {
        let path = temp_config_path();
        let store = ConfigStore::new(&path);

        std::fs::write(&path, "{}").unwrap();
        assert_eq!(store.get().await, None);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(store.get().await, None);
        assert!(matches!(
            store.load().await,
            Err(BotError::ConfigParse { .. })
        ));

        let _ = std::fs::remove_file(path);
    }
}
