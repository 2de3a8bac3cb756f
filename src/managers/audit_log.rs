use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poise::serenity_prelude::{
    ChannelId, ChannelType, Colour, GuildId, PermissionOverwrite, PermissionOverwriteType,
    Permissions,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::platform::{GuildApi, OutgoingEmbed};

/// Severity of an audit record, shown as the embed colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Failure,
}

impl Severity {
    pub fn colour(&self) -> Colour {
        match self {
            Severity::Info => Colour::new(0x3498db),
            Severity::Success => Colour::new(0x2ecc71),
            Severity::Failure => Colour::new(0xe74c3c),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn to_embed(&self) -> OutgoingEmbed {
        OutgoingEmbed::new(self.title.clone(), self.description.clone())
            .colour(self.severity.colour())
            .timestamp(self.timestamp)
    }
}

/// Writes audit records to an admin-only channel, creating it on first use
pub struct AuditLog {
    api: Arc<dyn GuildApi>,

    /// Name of the log channel in every guild
    channel_name: String,

    /// Resolved log channel per guild
    channels: DashMap<GuildId, ChannelId>,

    /// Held across lookup-or-create so concurrent callers never create two channels
    create_lock: tokio::sync::Mutex<()>,
}

impl AuditLog {
    pub fn new(api: Arc<dyn GuildApi>, channel_name: impl Into<String>) -> Self {
        Self {
            api,
            channel_name: channel_name.into(),
            channels: DashMap::new(),
            create_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Find the log channel by name or create it with admin-only overwrites
    pub async fn get_or_create(&self, guild_id: GuildId) -> Result<ChannelId> {
        if let Some(id) = self.channels.get(&guild_id) {
            return Ok(*id);
        }

        let _guard = self.create_lock.lock().await;

        // Another caller may have finished while we waited
        if let Some(id) = self.channels.get(&guild_id) {
            return Ok(*id);
        }

        if let Some(id) = self
            .api
            .find_channel(guild_id, &self.channel_name, ChannelType::Text)
            .await?
        {
            info!("Found existing log channel: {}", id);
            self.channels.insert(guild_id, id);
            return Ok(id);
        }

        let overwrites = self.build_overwrites(guild_id).await?;
        let id = self
            .api
            .create_text_channel(guild_id, &self.channel_name, None, overwrites)
            .await?;

        info!("Created log channel '{}': {}", self.channel_name, id);
        self.channels.insert(guild_id, id);
        Ok(id)
    }

    /// Hidden from @everyone, readable and writable by admin roles and the bot
    async fn build_overwrites(&self, guild_id: GuildId) -> Result<Vec<PermissionOverwrite>> {
        let view_and_send = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;

        let mut overwrites = vec![
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::VIEW_CHANNEL,
                kind: PermissionOverwriteType::Role(guild_id.everyone_role()),
            },
            PermissionOverwrite {
                allow: view_and_send,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(self.api.bot_user_id()),
            },
        ];

        for role in self.api.roles(guild_id).await? {
            if role.permissions.administrator() && role.id != guild_id.everyone_role() {
                overwrites.push(PermissionOverwrite {
                    allow: view_and_send,
                    deny: Permissions::empty(),
                    kind: PermissionOverwriteType::Role(role.id),
                });
            }
        }

        Ok(overwrites)
    }

    /// Send one record to the guild's log channel
    ///
    /// If the cached channel was deleted, the channel is looked up again (or
    /// recreated) and the record is sent once more.
    pub async fn append(&self, guild_id: GuildId, record: AuditRecord) -> Result<()> {
        let channel_id = self.get_or_create(guild_id).await?;

        match self
            .api
            .send_message(channel_id, record.to_embed(), vec![])
            .await
        {
            Err(e) if e.is_missing() => {
                warn!("Log channel {} disappeared, resolving it again", channel_id);
                self.channels
                    .remove_if(&guild_id, |_, cached| *cached == channel_id);

                let channel_id = self.get_or_create(guild_id).await?;
                self.api
                    .send_message(channel_id, record.to_embed(), vec![])
                    .await
            }
            other => other,
        }
    }
}

/// Shared audit log type
pub type SharedAuditLog = Arc<AuditLog>;

pub fn create_shared_audit_log(api: Arc<dyn GuildApi>, channel_name: &str) -> SharedAuditLog {
    Arc::new(AuditLog::new(api, channel_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{FakeGuild, BOT_ID, GUILD_ID};

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let guild = Arc::new(FakeGuild::new());
        let audit = AuditLog::new(guild.clone(), "verification-logs");

        let first = audit.get_or_create(GUILD_ID).await.unwrap();
        let second = audit.get_or_create(GUILD_ID).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(guild.channels_named("verification-logs").len(), 1);
    }

    #[tokio::test]
    async fn test_reuses_existing_channel_by_name() {
        let guild = Arc::new(FakeGuild::new());
        let existing = guild.add_channel("verification-logs", ChannelType::Text, None);
        let audit = AuditLog::new(guild.clone(), "verification-logs");

        assert_eq!(audit.get_or_create(GUILD_ID).await.unwrap(), existing);
        assert_eq!(guild.channels_named("verification-logs").len(), 1);
    }

    #[tokio::test]
    async fn test_log_channel_is_admin_only() {
        let guild = Arc::new(FakeGuild::new());
        let audit = AuditLog::new(guild.clone(), "verification-logs");
        let channel = audit.get_or_create(GUILD_ID).await.unwrap();

        let overwrites = guild.overwrites(channel);
        let everyone = overwrites
            .iter()
            .find(|o| o.kind == PermissionOverwriteType::Role(GUILD_ID.everyone_role()))
            .unwrap();
        assert!(everyone.deny.view_channel());

        for kind in [
            PermissionOverwriteType::Member(BOT_ID),
            PermissionOverwriteType::Role(guild.admin_role()),
        ] {
            let o = overwrites.iter().find(|o| o.kind == kind).unwrap();
            assert!(o.allow.view_channel() && o.allow.send_messages());
        }
    }

    #[tokio::test]
    async fn test_append_sends_coloured_record() {
        let guild = Arc::new(FakeGuild::new());
        let audit = AuditLog::new(guild.clone(), "verification-logs");

        audit
            .append(GUILD_ID, AuditRecord::new("Verification Log", "done", Severity::Success))
            .await
            .unwrap();

        let channel = audit.get_or_create(GUILD_ID).await.unwrap();
        let messages = guild.messages_in(channel);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].embed.title, "Verification Log");
        assert_eq!(messages[0].embed.colour, Some(Severity::Success.colour()));
        assert!(messages[0].embed.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_append_recreates_deleted_channel() {
        let guild = Arc::new(FakeGuild::new());
        let audit = AuditLog::new(guild.clone(), "verification-logs");
        let first = audit.get_or_create(GUILD_ID).await.unwrap();

        guild.delete_channel(first).await.unwrap();
        audit
            .append(GUILD_ID, AuditRecord::new("Verification Log", "x", Severity::Info))
            .await
            .unwrap();

        let second = audit.get_or_create(GUILD_ID).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(guild.channels_named("verification-logs").len(), 1);
        assert_eq!(guild.messages_in(second).len(), 1);
    }
}
