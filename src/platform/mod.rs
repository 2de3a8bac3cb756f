//! Thin seam over the Discord REST calls the bot makes.
//!
//! Everything that creates, looks up or deletes guild resources goes through
//! [`GuildApi`] so the ticket logic can run against an in-memory guild in
//! tests. The production implementation lives in [`serenity_api`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{
    ButtonStyle, ChannelId, ChannelType, Colour, GuildId, PermissionOverwrite, Permissions,
    RoleId, UserId,
};

use crate::error::Result;

pub mod serenity_api;

#[cfg(test)]
pub mod fake;

pub use serenity_api::SerenityGuildApi;

/// Minimal view of a guild channel
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelType,
    pub parent_id: Option<ChannelId>,
}

/// Minimal view of a guild role
#[derive(Debug, Clone)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmbed {
    pub title: String,
    pub description: String,
    pub colour: Option<Colour>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl OutgoingEmbed {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            colour: None,
            timestamp: None,
        }
    }

    pub fn colour(mut self, colour: Colour) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingButton {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl OutgoingButton {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
        }
    }
}

#[async_trait]
pub trait GuildApi: Send + Sync {
    /// User id of the bot itself
    fn bot_user_id(&self) -> UserId;

    async fn channels(&self, guild_id: GuildId) -> Result<Vec<ChannelInfo>>;

    async fn roles(&self, guild_id: GuildId) -> Result<Vec<RoleInfo>>;

    async fn create_category(&self, guild_id: GuildId, name: &str) -> Result<ChannelId>;

    async fn create_text_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        parent_id: Option<ChannelId>,
        overwrites: Vec<PermissionOverwrite>,
    ) -> Result<ChannelId>;

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<()>;

    async fn create_role(&self, guild_id: GuildId, name: &str) -> Result<RoleId>;

    async fn delete_role(&self, guild_id: GuildId, role_id: RoleId) -> Result<()>;

    /// Whether the user is currently a member of the guild
    async fn is_member(&self, guild_id: GuildId, user_id: UserId) -> Result<bool>;

    async fn add_member_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId)
        -> Result<()>;

    async fn remove_member_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()>;

    async fn kick_member(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()>;

    async fn send_message(
        &self,
        channel_id: ChannelId,
        embed: OutgoingEmbed,
        buttons: Vec<OutgoingButton>,
    ) -> Result<()>;

    /// First channel of the given kind with this exact name
    async fn find_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        kind: ChannelType,
    ) -> Result<Option<ChannelId>> {
        let channels = self.channels(guild_id).await?;
        Ok(channels
            .into_iter()
            .find(|c| c.kind == kind && c.name == name)
            .map(|c| c.id))
    }

    async fn find_role(&self, guild_id: GuildId, name: &str) -> Result<Option<RoleId>> {
        let roles = self.roles(guild_id).await?;
        Ok(roles.into_iter().find(|r| r.name == name).map(|r| r.id))
    }
}
