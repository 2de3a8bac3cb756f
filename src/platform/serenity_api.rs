use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, ChannelId, ChannelType, GuildId, Http, PermissionOverwrite, RoleId, UserId,
};
use std::sync::Arc;
use tracing::debug;

use super::{ChannelInfo, GuildApi, OutgoingButton, OutgoingEmbed, RoleInfo};
use crate::error::{BotError, Result};

/// [`GuildApi`] backed by serenity's REST client
pub struct SerenityGuildApi {
    http: Arc<Http>,
    bot_id: UserId,
}

impl SerenityGuildApi {
    pub fn new(http: Arc<Http>, bot_id: UserId) -> Self {
        Self { http, bot_id }
    }

    fn http(&self) -> &Http {
        self.http.as_ref()
    }
}

/// Build a serenity embed from an outgoing record
pub fn to_create_embed(embed: OutgoingEmbed) -> serenity::CreateEmbed {
    let mut create = serenity::CreateEmbed::new()
        .title(embed.title)
        .description(embed.description);

    if let Some(colour) = embed.colour {
        create = create.colour(colour);
    }
    if let Some(ts) = embed.timestamp {
        if let Ok(ts) = serenity::Timestamp::from_unix_timestamp(ts.timestamp()) {
            create = create.timestamp(ts);
        }
    }

    create
}

pub fn to_create_button(button: OutgoingButton) -> serenity::CreateButton {
    serenity::CreateButton::new(button.custom_id)
        .label(button.label)
        .style(button.style)
}

#[async_trait]
impl GuildApi for SerenityGuildApi {
    fn bot_user_id(&self) -> UserId {
        self.bot_id
    }

    async fn channels(&self, guild_id: GuildId) -> Result<Vec<ChannelInfo>> {
        let channels = guild_id.channels(self.http()).await?;
        Ok(channels
            .into_values()
            .map(|c| ChannelInfo {
                id: c.id,
                name: c.name,
                kind: c.kind,
                parent_id: c.parent_id,
            })
            .collect())
    }

    async fn roles(&self, guild_id: GuildId) -> Result<Vec<RoleInfo>> {
        let roles = guild_id.roles(self.http()).await?;
        Ok(roles
            .into_values()
            .map(|r| RoleInfo {
                id: r.id,
                name: r.name,
                permissions: r.permissions,
            })
            .collect())
    }

    async fn create_category(&self, guild_id: GuildId, name: &str) -> Result<ChannelId> {
        let channel = guild_id
            .create_channel(
                self.http(),
                serenity::CreateChannel::new(name).kind(ChannelType::Category),
            )
            .await?;
        Ok(channel.id)
    }

    async fn create_text_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        parent_id: Option<ChannelId>,
        overwrites: Vec<PermissionOverwrite>,
    ) -> Result<ChannelId> {
        let mut create_channel = serenity::CreateChannel::new(name)
            .kind(ChannelType::Text)
            .permissions(overwrites);

        if let Some(parent) = parent_id {
            create_channel = create_channel.category(parent);
        }

        let channel = guild_id.create_channel(self.http(), create_channel).await?;
        Ok(channel.id)
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<()> {
        channel_id.delete(self.http()).await?;
        Ok(())
    }

    async fn create_role(&self, guild_id: GuildId, name: &str) -> Result<RoleId> {
        let role = guild_id
            .create_role(self.http(), serenity::EditRole::new().name(name))
            .await?;
        Ok(role.id)
    }

    async fn delete_role(&self, guild_id: GuildId, role_id: RoleId) -> Result<()> {
        guild_id.delete_role(self.http(), role_id).await?;
        Ok(())
    }

    async fn is_member(&self, guild_id: GuildId, user_id: UserId) -> Result<bool> {
        match guild_id.member(self.http(), user_id).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = BotError::from(e);
                if err.is_missing() {
                    debug!("User {} is not a member of guild {}", user_id, guild_id);
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn add_member_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()> {
        self.http()
            .add_member_role(guild_id, user_id, role_id, None)
            .await?;
        Ok(())
    }

    async fn remove_member_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()> {
        self.http()
            .remove_member_role(guild_id, user_id, role_id, None)
            .await?;
        Ok(())
    }

    async fn kick_member(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()> {
        guild_id
            .kick_with_reason(self.http(), user_id, reason)
            .await?;
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        embed: OutgoingEmbed,
        buttons: Vec<OutgoingButton>,
    ) -> Result<()> {
        let mut message = serenity::CreateMessage::new().embed(to_create_embed(embed));

        if !buttons.is_empty() {
            message = message.components(vec![serenity::CreateActionRow::Buttons(
                buttons.into_iter().map(to_create_button).collect(),
            )]);
        }

        channel_id.send_message(self.http(), message).await?;
        Ok(())
    }
}
