//! In-memory guild used by the ticket tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use poise::serenity_prelude::{
    ChannelId, ChannelType, GuildId, PermissionOverwrite, Permissions, RoleId, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ChannelInfo, GuildApi, OutgoingButton, OutgoingEmbed, RoleInfo};
use crate::error::{BotError, Result};

pub const GUILD_ID: GuildId = GuildId::new(1);
pub const BOT_ID: UserId = UserId::new(99);

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel_id: ChannelId,
    pub embed: OutgoingEmbed,
    pub buttons: Vec<OutgoingButton>,
}

#[derive(Debug, Default)]
pub struct FakeState {
    next_id: u64,
    pub channels: Vec<(ChannelInfo, Vec<PermissionOverwrite>)>,
    pub roles: Vec<RoleInfo>,
    pub members: HashMap<UserId, HashSet<RoleId>>,
    pub messages: Vec<SentMessage>,
    pub kicks: Vec<(UserId, String)>,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn unknown(what: &str) -> BotError {
    BotError::Discord {
        message: format!("Unknown {}", what),
        status: Some(404),
    }
}

pub struct FakeGuild {
    pub state: Mutex<FakeState>,
    admin_role: RoleId,

    /// Yield to the scheduler at every lookup and create, like a real REST call
    interleave: AtomicBool,
}

impl Default for FakeGuild {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGuild {
    /// A guild with @everyone, an administrator role and the bot as a member
    pub fn new() -> Self {
        let admin_role = RoleId::new(2);
        let mut state = FakeState {
            next_id: 1000,
            ..Default::default()
        };
        state.roles.push(RoleInfo {
            id: GUILD_ID.everyone_role(),
            name: "@everyone".to_string(),
            permissions: Permissions::empty(),
        });
        state.roles.push(RoleInfo {
            id: admin_role,
            name: "Admin".to_string(),
            permissions: Permissions::ADMINISTRATOR,
        });
        state.members.insert(BOT_ID, HashSet::new());

        Self {
            state: Mutex::new(state),
            admin_role,
            interleave: AtomicBool::new(false),
        }
    }

    /// Make concurrent callers interleave at every lookup and create
    pub fn interleaved(self) -> Self {
        self.interleave.store(true, Ordering::SeqCst);
        self
    }

    async fn network_hop(&self) {
        if self.interleave.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    pub fn admin_role(&self) -> RoleId {
        self.admin_role
    }

    pub fn add_member(&self, user_id: UserId) {
        self.state.lock().members.entry(user_id).or_default();
    }

    pub fn add_role(&self, name: &str) -> RoleId {
        let mut state = self.state.lock();
        let id = RoleId::new(state.next_id());
        state.roles.push(RoleInfo {
            id,
            name: name.to_string(),
            permissions: Permissions::empty(),
        });
        id
    }

    pub fn add_channel(&self, name: &str, kind: ChannelType, parent_id: Option<ChannelId>) -> ChannelId {
        let mut state = self.state.lock();
        let id = ChannelId::new(state.next_id());
        state.channels.push((
            ChannelInfo {
                id,
                name: name.to_string(),
                kind,
                parent_id,
            },
            vec![],
        ));
        id
    }

    pub fn member_roles(&self, user_id: UserId) -> Option<HashSet<RoleId>> {
        self.state.lock().members.get(&user_id).cloned()
    }

    pub fn roles_named(&self, name: &str) -> Vec<RoleInfo> {
        self.state
            .lock()
            .roles
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect()
    }

    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.state.lock().roles.iter().any(|r| r.id == role_id)
    }

    pub fn channels_named(&self, name: &str) -> Vec<ChannelInfo> {
        self.state
            .lock()
            .channels
            .iter()
            .filter(|(c, _)| c.name == name)
            .map(|(c, _)| c.clone())
            .collect()
    }

    pub fn has_channel(&self, channel_id: ChannelId) -> bool {
        self.state.lock().channels.iter().any(|(c, _)| c.id == channel_id)
    }

    pub fn overwrites(&self, channel_id: ChannelId) -> Vec<PermissionOverwrite> {
        self.state
            .lock()
            .channels
            .iter()
            .find(|(c, _)| c.id == channel_id)
            .map(|(_, o)| o.clone())
            .unwrap_or_default()
    }

    pub fn messages_in(&self, channel_id: ChannelId) -> Vec<SentMessage> {
        self.state
            .lock()
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GuildApi for FakeGuild {
    fn bot_user_id(&self) -> UserId {
        BOT_ID
    }

    async fn channels(&self, _guild_id: GuildId) -> Result<Vec<ChannelInfo>> {
        self.network_hop().await;
        Ok(self.state.lock().channels.iter().map(|(c, _)| c.clone()).collect())
    }

    async fn roles(&self, _guild_id: GuildId) -> Result<Vec<RoleInfo>> {
        self.network_hop().await;
        Ok(self.state.lock().roles.clone())
    }

    async fn create_category(&self, _guild_id: GuildId, name: &str) -> Result<ChannelId> {
        self.network_hop().await;
        Ok(self.add_channel(name, ChannelType::Category, None))
    }

    async fn create_text_channel(
        &self,
        _guild_id: GuildId,
        name: &str,
        parent_id: Option<ChannelId>,
        overwrites: Vec<PermissionOverwrite>,
    ) -> Result<ChannelId> {
        self.network_hop().await;
        if let Some(parent) = parent_id {
            if !self.has_channel(parent) {
                return Err(unknown("Channel"));
            }
        }
        let id = self.add_channel(name, ChannelType::Text, parent_id);
        let mut state = self.state.lock();
        if let Some((_, o)) = state.channels.iter_mut().find(|(c, _)| c.id == id) {
            *o = overwrites;
        }
        Ok(id)
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<()> {
        let mut state = self.state.lock();
        let before = state.channels.len();
        state.channels.retain(|(c, _)| c.id != channel_id);
        if state.channels.len() == before {
            return Err(unknown("Channel"));
        }
        Ok(())
    }

    async fn create_role(&self, _guild_id: GuildId, name: &str) -> Result<RoleId> {
        self.network_hop().await;
        Ok(self.add_role(name))
    }

    async fn delete_role(&self, _guild_id: GuildId, role_id: RoleId) -> Result<()> {
        let mut state = self.state.lock();
        let before = state.roles.len();
        state.roles.retain(|r| r.id != role_id);
        if state.roles.len() == before {
            return Err(unknown("Role"));
        }
        for roles in state.members.values_mut() {
            roles.remove(&role_id);
        }
        Ok(())
    }

    async fn is_member(&self, _guild_id: GuildId, user_id: UserId) -> Result<bool> {
        Ok(self.state.lock().members.contains_key(&user_id))
    }

    async fn add_member_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if !state.roles.iter().any(|r| r.id == role_id) {
            return Err(unknown("Role"));
        }
        state
            .members
            .get_mut(&user_id)
            .ok_or_else(|| unknown("Member"))?
            .insert(role_id);
        Ok(())
    }

    async fn remove_member_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if !state.roles.iter().any(|r| r.id == role_id) {
            return Err(unknown("Role"));
        }
        state
            .members
            .get_mut(&user_id)
            .ok_or_else(|| unknown("Member"))?
            .remove(&role_id);
        Ok(())
    }

    async fn kick_member(&self, _guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.members.remove(&user_id).is_none() {
            return Err(unknown("Member"));
        }
        state.kicks.push((user_id, reason.to_string()));
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        embed: OutgoingEmbed,
        buttons: Vec<OutgoingButton>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if !state.channels.iter().any(|(c, _)| c.id == channel_id) {
            return Err(unknown("Channel"));
        }
        state.messages.push(SentMessage {
            channel_id,
            embed,
            buttons,
        });
        Ok(())
    }
}
