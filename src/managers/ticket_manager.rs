use poise::serenity_prelude::{
    ButtonStyle, ChannelId, ChannelType, GuildId, PermissionOverwrite, PermissionOverwriteType,
    Permissions, RoleId, UserId,
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::audit_log::{AuditRecord, SharedAuditLog, Severity};
use super::cleanup::best_effort;
use crate::error::Result;
use crate::messages;
use crate::platform::{GuildApi, OutgoingButton, OutgoingEmbed, RoleInfo};
use crate::state::SharedTicketRegistry;
use crate::verification::{Decision, Ticket, TicketAction, TicketComponent};

/// Summary of a startup reconciliation pass
#[derive(Debug, Default, Clone)]
pub struct ReconcileSummary {
    pub restored: Vec<UserId>,
    pub removed: Vec<UserId>,
}

impl ReconcileSummary {
    pub fn format(&self) -> String {
        if self.restored.is_empty() && self.removed.is_empty() {
            return "No open tickets found.".to_string();
        }
        format!(
            "{} ticket(s) restored, {} orphaned ticket(s) removed",
            self.restored.len(),
            self.removed.len()
        )
    }
}

/// Opens verification tickets for new members
pub struct TicketManager {
    api: Arc<dyn GuildApi>,
    registry: SharedTicketRegistry,
    audit: SharedAuditLog,

    /// Category holding open ticket channels
    staging_category: String,

    /// Resolved staging category per guild
    categories: DashMap<GuildId, ChannelId>,

    /// Held across lookup-or-create of the staging category; joins by
    /// different members would otherwise each create one
    category_lock: tokio::sync::Mutex<()>,
}

impl TicketManager {
    pub fn new(
        api: Arc<dyn GuildApi>,
        registry: SharedTicketRegistry,
        audit: SharedAuditLog,
        staging_category: impl Into<String>,
    ) -> Self {
        Self {
            api,
            registry,
            audit,
            staging_category: staging_category.into(),
            categories: DashMap::new(),
            category_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Provision a ticket for a member who just joined
    ///
    /// Platform errors propagate; resources created before a failure are left
    /// in place and picked up by the next reconciliation pass.
    pub async fn open_ticket(&self, guild_id: GuildId, member_id: UserId) -> Result<Ticket> {
        let lock = self.registry.member_lock(guild_id, member_id);
        let _guard = lock.lock().await;

        if let Some(ticket) = self.registry.get(guild_id, member_id) {
            match self.reopen_ticket(&ticket).await {
                Ok(()) => return Ok(ticket),
                Err(e) if e.is_missing() => {
                    warn!(
                        "Ticket for {} lost its resources ({}), provisioning a new one",
                        member_id, e
                    );
                    self.registry.remove(guild_id, member_id);
                }
                Err(e) => return Err(e),
            }
        }

        let role_id = self.ensure_member_role(guild_id, member_id).await?;
        let channel_id = self.create_ticket_channel(guild_id, member_id, role_id).await?;
        info!("Created ticket channel {} for member {}", channel_id, member_id);

        let ticket = Ticket {
            guild_id,
            member_id,
            channel_id,
            role_id,
        };
        self.registry.insert(ticket);

        self.api.add_member_role(guild_id, member_id, role_id).await?;
        self.post_prompt(&ticket).await?;

        self.audit
            .append(
                guild_id,
                AuditRecord::new(
                    "New Member Joined",
                    messages::joined_log(member_id),
                    Severity::Info,
                ),
            )
            .await?;

        Ok(ticket)
    }

    /// Member came back while their ticket is still open
    async fn reopen_ticket(&self, ticket: &Ticket) -> Result<()> {
        info!(
            "Member {} rejoined with open ticket {}",
            ticket.member_id, ticket.channel_id
        );
        self.api
            .add_member_role(ticket.guild_id, ticket.member_id, ticket.role_id)
            .await?;
        self.post_prompt(ticket).await?;

        self.audit
            .append(
                ticket.guild_id,
                AuditRecord::new(
                    "Member Rejoined",
                    messages::rejoined_log(ticket.member_id),
                    Severity::Info,
                ),
            )
            .await
    }

    /// Create the ticket channel, re-resolving the category once if it vanished
    async fn create_ticket_channel(
        &self,
        guild_id: GuildId,
        member_id: UserId,
        role_id: RoleId,
    ) -> Result<ChannelId> {
        let name = Ticket::channel_name(member_id);
        let overwrites = ticket_overwrites(guild_id, member_id, role_id, self.api.bot_user_id());

        let category_id = self.ensure_category(guild_id).await?;
        match self
            .api
            .create_text_channel(guild_id, &name, Some(category_id), overwrites.clone())
            .await
        {
            Err(e) if e.is_missing() => {
                warn!(
                    "Staging category {} disappeared, resolving it again",
                    category_id
                );
                self.categories
                    .remove_if(&guild_id, |_, cached| *cached == category_id);

                let category_id = self.ensure_category(guild_id).await?;
                self.api
                    .create_text_channel(guild_id, &name, Some(category_id), overwrites)
                    .await
            }
            other => other,
        }
    }

    async fn ensure_category(&self, guild_id: GuildId) -> Result<ChannelId> {
        if let Some(id) = self.categories.get(&guild_id) {
            return Ok(*id);
        }

        let _guard = self.category_lock.lock().await;
        if let Some(id) = self.categories.get(&guild_id) {
            return Ok(*id);
        }

        let id = match self
            .api
            .find_channel(guild_id, &self.staging_category, ChannelType::Category)
            .await?
        {
            Some(id) => id,
            None => {
                let id = self.api.create_category(guild_id, &self.staging_category).await?;
                info!("Created category '{}'", self.staging_category);
                id
            }
        };

        self.categories.insert(guild_id, id);
        Ok(id)
    }

    /// Temporary role named after the member; a same-named role is reused
    async fn ensure_member_role(&self, guild_id: GuildId, member_id: UserId) -> Result<RoleId> {
        let name = Ticket::role_name(member_id);
        if let Some(id) = self.api.find_role(guild_id, &name).await? {
            debug!("Reusing existing role '{}'", name);
            return Ok(id);
        }

        let id = self.api.create_role(guild_id, &name).await?;
        info!("Created role '{}' with ID {}", name, id);
        Ok(id)
    }

    async fn post_prompt(&self, ticket: &Ticket) -> Result<()> {
        let embed = OutgoingEmbed::new(
            messages::PROMPT_TITLE,
            messages::prompt_message(ticket.member_id),
        );
        let buttons = vec![
            OutgoingButton::new(
                TicketComponent::new(TicketAction::Select(Decision::Verify), ticket).custom_id(),
                "Allow",
                ButtonStyle::Success,
            ),
            OutgoingButton::new(
                TicketComponent::new(TicketAction::Select(Decision::Deny), ticket).custom_id(),
                "Deny",
                ButtonStyle::Danger,
            ),
        ];

        self.api.send_message(ticket.channel_id, embed, buttons).await
    }

    /// Rebuild the registry from ticket channels left over from a previous run
    ///
    /// Channels whose member is still in the guild and whose role still exists
    /// are tracked again. Everything else is torn down.
    pub async fn reconcile(&self, guild_id: GuildId) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        let channels = self.api.channels(guild_id).await?;
        let categories: Vec<ChannelId> = channels
            .iter()
            .filter(|c| c.kind == ChannelType::Category && c.name == self.staging_category)
            .map(|c| c.id)
            .collect();
        if categories.is_empty() {
            return Ok(summary);
        }

        let roles = self.api.roles(guild_id).await?;

        for channel in &channels {
            if channel.kind != ChannelType::Text
                || !channel.parent_id.is_some_and(|p| categories.contains(&p))
            {
                continue;
            }
            let Some(member_id) = Ticket::member_from_channel_name(&channel.name) else {
                continue;
            };

            let lock = self.registry.member_lock(guild_id, member_id);
            let restored = {
                let _guard = lock.lock().await;
                self.reconcile_channel(guild_id, member_id, channel.id, &roles)
                    .await
            };
            drop(lock);
            self.registry.release_lock(guild_id, member_id);

            if restored? {
                summary.restored.push(member_id);
            } else {
                summary.removed.push(member_id);
            }
        }

        Ok(summary)
    }

    /// Track one leftover ticket channel again, or tear it down
    ///
    /// Returns true when the ticket was restored. Caller holds the member lock.
    async fn reconcile_channel(
        &self,
        guild_id: GuildId,
        member_id: UserId,
        channel_id: ChannelId,
        roles: &[RoleInfo],
    ) -> Result<bool> {
        let role_name = Ticket::role_name(member_id);
        let role_id = roles.iter().find(|r| r.name == role_name).map(|r| r.id);

        let reason = match role_id {
            Some(role_id) => {
                if self.api.is_member(guild_id, member_id).await? {
                    self.registry.insert(Ticket {
                        guild_id,
                        member_id,
                        channel_id,
                        role_id,
                    });
                    return Ok(true);
                }
                messages::ORPHAN_MEMBER_LEFT
            }
            None => messages::ORPHAN_ROLE_MISSING,
        };

        info!(
            "Removing orphaned ticket {} for member {} ({})",
            channel_id, member_id, reason
        );
        if let Some(role_id) = role_id {
            best_effort("delete orphaned role", self.api.delete_role(guild_id, role_id)).await;
        }
        best_effort("delete orphaned channel", self.api.delete_channel(channel_id)).await;
        self.registry.remove(guild_id, member_id);

        if let Err(e) = self
            .audit
            .append(
                guild_id,
                AuditRecord::new(
                    "Ticket Cleaned Up",
                    messages::orphan_closed_log(member_id, reason),
                    Severity::Info,
                ),
            )
            .await
        {
            warn!("Failed to log orphaned ticket cleanup: {}", e);
        }
        Ok(false)
    }
}

/// Ticket channel: hidden from everyone, open to the member and their role,
/// manageable by the bot
fn ticket_overwrites(
    guild_id: GuildId,
    member_id: UserId,
    role_id: RoleId,
    bot_id: UserId,
) -> Vec<PermissionOverwrite> {
    let member_access =
        Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::ATTACH_FILES;

    vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(guild_id.everyone_role()),
        },
        PermissionOverwrite {
            allow: member_access,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(role_id),
        },
        PermissionOverwrite {
            allow: member_access,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(member_id),
        },
        PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL | Permissions::MANAGE_CHANNELS,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(bot_id),
        },
    ]
}

/// Shared ticket manager type
pub type SharedTicketManager = Arc<TicketManager>;

pub fn create_shared_ticket_manager(
    api: Arc<dyn GuildApi>,
    registry: SharedTicketRegistry,
    audit: SharedAuditLog,
    staging_category: &str,
) -> SharedTicketManager {
    Arc::new(TicketManager::new(api, registry, audit, staging_category))
}
