use async_trait::async_trait;
use poise::serenity_prelude::{ButtonStyle, GuildId, UserId};
use std::sync::Arc;
use tracing::{info, warn};

use super::audit_log::{AuditRecord, SharedAuditLog, Severity};
use super::cleanup::best_effort;
use crate::config::SharedConfigStore;
use crate::error::Result;
use crate::messages;
use crate::platform::{GuildApi, OutgoingButton};
use crate::state::SharedTicketRegistry;
use crate::verification::{ApprovalState, Decision, Ticket, TicketAction, TicketComponent};

/// Private replies to the moderator who pressed a ticket button
///
/// Each interaction gets exactly one reply.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Acknowledge now and reply later; used before slow teardown work
    async fn defer(&self) -> Result<()> {
        Ok(())
    }

    /// Ephemeral text notice
    async fn notice(&self, text: &str) -> Result<()>;

    /// Ephemeral text with a single confirm button
    async fn confirm(&self, text: &str, button: OutgoingButton) -> Result<()>;
}

/// Who pressed the button
#[derive(Debug, Clone, Copy)]
pub struct Moderator {
    pub user_id: UserId,
    pub is_admin: bool,
}

/// Drives a ticket from the Allow/Deny prompt to verification or removal
pub struct ApprovalFlow {
    api: Arc<dyn GuildApi>,
    registry: SharedTicketRegistry,
    audit: SharedAuditLog,
    config: SharedConfigStore,
}

impl ApprovalFlow {
    pub fn new(
        api: Arc<dyn GuildApi>,
        registry: SharedTicketRegistry,
        audit: SharedAuditLog,
        config: SharedConfigStore,
    ) -> Self {
        Self {
            api,
            registry,
            audit,
            config,
        }
    }

    /// Handle one button press and report where the ticket ended up
    pub async fn handle(
        &self,
        guild_id: GuildId,
        component: TicketComponent,
        moderator: Moderator,
        responder: &dyn Responder,
    ) -> Result<ApprovalState> {
        if !moderator.is_admin {
            info!(
                "Non-admin {} pressed a ticket button for {}",
                moderator.user_id, component.member_id
            );
            responder.notice(messages::NOT_ALLOWED).await?;
            return Ok(ApprovalState::Prompted);
        }

        let ticket = component.ticket(guild_id);

        match component.action {
            TicketAction::Select(decision) => {
                let text = match decision {
                    Decision::Verify => messages::confirm_verify_message(),
                    Decision::Deny => messages::confirm_deny_message(),
                };
                let style = match decision {
                    Decision::Verify => ButtonStyle::Success,
                    Decision::Deny => ButtonStyle::Danger,
                };
                let button = OutgoingButton::new(
                    TicketComponent::new(TicketAction::Confirm(decision), &ticket).custom_id(),
                    "Confirm",
                    style,
                );
                responder.confirm(&text, button).await?;
                Ok(ApprovalState::ConfirmPending(decision))
            }
            TicketAction::Confirm(decision) => {
                self.resolve(ticket, decision, moderator.user_id, responder)
                    .await
            }
        }
    }

    async fn resolve(
        &self,
        ticket: Ticket,
        decision: Decision,
        moderator: UserId,
        responder: &dyn Responder,
    ) -> Result<ApprovalState> {
        responder.defer().await?;

        let lock = self.registry.member_lock(ticket.guild_id, ticket.member_id);
        let state = {
            let _guard = lock.lock().await;
            self.resolve_locked(ticket, decision, moderator, responder)
                .await
        };
        drop(lock);
        self.registry.release_lock(ticket.guild_id, ticket.member_id);

        state
    }

    /// Body of [`resolve`](Self::resolve), run while holding the member lock
    async fn resolve_locked(
        &self,
        ticket: Ticket,
        decision: Decision,
        moderator: UserId,
        responder: &dyn Responder,
    ) -> Result<ApprovalState> {
        if !self.is_live(&ticket).await? {
            info!(
                "Ignoring {:?} for {}: ticket {} already resolved",
                decision, ticket.member_id, ticket.channel_id
            );
            responder.notice(messages::ALREADY_RESOLVED).await?;
            return Ok(ApprovalState::Resolved);
        }

        match decision {
            Decision::Verify => self.verify(&ticket, moderator, responder).await?,
            Decision::Deny => self.deny(&ticket, moderator, responder).await?,
        }

        self.registry.remove(ticket.guild_id, ticket.member_id);
        best_effort(
            "delete ticket channel",
            self.api.delete_channel(ticket.channel_id),
        )
        .await;

        Ok(ApprovalState::Resolved)
    }

    /// A ticket is live while the registry tracks it or its channel still exists
    async fn is_live(&self, ticket: &Ticket) -> Result<bool> {
        if self.registry.is_live(ticket) {
            return Ok(true);
        }
        if self.registry.get(ticket.guild_id, ticket.member_id).is_some() {
            // Member has a newer ticket; this button belongs to an old one
            return Ok(false);
        }

        let channels = self.api.channels(ticket.guild_id).await?;
        if channels.iter().any(|c| c.id == ticket.channel_id) {
            self.registry.insert(*ticket);
            return Ok(true);
        }
        Ok(false)
    }

    async fn verify(&self, ticket: &Ticket, moderator: UserId, responder: &dyn Responder) -> Result<()> {
        let guild_id = ticket.guild_id;

        if let Some(verified_role) = self.config.get().await {
            let exists = self
                .api
                .roles(guild_id)
                .await?
                .iter()
                .any(|r| r.id == verified_role);
            if exists {
                self.api
                    .add_member_role(guild_id, ticket.member_id, verified_role)
                    .await?;
            } else {
                warn!(
                    "Configured verified role {} no longer exists in guild {}",
                    verified_role, guild_id
                );
            }
        } else {
            warn!("No verified role configured; only removing the ticket role");
        }

        best_effort(
            "remove ticket role from member",
            self.api
                .remove_member_role(guild_id, ticket.member_id, ticket.role_id),
        )
        .await;
        best_effort(
            "delete ticket role",
            self.api.delete_role(guild_id, ticket.role_id),
        )
        .await;

        self.audit
            .append(
                guild_id,
                AuditRecord::new(
                    "Verification Log",
                    messages::verified_log(ticket.member_id, moderator),
                    Severity::Success,
                ),
            )
            .await?;

        responder
            .notice(&messages::verified_notice(ticket.member_id))
            .await?;
        info!("Member {} verified by {}", ticket.member_id, moderator);
        Ok(())
    }

    async fn deny(&self, ticket: &Ticket, moderator: UserId, responder: &dyn Responder) -> Result<()> {
        let guild_id = ticket.guild_id;

        best_effort(
            "delete ticket role",
            self.api.delete_role(guild_id, ticket.role_id),
        )
        .await;

        match self
            .api
            .kick_member(guild_id, ticket.member_id, messages::KICK_REASON)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_missing() => {
                info!("Member {} already left before being denied", ticket.member_id);
            }
            Err(e) => return Err(e),
        }

        self.audit
            .append(
                guild_id,
                AuditRecord::new(
                    "Verification Log",
                    messages::denied_log(ticket.member_id, moderator),
                    Severity::Failure,
                ),
            )
            .await?;

        responder
            .notice(&messages::denied_notice(ticket.member_id))
            .await?;
        info!("Member {} denied by {}", ticket.member_id, moderator);
        Ok(())
    }
}

/// Shared approval flow type
pub type SharedApprovalFlow = Arc<ApprovalFlow>;

pub fn create_shared_approval_flow(
    api: Arc<dyn GuildApi>,
    registry: SharedTicketRegistry,
    audit: SharedAuditLog,
    config: SharedConfigStore,
) -> SharedApprovalFlow {
    Arc::new(ApprovalFlow::new(api, registry, audit, config))
}
