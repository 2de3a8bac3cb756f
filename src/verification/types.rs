// src/verification/types.rs
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};
use std::fmt;

use crate::error::BotError;

/// Prefix shared by every component id the ticket flow emits
pub const COMPONENT_PREFIX: &str = "ticket";

/// The resources backing one member's verification ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub guild_id: GuildId,
    pub member_id: UserId,
    pub channel_id: ChannelId,
    pub role_id: RoleId,
}

impl Ticket {
    /// Channel name for a member's ticket
    pub fn channel_name(member_id: UserId) -> String {
        format!("ticket-{}", member_id)
    }

    /// Temporary role name for a member's ticket
    pub fn role_name(member_id: UserId) -> String {
        member_id.to_string()
    }

    /// Member id encoded in a ticket channel name, if it is one
    pub fn member_from_channel_name(name: &str) -> Option<UserId> {
        name.strip_prefix("ticket-")
            .and_then(|id| id.parse::<u64>().ok())
            .filter(|id| *id != 0)
            .map(UserId::new)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Verify,
    Deny,
}

/// A button press on a ticket prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAction {
    /// Allow/Deny on the ticket prompt
    Select(Decision),
    /// Confirm on the private follow-up
    Confirm(Decision),
}

impl TicketAction {
    fn as_str(&self) -> &'static str {
        match self {
            TicketAction::Select(Decision::Verify) => "allow",
            TicketAction::Select(Decision::Deny) => "deny",
            TicketAction::Confirm(Decision::Verify) => "confirm-allow",
            TicketAction::Confirm(Decision::Deny) => "confirm-deny",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(TicketAction::Select(Decision::Verify)),
            "deny" => Some(TicketAction::Select(Decision::Deny)),
            "confirm-allow" => Some(TicketAction::Confirm(Decision::Verify)),
            "confirm-deny" => Some(TicketAction::Confirm(Decision::Deny)),
            _ => None,
        }
    }
}

/// Button payload: an action plus the ticket it targets
///
/// Encoded as `ticket:<action>:<member>:<channel>:<role>` so prompts keep
/// working across restarts without any local bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketComponent {
    pub action: TicketAction,
    pub member_id: UserId,
    pub channel_id: ChannelId,
    pub role_id: RoleId,
}

impl TicketComponent {
    pub fn new(action: TicketAction, ticket: &Ticket) -> Self {
        Self {
            action,
            member_id: ticket.member_id,
            channel_id: ticket.channel_id,
            role_id: ticket.role_id,
        }
    }

    pub fn custom_id(&self) -> String {
        self.to_string()
    }

    /// Whether a component id belongs to the ticket flow at all
    pub fn is_ticket_component(custom_id: &str) -> bool {
        custom_id
            .split(':')
            .next()
            .is_some_and(|prefix| prefix == COMPONENT_PREFIX)
    }

    pub fn parse(custom_id: &str) -> Result<Self, BotError> {
        let invalid = || BotError::InvalidComponentId {
            custom_id: custom_id.to_string(),
        };

        let parts: Vec<&str> = custom_id.split(':').collect();
        let [prefix, action, member, channel, role] = parts.as_slice() else {
            return Err(invalid());
        };
        if *prefix != COMPONENT_PREFIX {
            return Err(invalid());
        }

        let id = |s: &str| s.parse::<u64>().ok().filter(|v| *v != 0);

        Ok(Self {
            action: TicketAction::parse(*action).ok_or_else(invalid)?,
            member_id: UserId::new(id(*member).ok_or_else(invalid)?),
            channel_id: ChannelId::new(id(*channel).ok_or_else(invalid)?),
            role_id: RoleId::new(id(*role).ok_or_else(invalid)?),
        })
    }

    pub fn ticket(&self, guild_id: GuildId) -> Ticket {
        Ticket {
            guild_id,
            member_id: self.member_id,
            channel_id: self.channel_id,
            role_id: self.role_id,
        }
    }
}

impl fmt::Display for TicketComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            COMPONENT_PREFIX,
            self.action.as_str(),
            self.member_id,
            self.channel_id,
            self.role_id
        )
    }
}

/// Where a ticket stands after handling one interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    /// Allow/Deny prompt is live, nothing chosen
    Prompted,
    /// A moderator picked a decision and holds a private confirm button
    ConfirmPending(Decision),
    /// Ticket torn down; terminal
    Resolved,
}
