use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};
use std::sync::Arc;
use tracing::debug;

use crate::verification::Ticket;

type MemberKey = (GuildId, UserId);

/// Live tickets keyed by guild and member
///
/// Also hands out a per-member async lock. Opening and resolving a ticket for
/// the same member both hold it, so a rapid rejoin or two moderators
/// confirming at once run one after the other instead of interleaving.
#[derive(Default)]
pub struct TicketRegistry {
    tickets: DashMap<MemberKey, Ticket>,
    locks: DashMap<MemberKey, Arc<tokio::sync::Mutex<()>>>,
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock guarding all ticket work for one member
    pub fn member_lock(&self, guild_id: GuildId, member_id: UserId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry((guild_id, member_id))
            .or_default()
            .clone()
    }

    pub fn get(&self, guild_id: GuildId, member_id: UserId) -> Option<Ticket> {
        self.tickets.get(&(guild_id, member_id)).map(|t| *t)
    }

    /// Whether this exact ticket is still the member's live one
    pub fn is_live(&self, ticket: &Ticket) -> bool {
        self.get(ticket.guild_id, ticket.member_id)
            .is_some_and(|t| t.channel_id == ticket.channel_id)
    }

    pub fn insert(&self, ticket: Ticket) {
        debug!(
            "Tracking ticket for member {} in channel {}",
            ticket.member_id, ticket.channel_id
        );
        self.tickets.insert((ticket.guild_id, ticket.member_id), ticket);
    }

    pub fn remove(&self, guild_id: GuildId, member_id: UserId) -> Option<Ticket> {
        let removed = self.tickets.remove(&(guild_id, member_id)).map(|(_, t)| t);
        if removed.is_some() {
            debug!("Stopped tracking ticket for member {}", member_id);
        }
        removed
    }

    /// Drop a member's lock once nobody holds or waits on it and no ticket
    /// is tracked for them
    ///
    /// Call after releasing the guard and dropping the handle from
    /// [`member_lock`](Self::member_lock).
    pub fn release_lock(&self, guild_id: GuildId, member_id: UserId) {
        let key = (guild_id, member_id);
        if self.tickets.contains_key(&key) {
            return;
        }
        self.locks
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of members with a lock entry
    #[cfg(test)]
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

/// Shared ticket registry type
pub type SharedTicketRegistry = Arc<TicketRegistry>;

pub fn create_shared_ticket_registry() -> SharedTicketRegistry {
    Arc::new(TicketRegistry::new())
}
