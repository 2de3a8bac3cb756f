use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::managers::SharedTicketManager;
use crate::{Data, Error};

/// Rebuild ticket tracking for the guilds the bot is in
pub async fn reconcile_guilds(ticket_manager: &SharedTicketManager, guild_ids: &[serenity::GuildId]) {
    for guild_id in guild_ids {
        match ticket_manager.reconcile(*guild_id).await {
            Ok(summary) => {
                info!("Ticket reconciliation for guild {}: {}", guild_id, summary.format());
            }
            Err(e) => {
                error!("Failed to reconcile tickets for guild {}: {}", guild_id, e);
            }
        }
    }
}

/// Handle when a new member joins the guild
pub async fn handle_member_add(
    _ctx: &serenity::Context,
    new_member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    let user_id = new_member.user.id;
    let guild_id = new_member.guild_id;

    info!(
        "New member joined: {} ({}) in guild {}",
        new_member.user.name, user_id, guild_id
    );

    let ticket = data.ticket_manager.open_ticket(guild_id, user_id).await?;
    info!(
        "Ticket {} ready for {}, awaiting moderator decision",
        ticket.channel_id, new_member.user.name
    );

    Ok(())
}
