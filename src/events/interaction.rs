use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::error::Result as BotResult;
use crate::managers::{Moderator, Responder};
use crate::platform::serenity_api::to_create_button;
use crate::platform::OutgoingButton;
use crate::verification::TicketComponent;
use crate::{Data, Error};

/// Replies to a component interaction, switching to followups once deferred
struct InteractionResponder<'a> {
    http: &'a serenity::Http,
    interaction: &'a serenity::ComponentInteraction,
    deferred: AtomicBool,
}

impl<'a> InteractionResponder<'a> {
    fn new(http: &'a serenity::Http, interaction: &'a serenity::ComponentInteraction) -> Self {
        Self {
            http,
            interaction,
            deferred: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl<'a> Responder for InteractionResponder<'a> {
    async fn defer(&self) -> BotResult<()> {
        self.interaction
            .create_response(
                self.http,
                serenity::CreateInteractionResponse::Defer(
                    serenity::CreateInteractionResponseMessage::new().ephemeral(true),
                ),
            )
            .await?;
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn notice(&self, text: &str) -> BotResult<()> {
        if self.deferred.load(Ordering::SeqCst) {
            self.interaction
                .create_followup(
                    self.http,
                    serenity::CreateInteractionResponseFollowup::new()
                        .content(text)
                        .ephemeral(true),
                )
                .await?;
        } else {
            self.interaction
                .create_response(
                    self.http,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content(text)
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
        Ok(())
    }

    async fn confirm(&self, text: &str, button: OutgoingButton) -> BotResult<()> {
        self.interaction
            .create_response(
                self.http,
                serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .content(text)
                        .components(vec![serenity::CreateActionRow::Buttons(vec![
                            to_create_button(button),
                        ])])
                        .ephemeral(true),
                ),
            )
            .await?;
        Ok(())
    }
}

/// Handle a button press; anything that is not a ticket button is ignored
pub async fn handle_component(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let custom_id = &interaction.data.custom_id;
    if !TicketComponent::is_ticket_component(custom_id) {
        return Ok(());
    }

    let Some(guild_id) = interaction.guild_id else {
        debug!("Ticket button {} pressed outside a guild", custom_id);
        return Ok(());
    };

    let component = TicketComponent::parse(custom_id)?;

    // Interaction member permissions are resolved for the channel by Discord
    let is_admin = interaction
        .member
        .as_ref()
        .and_then(|m| m.permissions)
        .is_some_and(|p| p.administrator());

    let moderator = Moderator {
        user_id: interaction.user.id,
        is_admin,
    };

    info!(
        "{} pressed {:?} on ticket for {}",
        interaction.user.name, component.action, component.member_id
    );

    let responder = InteractionResponder::new(&ctx.http, interaction);
    let state = data
        .approval_flow
        .handle(guild_id, component, moderator, &responder)
        .await?;
    debug!("Ticket for {} is now {:?}", component.member_id, state);

    Ok(())
}
