use poise::serenity_prelude as serenity;
use tracing::info;

use crate::messages;
use crate::{Context, Error};

/// Set the role that will be given to verified members.
#[poise::command(
    slash_command,
    guild_only,
    rename = "set-verified-role",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn set_verified_role(
    ctx: Context<'_>,
    #[description = "Role granted when a moderator approves a member"] role: serenity::Role,
) -> Result<(), Error> {
    ctx.data().config_store.set(role.id).await?;
    info!(
        "Verified role set to '{}' ({}) by {}",
        role.name,
        role.id,
        ctx.author().name
    );

    let embed = serenity::CreateEmbed::new()
        .title("Role Set")
        .description(messages::role_set_message(role.id));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
