use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod commands;
mod config;
mod error;
mod events;
mod managers;
mod messages;
mod platform;
mod state;
mod verification;

use commands::set_verified_role;
use config::{create_shared_config_store, BotSettings, SharedConfigStore};
use events::{handle_component, handle_member_add, reconcile_guilds};
use managers::{
    create_shared_approval_flow, create_shared_audit_log, create_shared_ticket_manager,
    run_startup_permission_check, SharedApprovalFlow, SharedTicketManager,
};
use platform::{GuildApi, SerenityGuildApi};
use state::create_shared_ticket_registry;

/// Gate new Discord members behind a moderator-approved ticket
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Push slash commands to each guild right away instead of globally
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register slash commands per guild (shows up instantly, good for development)
    #[arg(long)]
    guild_commands: bool,

    /// Only register slash commands in this guild
    #[arg(long)]
    guild_id: Option<u64>,

    /// Verified-role config file, overrides CONFIG_PATH
    #[arg(long)]
    config: Option<PathBuf>,

    /// Leave ticket channels from a previous run untouched at startup
    #[arg(long)]
    skip_reconcile: bool,
}

/// Where slash commands get registered
#[derive(Debug, Clone, Copy)]
enum CommandScope {
    Global,
    Guilds,
    SingleGuild(serenity::GuildId),
}

impl CommandScope {
    fn from_args(args: &Args) -> Self {
        match args.guild_id {
            Some(id) if id != 0 => CommandScope::SingleGuild(serenity::GuildId::new(id)),
            _ if args.guild_commands || args.sync_commands => CommandScope::Guilds,
            _ => CommandScope::Global,
        }
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// State shared by every command and event handler
pub struct Data {
    pub config_store: SharedConfigStore,
    pub ticket_manager: SharedTicketManager,
    pub approval_flow: SharedApprovalFlow,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = handle_member_add(ctx, new_member, data).await {
                error!(
                    "Could not open a ticket for {} in guild {}: {}",
                    new_member.user.id, new_member.guild_id, e
                );
            }
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => {
            if let Err(e) = handle_component(ctx, component, data).await {
                error!("Ticket button '{}' failed: {}", component.data.custom_id, e);
            }
        }
        _ => {}
    }
    Ok(())
}

async fn on_framework_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("/{} failed: {}", ctx.command().qualified_name, error);
            let _ = ctx.say(format!("Something went wrong: {}", error)).await;
        }
        poise::FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            error!(
                "/{} needs bot permissions {:?}",
                ctx.command().qualified_name,
                missing_permissions
            );
            let _ = ctx
                .say(format!("I am missing permissions: {}", missing_permissions))
                .await;
        }
        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
            warn!(
                "{} tried /{} without permission",
                ctx.author().name,
                ctx.command().qualified_name
            );
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling a framework error: {}", e);
            }
        }
    }
}

async fn register_commands(
    ctx: &serenity::Context,
    commands: &[poise::Command<Data, Error>],
    scope: CommandScope,
    guild_ids: &[serenity::GuildId],
) {
    let targets = match scope {
        CommandScope::Global => {
            match poise::builtins::register_globally(ctx, commands).await {
                Ok(()) => info!(
                    "Registered {} command(s) globally; Discord may take up to an hour to show them",
                    commands.len()
                ),
                Err(e) => error!("Global command registration failed: {}", e),
            }
            return;
        }
        CommandScope::Guilds => guild_ids.to_vec(),
        CommandScope::SingleGuild(guild_id) => vec![guild_id],
    };

    for guild_id in targets {
        match poise::builtins::register_in_guild(ctx, commands, guild_id).await {
            Ok(()) => info!("Registered {} command(s) in guild {}", commands.len(), guild_id),
            Err(e) => error!("Command registration in guild {} failed: {}", guild_id, e),
        }
    }
}

/// Log the application id embedded in the token's first segment
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(encoded) = token.split('.').next() else {
        return;
    };

    // Tokens use unpadded base64, sometimes the URL-safe alphabet
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(encoded))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());

    if let Some(app_id) = decoded {
        info!(
            "Application id {}; member joins need the Server Members intent at https://discord.com/developers/applications/{}/bot",
            app_id, app_id
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let scope = CommandScope::from_args(&args);
    let reconcile_on_start = !args.skip_reconcile;

    let mut settings = BotSettings::from_env()?;
    if let Some(path) = args.config {
        settings.config_path = path;
    }
    log_bot_id(&settings.token);

    let config_store = create_shared_config_store(settings.config_path.clone());
    info!("Using config file {}", config_store.path().display());
    match config_store.get().await {
        Some(role_id) => info!("Verified role: {}", role_id),
        None => warn!("No verified role configured yet; use /set-verified-role"),
    }
    info!("Slash command scope: {:?}", scope);

    let staging_category = settings.staging_category.clone();
    let log_channel = settings.log_channel.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![set_verified_role()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "{} ({}) ran /{}",
                        ctx.author().name,
                        ctx.author().id,
                        ctx.command().qualified_name
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!("/{} finished", ctx.command().qualified_name);
                })
            },
            on_error: |error| Box::pin(on_framework_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Connected as {}", ready.user.name);

                let api: Arc<dyn GuildApi> =
                    Arc::new(SerenityGuildApi::new(ctx.http.clone(), ready.user.id));
                let registry = create_shared_ticket_registry();
                let audit_log = create_shared_audit_log(api.clone(), &log_channel);
                let ticket_manager = create_shared_ticket_manager(
                    api.clone(),
                    registry.clone(),
                    audit_log.clone(),
                    &staging_category,
                );
                let approval_flow = create_shared_approval_flow(
                    api,
                    registry.clone(),
                    audit_log,
                    config_store.clone(),
                );

                let guild_ids: Vec<serenity::GuildId> =
                    ready.guilds.iter().map(|g| g.id).collect();
                if guild_ids.is_empty() {
                    warn!("Not a member of any guild yet; nothing to check or reconcile");
                } else {
                    run_startup_permission_check(
                        ctx.http.as_ref(),
                        &guild_ids,
                        config_store.get().await,
                    )
                    .await;

                    if reconcile_on_start {
                        reconcile_guilds(&ticket_manager, &guild_ids).await;
                        info!("Tracking {} open ticket(s)", registry.len());
                    } else {
                        info!("Skipping ticket reconciliation");
                    }
                }

                register_commands(ctx, &framework.options().commands, scope, &guild_ids).await;

                Ok(Data {
                    config_store,
                    ticket_manager,
                    approval_flow,
                })
            })
        })
        .build();

    // Member joins need the privileged GUILD_MEMBERS intent
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;
    info!("Privileged intents requested: GUILD_MEMBERS");

    let mut client = serenity::ClientBuilder::new(&settings.token, intents)
        .framework(framework)
        .await?;

    info!("Starting gateway connection");
    if let Err(e) = client.start().await {
        if matches!(
            e,
            serenity::Error::Gateway(serenity::GatewayError::DisallowedGatewayIntents)
        ) {
            error!("Discord refused the GUILD_MEMBERS intent: {}", e);
            error!("Enable it under Developer Portal > your application > Bot > Privileged Gateway Intents");
            return Err(anyhow::anyhow!("GUILD_MEMBERS intent is not enabled for this bot"));
        }
        return Err(e.into());
    }
    warn!("Gateway connection closed");

    Ok(())
}
