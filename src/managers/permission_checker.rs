use poise::serenity_prelude::{GuildId, Http, Permissions, RoleId};
use tracing::{error, info, warn};

/// A single permission with its status
#[derive(Debug, Clone)]
pub struct PermissionStatus {
    pub name: &'static str,
    pub description: &'static str,
    pub has_permission: bool,
}

/// All permissions the ticket flow needs
pub fn get_required_permissions() -> Vec<(&'static str, &'static str, Permissions)> {
    vec![
        ("VIEW_CHANNEL", "See channels and categories", Permissions::VIEW_CHANNEL),
        ("SEND_MESSAGES", "Post ticket prompts and audit records", Permissions::SEND_MESSAGES),
        ("EMBED_LINKS", "Send rich embeds in messages", Permissions::EMBED_LINKS),
        ("MANAGE_ROLES", "Create, grant and delete ticket roles", Permissions::MANAGE_ROLES),
        ("MANAGE_CHANNELS", "Create and delete ticket channels", Permissions::MANAGE_CHANNELS),
        ("KICK_MEMBERS", "Remove denied members", Permissions::KICK_MEMBERS),
    ]
}

/// Status of every required permission given what the bot holds
pub fn permission_statuses(granted: Permissions) -> Vec<PermissionStatus> {
    get_required_permissions()
        .into_iter()
        .map(|(name, description, permission)| PermissionStatus {
            name,
            description,
            has_permission: granted.administrator() || granted.contains(permission),
        })
        .collect()
}

/// Result of a permission check for a single guild
#[derive(Debug)]
pub struct GuildPermissionCheck {
    pub guild_id: GuildId,
    pub guild_name: String,
    pub permission_statuses: Vec<PermissionStatus>,
    pub has_all_permissions: bool,
    pub bot_role_position: Option<u16>,
    pub bot_role_name: Option<String>,
    /// Name and position of the configured verified role, if it exists
    pub verified_role: Option<(String, u16)>,
    /// False when the bot would be unable to grant the verified role
    pub role_hierarchy_ok: bool,
}

/// A role can be granted only from strictly above it
pub fn can_assign(bot_role_position: Option<u16>, role_position: u16) -> bool {
    bot_role_position.is_some_and(|bot| bot > role_position)
}

/// Check bot permissions for a specific guild
pub async fn check_guild_permissions(
    http: &Http,
    guild_id: GuildId,
    verified_role_id: Option<RoleId>,
) -> Result<GuildPermissionCheck, String> {
    let guild = guild_id
        .to_partial_guild(http)
        .await
        .map_err(|e| format!("Failed to fetch guild {}: {}", guild_id, e))?;

    let bot_user = http
        .get_current_user()
        .await
        .map_err(|e| format!("Failed to get bot user: {}", e))?;

    let bot_member = guild
        .member(http, bot_user.id)
        .await
        .map_err(|e| format!("Failed to get bot member in guild {}: {}", guild_id, e))?;

    #[allow(deprecated)]
    let bot_permissions = guild.member_permissions(&bot_member);

    let permission_statuses = permission_statuses(bot_permissions);
    let has_all_permissions = permission_statuses.iter().all(|s| s.has_permission);

    let mut bot_role_position: Option<u16> = None;
    let mut bot_role_name: Option<String> = None;
    for role_id in &bot_member.roles {
        if let Some(role) = guild.roles.get(role_id) {
            if bot_role_position.map_or(true, |pos| role.position > pos) {
                bot_role_position = Some(role.position);
                bot_role_name = Some(role.name.clone());
            }
        }
    }

    let verified_role = verified_role_id
        .and_then(|id| guild.roles.get(&id))
        .map(|role| (role.name.clone(), role.position));

    let role_hierarchy_ok = match &verified_role {
        Some((_, pos)) => can_assign(bot_role_position, *pos),
        None => true,
    };

    Ok(GuildPermissionCheck {
        guild_id,
        guild_name: guild.name.clone(),
        permission_statuses,
        has_all_permissions,
        bot_role_position,
        bot_role_name,
        verified_role,
        role_hierarchy_ok,
    })
}

/// Log permission check results with appropriate log levels
pub fn log_permission_check_results(results: &[GuildPermissionCheck]) {
    info!("========================================");
    info!("       BOT PERMISSION CHECK");
    info!("========================================");

    for check in results {
        info!("Guild: '{}' (ID: {})", check.guild_name, check.guild_id);

        if let Some(ref role_name) = check.bot_role_name {
            info!(
                "Bot's highest role: '{}' (position {})",
                role_name,
                check.bot_role_position.unwrap_or(0)
            );
        } else {
            warn!("Bot has no roles assigned!");
        }

        info!("Server Permissions:");
        for status in &check.permission_statuses {
            if status.has_permission {
                info!("  [YES] {:<16} - {}", status.name, status.description);
            } else {
                error!("  [NO]  {:<16} - {}", status.name, status.description);
            }
        }

        match &check.verified_role {
            Some((name, pos)) if check.role_hierarchy_ok => {
                info!("Verified role '{}' (position {}) can be granted", name, pos);
            }
            Some((name, pos)) => {
                error!(
                    "Verified role '{}' (position {}) is at or above the bot's role; approvals will fail",
                    name, pos
                );
                error!("  Fix: Go to Discord Server Settings > Roles > drag bot's role higher");
            }
            None => {
                warn!("No verified role configured or it no longer exists; use /set-verified-role");
            }
        }

        if check.has_all_permissions && check.role_hierarchy_ok {
            info!("Status: ALL CHECKS PASSED");
        } else {
            error!("Status: ISSUES DETECTED - Some operations may fail!");
        }
        info!("========================================");
    }
}

/// Run a full permission check and log results
/// Returns true if all permissions are OK, false otherwise
pub async fn run_startup_permission_check(
    http: &Http,
    guild_ids: &[GuildId],
    verified_role_id: Option<RoleId>,
) -> bool {
    let mut results = Vec::new();

    for guild_id in guild_ids {
        match check_guild_permissions(http, *guild_id, verified_role_id).await {
            Ok(check) => results.push(check),
            Err(e) => {
                error!("Failed to check permissions for guild {}: {}", guild_id, e);
            }
        }
    }

    log_permission_check_results(&results);

    results
        .iter()
        .all(|r| r.has_all_permissions && r.role_hierarchy_ok)
}
