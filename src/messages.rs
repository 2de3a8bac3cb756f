// src/messages.rs
use poise::serenity_prelude::{Mentionable, RoleId, UserId};

pub const PROMPT_TITLE: &str = "Verification";
pub const NOT_ALLOWED: &str = "You don't have permission to use this.";
pub const ALREADY_RESOLVED: &str = "This ticket has already been resolved.";
pub const KICK_REASON: &str = "Verification Denied";

pub fn prompt_message(member: UserId) -> String {
    format!("Please verify yourself, {}.", member.mention())
}

pub fn confirm_verify_message() -> String {
    "Are you sure you want to verify this user?".to_string()
}

pub fn confirm_deny_message() -> String {
    "Are you sure you want to deny this user?".to_string()
}

pub fn verified_notice(member: UserId) -> String {
    format!("{} has been verified!", member.mention())
}

pub fn denied_notice(member: UserId) -> String {
    format!("{} has been removed.", member.mention())
}

pub fn joined_log(member: UserId) -> String {
    format!(
        "{} has joined and is waiting for verification.",
        member.mention()
    )
}

pub fn rejoined_log(member: UserId) -> String {
    format!(
        "{} rejoined while their ticket was still open and is waiting for verification.",
        member.mention()
    )
}

pub fn verified_log(member: UserId, moderator: UserId) -> String {
    format!(
        "{} has been **verified** by {}.",
        member.mention(),
        moderator.mention()
    )
}

pub fn denied_log(member: UserId, moderator: UserId) -> String {
    format!(
        "{} was **denied verification** and removed by {}.",
        member.mention(),
        moderator.mention()
    )
}

pub const ORPHAN_MEMBER_LEFT: &str = "no longer a member";
pub const ORPHAN_ROLE_MISSING: &str = "ticket role was deleted";

pub fn orphan_closed_log(member: UserId, reason: &str) -> String {
    format!(
        "Closed the leftover ticket for {} ({}).",
        member.mention(),
        reason
    )
}

pub fn role_set_message(role: RoleId) -> String {
    format!("The verified role is now {}.", role.mention())
}
