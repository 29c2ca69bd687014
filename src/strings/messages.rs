//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! Includes error replies, command results and event notifications.

use chrono::{DateTime, Utc};

// Failures
pub const REMOTE_FAILURE: &str = "❌ Discord rejected the request. Please try again later.";
pub const CONFIGURATION_FAILURE: &str =
    "❌ The bot is misconfigured. Please contact an administrator.";
pub const GUILD_ONLY: &str = "This command can only be used in a server.";

pub fn execution_failed(command: &str) -> String {
    if command.is_empty() {
        "❌ An unexpected error occurred.".to_string()
    } else {
        format!("❌ An unexpected error occurred while running `{command}`.")
    }
}

pub fn unknown_command(name: &str) -> String {
    format!("Unknown command: {name}")
}

pub fn missing_option(name: &str) -> String {
    format!("Missing required option `{name}`.")
}

// Ping
pub const PINGING: &str = "Pinging...";
pub const PONG_TITLE: &str = "🏓 Pong!";
pub const PONG_DESCRIPTION: &str = "Bot is up and running!";

pub fn pong(millis: u128) -> String {
    format!("Pong! Response time: {millis}ms")
}

pub fn latency(millis: Option<u128>) -> String {
    match millis {
        Some(ms) => format!("{ms}ms"),
        None => "n/a".to_string(),
    }
}

// Echo
pub const ECHO_EMPTY: &str = "You didn't provide anything to echo!";
pub const ECHO_MASS_MENTION: &str = "You don't have permission to mention everyone.";

// User / server info
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

pub const USER_INFO_TITLE: &str = "User Information";

pub fn server_info_title(name: &str) -> String {
    format!("Server Information: {name}")
}

pub fn member_status(online: u64, total: u64) -> String {
    format!("🟢 Online: {online}\n⚫ Offline: {}", total.saturating_sub(online))
}

pub fn channel_counts(text: usize, voice: usize, categories: usize) -> String {
    format!(
        "💬 Text: {text}\n🔊 Voice: {voice}\n📁 Categories: {categories}\n📊 Total: {}",
        text + voice + categories
    )
}

// Polls
pub const POLL_RESULTS_DESCRIPTION: &str = "The poll has ended. Here are the results:";
pub const POLL_RESULTS_FIELD: &str = "📣 Results";
pub const POLL_NO_VOTES: &str = "No votes were cast";
pub const POLL_INACTIVE: &str = "This poll has ended or is no longer active.";
pub const POLL_UNKNOWN_OPTION: &str = "That option is not part of this poll.";
pub const POLL_DURATION_INVALID: &str = "Poll duration must be at least 1 minute.";

pub fn poll_created(minutes: u64) -> String {
    format!("Poll created! Voting ends in {minutes} minutes.")
}

pub fn poll_title(question: &str) -> String {
    format!("📊 Poll: {question}")
}

pub fn poll_description(minutes: u64) -> String {
    format!("Click the buttons below to vote. Poll ends in {minutes} minutes.")
}

pub fn poll_footer(creator: &str) -> String {
    format!("Poll created by {creator}")
}

pub fn poll_results_title(question: &str) -> String {
    format!("📊 Poll Results: {question}")
}

pub fn poll_option_count(min: usize, max: usize) -> String {
    format!("A poll needs between {min} and {max} options.")
}

pub fn poll_votes(count: usize) -> String {
    format!("{count} votes")
}

pub fn poll_winner(option: &str, votes: usize) -> String {
    format!("Winner: {option} with {votes} votes")
}

pub fn poll_tie(options: &[String], votes: usize) -> String {
    format!("Tie between: {} with {votes} votes each", options.join(", "))
}

pub fn voted_for(option: &str) -> String {
    format!("You voted for: {option}")
}

/// Keycap emoji for a 1-based option position.
pub fn option_marker(position: usize) -> &'static str {
    match position {
        1 => "1️⃣",
        2 => "2️⃣",
        3 => "3️⃣",
        4 => "4️⃣",
        5 => "5️⃣",
        _ => "🔹",
    }
}

// Moderation
pub const NO_REASON: &str = "No reason provided";
pub const NOT_A_MEMBER: &str = "This user is not a member of this server.";
pub const UNKNOWN_MOD_ACTION: &str = "Unknown moderation command";
pub const TIMEOUT_DURATION_INVALID: &str = "Timeout duration must be at least 1 minute.";

pub fn missing_permission(permission: &str) -> String {
    format!("You need the {permission} permission to use this command.")
}

pub fn bot_outranked(action: &str) -> String {
    format!("I don't have permission to {action} this user. They may have higher roles than me.")
}

pub fn invoker_outranked(action: &str) -> String {
    format!("You don't have permission to {action} this user. They may have higher roles than you.")
}

pub fn kicked(name: &str, reason: &str) -> String {
    format!("**{name}** has been kicked. Reason: {reason}")
}

pub fn banned(name: &str, reason: &str) -> String {
    format!("**{name}** has been banned. Reason: {reason}")
}

pub fn timed_out(name: &str, minutes: u64, reason: &str) -> String {
    format!("**{name}** has been timed out for {minutes} minutes. Reason: {reason}")
}

pub fn timeout_removed(name: &str) -> String {
    format!("Timeout has been removed from **{name}**.")
}

pub fn action_failed(action: &str, name: &str, err: &str) -> String {
    format!("Failed to {action} **{name}**: {err}")
}

pub fn purge_nothing(author: Option<&str>) -> String {
    match author {
        Some(name) => format!("No messages from {name} found to delete."),
        None => "No messages found to delete.".to_string(),
    }
}

pub fn purged(count: usize, author: Option<&str>) -> String {
    let noun = if count == 1 { "message" } else { "messages" };
    match author {
        Some(name) => format!("Deleted {count} {noun} from {name}."),
        None => format!("Deleted {count} {noun}."),
    }
}

pub fn purge_failed(err: &str) -> String {
    format!("Failed to delete messages: {err}")
}

// Reaction roles
pub const REACTION_ROLES_CREATING: &str = "Creating reaction roles message...";
pub const BOT_CANNOT_MANAGE_ROLES: &str = "I don't have permission to manage roles in this server.";
pub const REACTION_ROLES_EMPTY: &str = "Provide at least one role with a valid emoji.";

pub fn reaction_role_line(emoji: &str, role: &str) -> String {
    format!("{emoji} - {role}")
}

// Membership
pub const FAREWELL_TITLE: &str = "A Member Has Left";

pub fn welcome_title(guild: &str) -> String {
    format!("Welcome to {guild}!")
}

pub fn welcome_description(mention: &str) -> String {
    format!("We're excited to have you join us, {mention}!")
}

pub fn welcome_member_count(count: u64) -> String {
    format!("You are member #{count}")
}

pub fn farewell_description(mention: &str) -> String {
    format!("{mention} has left the server.")
}

pub fn farewell_member_count(count: u64) -> String {
    format!("We now have {count} members")
}

pub fn user_id_footer(id: u64) -> String {
    format!("User ID: {id}")
}
