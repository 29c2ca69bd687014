//! # /mod
//!
//! Moderation subcommands: kick, ban, timeout, removetimeout and purge.
//!
//! Every action that targets a member is checked twice against the role
//! hierarchy: the bot must outrank the target, and so must the invoker.

use async_trait::async_trait;
use chrono::Utc;

use crate::application::interactions::{
    InteractionContext, OptionKind, OptionSpec, SlashCommand, SubcommandSpec,
};
use crate::domain::error::{BotError, PlatformError};
use crate::domain::message::OutgoingMessage;
use crate::domain::types::{GuildId, Member, MessageId, Permission, UserProfile};
use crate::strings::messages;

/// Upper bound the platform accepts for a timeout (28 days).
const MAX_TIMEOUT_MINUTES: i64 = 28 * 24 * 60;
const MAX_PURGE: i64 = 100;
const MAX_BAN_DELETE_DAYS: i64 = 7;
const DEFAULT_BAN_DELETE_DAYS: i64 = 1;

pub struct ModerationCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Kick,
    Ban,
    Timeout,
    RemoveTimeout,
    Purge,
}

impl Action {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "kick" => Some(Self::Kick),
            "ban" => Some(Self::Ban),
            "timeout" => Some(Self::Timeout),
            "removetimeout" => Some(Self::RemoveTimeout),
            "purge" => Some(Self::Purge),
            _ => None,
        }
    }

    fn permission(self) -> Permission {
        match self {
            Self::Kick => Permission::KickMembers,
            Self::Ban => Permission::BanMembers,
            Self::Timeout | Self::RemoveTimeout => Permission::ModerateMembers,
            Self::Purge => Permission::ManageMessages,
        }
    }

    /// Verb used in hierarchy and failure messages.
    fn verb(self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::Timeout => "timeout",
            Self::RemoveTimeout => "modify",
            Self::Purge => "purge",
        }
    }
}

fn target_option(verb: &str) -> OptionSpec {
    OptionSpec::required("user", format!("The user to {verb}"), OptionKind::User)
}

fn reason_option(what: &str) -> OptionSpec {
    OptionSpec::optional("reason", format!("Reason for {what}"), OptionKind::String)
}

/// Checks that both the bot and the invoker outrank `target`.
async fn check_hierarchy(
    ctx: &InteractionContext,
    guild: GuildId,
    target: &Member,
    action: Action,
) -> Result<(), BotError> {
    let platform = ctx.platform();
    let bot = platform.current_member(guild).await?;
    if !bot.can_interact(target) {
        return Err(BotError::permission_denied(
            messages::bot_outranked(action.verb()),
            format!("bot cannot {} user {}", action.verb(), target.user.id),
        ));
    }
    if let Some(invoker) = platform.retrieve_member(guild, ctx.user.id).await?
        && !invoker.can_interact(target)
    {
        return Err(BotError::permission_denied(
            messages::invoker_outranked(action.verb()),
            format!(
                "user {} cannot {} user {}",
                ctx.user.id,
                action.verb(),
                target.user.id
            ),
        ));
    }
    Ok(())
}

/// Resolves the target member and runs the hierarchy check. `None` when the user is not in the guild.
async fn resolve_target(
    ctx: &InteractionContext,
    guild: GuildId,
    target: &UserProfile,
    action: Action,
) -> Result<Option<Member>, BotError> {
    let Some(member) = ctx.platform().retrieve_member(guild, target.id).await? else {
        return Ok(None);
    };
    check_hierarchy(ctx, guild, &member, action).await?;
    Ok(Some(member))
}

/// Replies with `success` or, when the platform refused, an ephemeral failure notice.
async fn report(
    ctx: &InteractionContext,
    action: Action,
    target: &UserProfile,
    outcome: Result<(), PlatformError>,
    success: String,
) -> Result<(), BotError> {
    match outcome {
        Ok(()) => {
            tracing::info!(
                moderator = %ctx.user.name,
                target = %target.name,
                action = action.verb(),
                "Moderation action applied"
            );
            ctx.reply(OutgoingMessage::text(success)).await
        }
        Err(e) => {
            tracing::error!(target = %target.name, action = action.verb(), error = %e, "Moderation action failed");
            ctx.reply(
                OutgoingMessage::text(messages::action_failed(action.verb(), &target.name, &e.to_string()))
                    .ephemeral(),
            )
            .await
        }
    }
}

async fn not_a_member(ctx: &InteractionContext) -> Result<(), BotError> {
    ctx.reply(OutgoingMessage::text(messages::NOT_A_MEMBER).ephemeral())
        .await
}

impl ModerationCommand {
    async fn kick(&self, ctx: &InteractionContext, guild: GuildId) -> Result<(), BotError> {
        let target = ctx.required_user("user")?;
        let reason = ctx.option_str("reason").unwrap_or(messages::NO_REASON);
        if resolve_target(ctx, guild, target, Action::Kick).await?.is_none() {
            return not_a_member(ctx).await;
        }
        let outcome = ctx.platform().kick(guild, target.id, reason).await;
        report(ctx, Action::Kick, target, outcome, messages::kicked(&target.name, reason)).await
    }

    async fn ban(&self, ctx: &InteractionContext, guild: GuildId) -> Result<(), BotError> {
        let target = ctx.required_user("user")?;
        let reason = ctx.option_str("reason").unwrap_or(messages::NO_REASON);
        let delete_days = ctx
            .option_int("delete_days")
            .unwrap_or(DEFAULT_BAN_DELETE_DAYS)
            .clamp(0, MAX_BAN_DELETE_DAYS) as u8;

        // Users outside the guild can still be banned by id.
        resolve_target(ctx, guild, target, Action::Ban).await?;
        let outcome = ctx
            .platform()
            .ban(guild, target.id, delete_days, reason)
            .await;
        report(ctx, Action::Ban, target, outcome, messages::banned(&target.name, reason)).await
    }

    async fn timeout(&self, ctx: &InteractionContext, guild: GuildId) -> Result<(), BotError> {
        let target = ctx.required_user("user")?;
        let minutes = ctx.required_int("duration")?;
        if minutes < 1 {
            return Err(BotError::invalid_input_with(
                messages::TIMEOUT_DURATION_INVALID,
                format!("timeout of {minutes} minutes"),
            ));
        }
        let minutes = minutes.min(MAX_TIMEOUT_MINUTES);
        let reason = ctx.option_str("reason").unwrap_or(messages::NO_REASON);
        if resolve_target(ctx, guild, target, Action::Timeout).await?.is_none() {
            return not_a_member(ctx).await;
        }

        let until = Utc::now() + chrono::Duration::minutes(minutes);
        let outcome = ctx
            .platform()
            .set_timeout(guild, target.id, Some(until), Some(reason))
            .await;
        let success = messages::timed_out(&target.name, minutes as u64, reason);
        report(ctx, Action::Timeout, target, outcome, success).await
    }

    async fn remove_timeout(&self, ctx: &InteractionContext, guild: GuildId) -> Result<(), BotError> {
        let target = ctx.required_user("user")?;
        if resolve_target(ctx, guild, target, Action::RemoveTimeout).await?.is_none() {
            return not_a_member(ctx).await;
        }
        let outcome = ctx
            .platform()
            .set_timeout(guild, target.id, None, None)
            .await;
        report(
            ctx,
            Action::RemoveTimeout,
            target,
            outcome,
            messages::timeout_removed(&target.name),
        )
        .await
    }

    async fn purge(&self, ctx: &InteractionContext) -> Result<(), BotError> {
        let amount = ctx.required_int("amount")?.clamp(1, MAX_PURGE) as usize;
        let author = ctx.option_user("user");
        ctx.defer(true).await?;

        let platform = ctx.platform();
        let targets: Vec<MessageId> = match author {
            Some(author) => platform
                .recent_messages(ctx.channel, MAX_PURGE as u8)
                .await?
                .into_iter()
                .filter(|message| message.author_id == author.id)
                .take(amount)
                .map(|message| message.id)
                .collect(),
            None => platform
                .recent_messages(ctx.channel, amount as u8)
                .await?
                .into_iter()
                .map(|message| message.id)
                .collect(),
        };

        let author_name = author.map(|a| a.name.as_str());
        let text = if targets.is_empty() {
            messages::purge_nothing(author_name)
        } else {
            match platform.delete_messages(ctx.channel, &targets).await {
                Ok(()) => {
                    tracing::info!(
                        moderator = %ctx.user.name,
                        count = targets.len(),
                        channel_id = ctx.channel,
                        "Purged messages"
                    );
                    messages::purged(targets.len(), author_name)
                }
                Err(e) => {
                    tracing::error!(channel_id = ctx.channel, error = %e, "Failed to delete messages");
                    messages::purge_failed(&e.to_string())
                }
            }
        };
        ctx.follow_up(OutgoingMessage::text(text).ephemeral()).await?;
        Ok(())
    }
}

#[async_trait]
impl SlashCommand for ModerationCommand {
    fn name(&self) -> &str {
        "mod"
    }

    fn description(&self) -> &str {
        "Moderation commands for server management"
    }

    fn subcommands(&self) -> Vec<SubcommandSpec> {
        vec![
            SubcommandSpec::new(
                "kick",
                "Kick a member from the server",
                vec![target_option("kick"), reason_option("kicking the user")],
            ),
            SubcommandSpec::new(
                "ban",
                "Ban a member from the server",
                vec![
                    target_option("ban"),
                    OptionSpec::optional(
                        "delete_days",
                        "Number of days of messages to delete (0-7)",
                        OptionKind::Integer,
                    ),
                    reason_option("banning the user"),
                ],
            ),
            SubcommandSpec::new(
                "timeout",
                "Timeout (mute) a member",
                vec![
                    target_option("timeout"),
                    OptionSpec::required(
                        "duration",
                        "Duration of the timeout in minutes",
                        OptionKind::Integer,
                    ),
                    reason_option("the timeout"),
                ],
            ),
            SubcommandSpec::new(
                "removetimeout",
                "Remove a timeout from a member",
                vec![target_option("remove timeout from")],
            ),
            SubcommandSpec::new(
                "purge",
                "Delete a number of messages from a channel",
                vec![
                    OptionSpec::required(
                        "amount",
                        "Number of messages to delete (1-100)",
                        OptionKind::Integer,
                    ),
                    OptionSpec::optional(
                        "user",
                        "Only delete messages from this user",
                        OptionKind::User,
                    ),
                ],
            ),
        ]
    }

    fn guild_only(&self) -> bool {
        true
    }

    fn default_permissions(&self) -> Vec<Permission> {
        vec![
            Permission::KickMembers,
            Permission::BanMembers,
            Permission::ModerateMembers,
        ]
    }

    async fn execute(&self, ctx: &InteractionContext) -> Result<(), BotError> {
        let guild = ctx.require_guild()?;
        let Some(action) = ctx.subcommand.as_deref().and_then(Action::parse) else {
            return ctx
                .reply(OutgoingMessage::text(messages::UNKNOWN_MOD_ACTION).ephemeral())
                .await;
        };

        let permission = action.permission();
        if !ctx.permissions.allows(permission) {
            return Err(BotError::permission_denied(
                messages::missing_permission(permission.label()),
                format!("user {} lacks {:?}", ctx.user.id, permission),
            ));
        }

        match action {
            Action::Kick => self.kick(ctx, guild).await,
            Action::Ban => self.ban(ctx, guild).await,
            Action::Timeout => self.timeout(ctx, guild).await,
            Action::RemoveTimeout => self.remove_timeout(ctx, guild).await,
            Action::Purge => self.purge(ctx).await,
        }
    }
}
