//! # Command Router
//!
//! Routes gateway events to the right handler: prefix messages to the text
//! registry, slash commands to the interaction registry, poll buttons to the
//! poll manager, reactions to the reaction-role store and membership changes
//! to the welcome/farewell posts.
//!
//! This is the single place where handler failures are caught. Every failure,
//! panics included, is logged and answered with the kind's user-facing message.

use futures::FutureExt;
use std::error::Error as StdError;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::application::commands::{CommandContext, CommandRegistry, parse_invocation};
use crate::application::interactions::{InteractionContext, InteractionRegistry};
use crate::application::membership;
use crate::application::polls::{PollManager, VoteOutcome, parse_vote_id};
use crate::application::reaction_roles::{
    ReactionChange, ReactionEvent, ReactionRoleStore, RoleOutcome,
};
use crate::application::supervisor::panic_message;
use crate::domain::error::BotError;
use crate::domain::message::OutgoingMessage;
use crate::domain::traits::{InteractionResponder, PlatformClient};
use crate::domain::types::{ChannelId, GuildId, MessageId, UserId, UserProfile};
use crate::strings::messages;

/// A chat message as delivered by the gateway.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub channel: ChannelId,
    pub guild: Option<GuildId>,
    pub message_id: MessageId,
    pub author: UserProfile,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The handler ran and succeeded.
    Handled,
    /// The handler ran and failed; the user was told.
    Failed,
    /// Nothing to run.
    Ignored,
}

pub struct CommandRouter {
    prefix: String,
    platform: Arc<dyn PlatformClient>,
    commands: Arc<CommandRegistry>,
    interactions: Arc<InteractionRegistry>,
    polls: Arc<PollManager>,
    reaction_roles: Arc<ReactionRoleStore>,
}

impl CommandRouter {
    pub fn new(
        prefix: impl Into<String>,
        platform: Arc<dyn PlatformClient>,
        commands: Arc<CommandRegistry>,
        interactions: Arc<InteractionRegistry>,
        polls: Arc<PollManager>,
        reaction_roles: Arc<ReactionRoleStore>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            platform,
            commands,
            interactions,
            polls,
            reaction_roles,
        }
    }

    pub fn interactions(&self) -> &InteractionRegistry {
        &self.interactions
    }

    pub fn platform(&self) -> Arc<dyn PlatformClient> {
        Arc::clone(&self.platform)
    }

    /// Runs the prefix command in `message`, if any. Unknown commands are dropped silently.
    pub async fn route_message(&self, message: &IncomingMessage) -> Dispatch {
        if message.author.bot {
            return Dispatch::Ignored;
        }
        let Some(invocation) = parse_invocation(&message.content, &self.prefix) else {
            return Dispatch::Ignored;
        };
        let Some(entry) = self.commands.lookup(&invocation.name) else {
            tracing::debug!(command = %invocation.name, "Ignoring unknown text command");
            return Dispatch::Ignored;
        };

        tracing::info!(
            command = %invocation.name,
            user = %message.author.name,
            user_id = message.author.id,
            args = %invocation.args.join(" "),
            "Router dispatching text command"
        );

        let ctx = CommandContext {
            platform: self.platform.as_ref(),
            registry: &self.commands,
            channel: message.channel,
            guild: message.guild,
            message: message.message_id,
            author: &message.author,
            prefix: &self.prefix,
        };

        let result = {
            let _running = entry.acquire().await;
            guarded(&invocation.name, entry.handler().execute(&invocation.args, &ctx)).await
        };

        match result {
            Ok(()) => Dispatch::Handled,
            Err(err) => {
                log_failure(&invocation.name, message.author.id, &err);
                let reply = OutgoingMessage::text(err.user_message());
                if let Err(send_err) = self.platform.send_message(message.channel, reply).await {
                    tracing::error!(command = %invocation.name, error = %send_err, "Failed to report command failure");
                }
                Dispatch::Failed
            }
        }
    }

    /// Runs a slash command. Unknown names get an ephemeral notice.
    pub async fn route_interaction(&self, ctx: InteractionContext) -> Dispatch {
        let Some(entry) = self.interactions.lookup(&ctx.command) else {
            tracing::warn!(command = %ctx.command, "Received unknown slash command");
            if !ctx.is_acknowledged() {
                let notice = OutgoingMessage::text(messages::unknown_command(&ctx.command)).ephemeral();
                if let Err(e) = ctx.reply(notice).await {
                    tracing::error!(command = %ctx.command, error = %e, "Failed to send unknown command notice");
                }
            }
            return Dispatch::Ignored;
        };

        tracing::info!(
            command = %ctx.command,
            subcommand = ctx.subcommand.as_deref().unwrap_or(""),
            user = %ctx.user.name,
            user_id = ctx.user.id,
            "Router dispatching slash command"
        );

        let result = {
            let _running = entry.acquire().await;
            guarded(&ctx.command, entry.handler().execute(&ctx)).await
        };

        match result {
            Ok(()) => Dispatch::Handled,
            Err(err) => {
                log_failure(&ctx.command, ctx.user.id, &err);
                let reply = OutgoingMessage::text(err.user_message()).ephemeral();
                if let Err(send_err) = ctx.respond(reply).await {
                    tracing::error!(command = %ctx.command, error = %send_err, "Failed to report slash command failure");
                }
                Dispatch::Failed
            }
        }
    }

    /// Handles a button click. Only poll buttons are recognised.
    pub async fn route_component(
        &self,
        custom_id: &str,
        user: &UserProfile,
        responder: &dyn InteractionResponder,
    ) -> Dispatch {
        let Some((poll_id, position)) = parse_vote_id(custom_id) else {
            tracing::debug!(custom_id, "Ignoring unrecognised component");
            return Dispatch::Ignored;
        };

        let text = match self.polls.record_vote(poll_id, position, user.id).await {
            VoteOutcome::Recorded { option } => messages::voted_for(&option),
            VoteOutcome::Inactive => messages::POLL_INACTIVE.to_string(),
            VoteOutcome::UnknownOption => messages::POLL_UNKNOWN_OPTION.to_string(),
        };

        match responder.reply(OutgoingMessage::text(text).ephemeral()).await {
            Ok(()) => Dispatch::Handled,
            Err(e) => {
                tracing::error!(poll_id, user_id = user.id, error = %e, "Failed to acknowledge vote");
                Dispatch::Failed
            }
        }
    }

    pub async fn route_reaction(&self, event: &ReactionEvent, change: ReactionChange) -> RoleOutcome {
        match self
            .reaction_roles
            .apply(self.platform.as_ref(), event, change)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    message_id = event.message,
                    user_id = event.user,
                    change = ?change,
                    error = %e,
                    "Failed to update reaction role"
                );
                RoleOutcome::Ignored
            }
        }
    }

    pub async fn member_joined(&self, guild: GuildId, user: &UserProfile) {
        if let Err(e) = membership::welcome(self.platform.as_ref(), guild, user).await {
            tracing::error!(guild_id = guild, user_id = user.id, error = %e, "Failed to send welcome message");
        }
    }

    pub async fn member_left(&self, guild: GuildId, user: &UserProfile) {
        if let Err(e) = membership::farewell(self.platform.as_ref(), guild, user).await {
            tracing::error!(guild_id = guild, user_id = user.id, error = %e, "Failed to send farewell message");
        }
    }
}

/// Awaits a handler, turning a panic into an `ExecutionFailure` and tagging
/// untagged failures with the command name.
async fn guarded<F>(command: &str, handler: F) -> Result<(), BotError>
where
    F: Future<Output = Result<(), BotError>>,
{
    match AssertUnwindSafe(handler).catch_unwind().await {
        Ok(result) => result.map_err(|err| err.in_command(command)),
        Err(panic) => Err(BotError::execution(
            command,
            anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
        )),
    }
}

fn log_failure(command: &str, user: UserId, err: &BotError) {
    if err.is_unexpected() {
        tracing::error!(command, user_id = user, error = %error_chain(err), "Command failed");
    } else {
        tracing::info!(command, user_id = user, reason = %err, "Command rejected");
    }
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &dyn StdError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
