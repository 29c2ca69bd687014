//! # Slash Commands
//!
//! Registry and invocation context for structured (slash) commands.
//! Lookup is exact and case-sensitive. The context tracks whether the
//! interaction has been acknowledged, because the platform accepts exactly one
//! initial response and everything afterwards must be a follow-up.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::application::registry::{Entry, Registry};
use crate::domain::error::BotError;
use crate::domain::message::OutgoingMessage;
use crate::domain::traits::{InteractionResponder, PlatformClient};
use crate::domain::types::{
    ChannelId, GuildId, MessageHandle, Permission, Permissions, RoleRef, UserProfile,
};
use crate::strings::messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    User,
    Role,
}

/// Declared parameter of a slash command or subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
}

impl OptionSpec {
    pub fn required(name: impl Into<String>, description: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, description, kind)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcommandSpec {
    pub name: String,
    pub description: String,
    pub options: Vec<OptionSpec>,
}

impl SubcommandSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, options: Vec<OptionSpec>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options,
        }
    }
}

/// An option value as already parsed by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    User(UserProfile),
    Role(RoleRef),
}

#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    fn options(&self) -> Vec<OptionSpec> {
        Vec::new()
    }

    fn subcommands(&self) -> Vec<SubcommandSpec> {
        Vec::new()
    }

    /// Hidden outside guilds.
    fn guild_only(&self) -> bool {
        false
    }

    /// Members need one of these to see the command by default.
    fn default_permissions(&self) -> Vec<Permission> {
        Vec::new()
    }

    async fn execute(&self, ctx: &InteractionContext) -> Result<(), BotError>;
}

#[derive(Default)]
pub struct InteractionRegistry {
    inner: Registry<dyn SlashCommand>,
}

impl InteractionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: impl SlashCommand + 'static) {
        let command: Arc<dyn SlashCommand> = Arc::new(command);
        let name = command.name().to_string();
        if self.inner.insert(name.clone(), command) {
            tracing::warn!(command = %name, "Replaced existing slash command registration");
        } else {
            tracing::info!(command = %name, "Registered slash command");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Entry<dyn SlashCommand>> {
        self.inner.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &dyn SlashCommand> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// One slash command invocation.
pub struct InteractionContext {
    pub command: String,
    pub subcommand: Option<String>,
    pub user: UserProfile,
    pub guild: Option<GuildId>,
    pub channel: ChannelId,
    /// Invoker's resolved permissions in the channel.
    pub permissions: Permissions,
    options: HashMap<String, OptionValue>,
    platform: Arc<dyn PlatformClient>,
    responder: Arc<dyn InteractionResponder>,
    acknowledged: AtomicBool,
}

impl InteractionContext {
    pub fn new(
        command: impl Into<String>,
        user: UserProfile,
        channel: ChannelId,
        platform: Arc<dyn PlatformClient>,
        responder: Arc<dyn InteractionResponder>,
    ) -> Self {
        Self {
            command: command.into(),
            subcommand: None,
            user,
            guild: None,
            channel,
            permissions: Permissions::default(),
            options: HashMap::new(),
            platform,
            responder,
            acknowledged: AtomicBool::new(false),
        }
    }

    pub fn in_guild(mut self, guild: GuildId, permissions: Permissions) -> Self {
        self.guild = Some(guild);
        self.permissions = permissions;
        self
    }

    pub fn with_subcommand(mut self, name: impl Into<String>) -> Self {
        self.subcommand = Some(name.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    pub fn platform(&self) -> &dyn PlatformClient {
        self.platform.as_ref()
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        match self.options.get(name) {
            Some(OptionValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn option_int(&self, name: &str) -> Option<i64> {
        match self.options.get(name) {
            Some(OptionValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn option_user(&self, name: &str) -> Option<&UserProfile> {
        match self.options.get(name) {
            Some(OptionValue::User(user)) => Some(user),
            _ => None,
        }
    }

    pub fn option_role(&self, name: &str) -> Option<&RoleRef> {
        match self.options.get(name) {
            Some(OptionValue::Role(role)) => Some(role),
            _ => None,
        }
    }

    pub fn required_str(&self, name: &str) -> Result<&str, BotError> {
        self.option_str(name).ok_or_else(|| missing(name))
    }

    pub fn required_int(&self, name: &str) -> Result<i64, BotError> {
        self.option_int(name).ok_or_else(|| missing(name))
    }

    pub fn required_user(&self, name: &str) -> Result<&UserProfile, BotError> {
        self.option_user(name).ok_or_else(|| missing(name))
    }

    pub fn require_guild(&self) -> Result<GuildId, BotError> {
        self.guild
            .ok_or_else(|| BotError::invalid_input_with(messages::GUILD_ONLY, "invoked outside a guild"))
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }

    /// The initial response.
    pub async fn reply(&self, message: OutgoingMessage) -> Result<(), BotError> {
        self.responder.reply(message).await?;
        self.acknowledged.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn defer(&self, ephemeral: bool) -> Result<(), BotError> {
        self.responder.defer(ephemeral).await?;
        self.acknowledged.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn follow_up(&self, message: OutgoingMessage) -> Result<MessageHandle, BotError> {
        Ok(self.responder.follow_up(message).await?)
    }

    /// Replies if nothing has been sent yet, otherwise follows up.
    pub async fn respond(&self, message: OutgoingMessage) -> Result<(), BotError> {
        if self.is_acknowledged() {
            self.follow_up(message).await.map(|_| ())
        } else {
            self.reply(message).await
        }
    }

    /// Handle of the message created by the initial reply.
    pub async fn original_message(&self) -> Result<MessageHandle, BotError> {
        Ok(self.responder.original_message().await?)
    }
}

fn missing(name: &str) -> BotError {
    BotError::invalid_input_with(
        messages::missing_option(name),
        format!("required option `{name}` was not supplied"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingPlatform, RecordingResponder, ResponderCall, user};

    struct Noop(&'static str);

    #[async_trait]
    impl SlashCommand for Noop {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "does nothing"
        }
        async fn execute(&self, _ctx: &InteractionContext) -> Result<(), BotError> {
            Ok(())
        }
    }

    fn context(responder: Arc<RecordingResponder>) -> InteractionContext {
        InteractionContext::new(
            "echo",
            user(1, "alice"),
            10,
            Arc::new(RecordingPlatform::new()),
            responder,
        )
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut registry = InteractionRegistry::new();
        registry.register(Noop("userinfo"));
        assert!(registry.lookup("userinfo").is_some());
        assert!(registry.lookup("UserInfo").is_none());
    }

    #[test]
    fn missing_required_option_is_invalid_input() {
        let ctx = context(Arc::new(RecordingResponder::new(10)))
            .with_option("count", OptionValue::Integer(3));
        assert!(matches!(
            ctx.required_str("message"),
            Err(BotError::InvalidInput { .. })
        ));
        // Present but with another type is still missing.
        assert!(ctx.required_str("count").is_err());
        assert_eq!(ctx.required_int("count").unwrap(), 3);
    }

    #[tokio::test]
    async fn respond_switches_to_follow_up_after_acknowledgement() {
        let responder = Arc::new(RecordingResponder::new(10));
        let ctx = context(responder.clone());

        assert!(!ctx.is_acknowledged());
        ctx.respond(OutgoingMessage::text("first")).await.unwrap();
        assert!(ctx.is_acknowledged());
        ctx.respond(OutgoingMessage::text("second")).await.unwrap();

        assert_eq!(
            responder.calls().await,
            vec![
                ResponderCall::Reply(OutgoingMessage::text("first")),
                ResponderCall::FollowUp(OutgoingMessage::text("second")),
            ]
        );
    }

    #[tokio::test]
    async fn deferred_context_follows_up() {
        let responder = Arc::new(RecordingResponder::new(10));
        let ctx = context(responder.clone());
        ctx.defer(true).await.unwrap();
        ctx.respond(OutgoingMessage::text("done")).await.unwrap();
        assert_eq!(
            responder.calls().await,
            vec![
                ResponderCall::Defer { ephemeral: true },
                ResponderCall::FollowUp(OutgoingMessage::text("done")),
            ]
        );
    }

    #[test]
    fn guild_requirement_reports_guild_only() {
        let ctx = context(Arc::new(RecordingResponder::new(10)));
        let err = ctx.require_guild().unwrap_err();
        assert_eq!(err.user_message(), format!("⚠️ {}", messages::GUILD_ONLY));
    }
}
